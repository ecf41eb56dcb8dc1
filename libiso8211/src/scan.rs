//! Low-level scanning of decimal numbers and delimited byte runs
//!
//! Every function here is bounded by both the slice it is handed and an
//! explicit character limit, so a malformed record can never cause a read
//! past the bytes that were actually loaded.

use nom::{
    bytes::complete::take_till,
    character::complete::{digit1, one_of, space0},
    combinator::{map_res, opt, recognize},
    number::complete::double,
    sequence::{pair, preceded},
    IResult,
};

/// Longest run of characters considered when reading a number
const MAX_NUMBER_CHARS: usize = 32;

fn window(buf: &[u8], max_chars: usize) -> &[u8] {
    &buf[..max_chars.min(buf.len())]
}

fn signed_decimal(input: &[u8]) -> IResult<&[u8], i64> {
    map_res(
        preceded(space0, recognize(pair(opt(one_of("+-")), digit1))),
        |digits: &[u8]| {
            std::str::from_utf8(digits)
                .map_err(|_| ())
                .and_then(|s| s.parse::<i64>().map_err(|_| ()))
        },
    )(input)
}

fn real(input: &[u8]) -> IResult<&[u8], f64> {
    preceded(space0, double)(input)
}

fn run_until<'a>(input: &'a [u8], d1: u8, d2: u8) -> (&'a [u8], &'a [u8]) {
    take_till::<_, _, nom::error::Error<&[u8]>>(|b: u8| b == d1 || b == d2)(input)
        .unwrap_or((&input[input.len()..], input))
}

/// Reads an optionally signed decimal integer from the first `max_chars` bytes of `buf`.
///
/// Leading blanks are skipped and scanning stops at the first non-digit. Returns 0 if no
/// digits are found.
#[must_use]
pub fn scan_int(buf: &[u8], max_chars: usize) -> i64 {
    let input = window(buf, max_chars.min(MAX_NUMBER_CHARS));
    signed_decimal(input).map_or(0, |(_, value)| value)
}

/// Same as [`scan_int`], clamping negative values to zero
#[must_use]
pub fn scan_usize(buf: &[u8], max_chars: usize) -> usize {
    usize::try_from(scan_int(buf, max_chars)).unwrap_or(0)
}

/// Reads a decimal real number from the first `max_chars` bytes of `buf`, 0.0 if none is found
#[must_use]
pub fn scan_float(buf: &[u8], max_chars: usize) -> f64 {
    real(window(buf, max_chars)).map_or(0.0, |(_, value)| value)
}

/// Returns the index of the first `delim` within `max_chars` bytes of `buf`.
///
/// If the delimiter is absent the length of the scanned window is returned and the caller
/// should treat the run as unterminated.
#[must_use]
pub fn scan_variable(buf: &[u8], max_chars: usize, delim: u8) -> usize {
    let (_, run) = run_until(window(buf, max_chars), delim, delim);
    run.len()
}

/// Copies the bytes of `buf` up to the first `delim1` or `delim2` (or the end of the
/// `max_chars` window) into a string.
///
/// The second value is the number of source bytes used, including the delimiter when one
/// was found. An empty window yields an empty string and zero consumption.
#[must_use]
pub fn fetch_variable(buf: &[u8], max_chars: usize, delim1: u8, delim2: u8) -> (String, usize) {
    let input = window(buf, max_chars);
    if input.is_empty() {
        return (String::new(), 0);
    }
    let (rest, run) = run_until(input, delim1, delim2);
    let consumed = run.len() + usize::from(!rest.is_empty());
    (String::from_utf8_lossy(run).into_owned(), consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FIELD_TERMINATOR, UNIT_TERMINATOR};

    #[test]
    fn scan_int_reads_leader_numbers() {
        assert_eq!(scan_int(b"00241", 5), 241);
        assert_eq!(scan_int(b"0024199999", 5), 241);
        assert_eq!(scan_int(b"12ab", 4), 12);
        assert_eq!(scan_int(b"  -7", 4), -7);
        assert_eq!(scan_int(b"+15", 3), 15);
    }

    #[test]
    fn scan_int_without_digits_is_zero() {
        assert_eq!(scan_int(b"abc", 3), 0);
        assert_eq!(scan_int(b"  ", 2), 0);
        assert_eq!(scan_int(b"123", 0), 0);
        assert_eq!(scan_usize(b"-4", 2), 0);
    }

    #[test]
    fn scan_float_reads_reals() {
        assert!((scan_float(b"001.5", 5) - 1.5).abs() < f64::EPSILON);
        assert!((scan_float(b"-12.25\x1f", 7) + 12.25).abs() < f64::EPSILON);
        assert!(scan_float(b"", 4).abs() < f64::EPSILON);
    }

    #[test]
    fn scan_variable_stops_at_delimiter_or_limit() {
        assert_eq!(scan_variable(b"ABC\x1fDEF", 7, UNIT_TERMINATOR), 3);
        assert_eq!(scan_variable(b"ABCDEF", 4, UNIT_TERMINATOR), 4);
        assert_eq!(scan_variable(b"AB", 10, UNIT_TERMINATOR), 2);
    }

    #[test]
    fn fetch_variable_consumes_delimiter() {
        let area = b"RECORD_ID_FIELD\x1fRTY!RID\x1f(A(3),A(2))\x1e";
        let (name, used) = fetch_variable(area, area.len(), UNIT_TERMINATOR, FIELD_TERMINATOR);
        assert_eq!(name, "RECORD_ID_FIELD");
        assert_eq!(used, 16);

        let rest = &area[used..];
        let (descr, used2) = fetch_variable(rest, rest.len(), UNIT_TERMINATOR, FIELD_TERMINATOR);
        assert_eq!(descr, "RTY!RID");
        assert_eq!(used2, 8);

        let rest = &rest[used2..];
        let (formats, used3) = fetch_variable(rest, rest.len(), UNIT_TERMINATOR, FIELD_TERMINATOR);
        assert_eq!(formats, "(A(3),A(2))");
        assert_eq!(used3, rest.len());
    }

    #[test]
    fn fetch_variable_handles_missing_delimiter_and_empty_input() {
        assert_eq!(
            fetch_variable(b"ABC", 3, UNIT_TERMINATOR, FIELD_TERMINATOR),
            ("ABC".to_owned(), 3)
        );
        assert_eq!(
            fetch_variable(b"ABC", 0, UNIT_TERMINATOR, FIELD_TERMINATOR),
            (String::new(), 0)
        );
        assert_eq!(
            fetch_variable(b"\x1e", 1, UNIT_TERMINATOR, FIELD_TERMINATOR),
            (String::new(), 1)
        );
    }
}
