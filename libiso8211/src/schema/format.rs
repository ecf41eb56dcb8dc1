//! Expansion of format controls such as `(A(2),3(I(1),2R),B(40))` into a flat list of
//! subfield formats.
//!
//! Items are comma separated. An item starting with `(` is a group whose contents are
//! expanded in place. An item starting with digits repeats the group (or bare format)
//! that follows it. Both forms recurse through the same expansion, so nesting is unbounded
//! apart from [`MAX_DEPTH`].

use itertools::Itertools;
use thiserror::Error;

/// Deepest group nesting accepted
pub const MAX_DEPTH: usize = 32;
/// Largest repeat count accepted
pub const MAX_REPEAT: usize = 10_000;
/// Largest number of expanded formats accepted
pub const MAX_FORMATS: usize = 1 << 20;

#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
/// Format controls grammar errors
pub enum Error {
    /// Format controls must be wrapped in one pair of brackets
    #[error("format controls `{0}` are missing brackets")]
    MissingBrackets(String),
    /// Opening and closing brackets do not pair up
    #[error("unbalanced brackets in `{0}`")]
    Unbalanced(String),
    /// Groups are nested too deeply
    #[error("`{0}` is nested deeper than {} groups", MAX_DEPTH)]
    TooDeep(String),
    /// Repeat count is too large
    #[error("repeat count `{0}` exceeds {}", MAX_REPEAT)]
    RepeatTooLarge(String),
    /// Expansion produces too many formats
    #[error("`{0}` expands to more than {} formats", MAX_FORMATS)]
    TooManyFormats(String),
}

/// Splits `src` on the commas that are not inside brackets
fn split_items(src: &str) -> Result<Vec<&str>, Error> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in src.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::Unbalanced(src.to_owned()))?;
            }
            ',' if depth == 0 => {
                items.push(&src[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::Unbalanced(src.to_owned()));
    }
    items.push(&src[start..]);
    Ok(items)
}

/// Contents of an item of the form `(...)`
fn group_contents(item: &str) -> Result<&str, Error> {
    let mut depth = 0usize;
    for (i, c) in item.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    // the group must close at the very end of the item
                    return if i + 1 == item.len() {
                        Ok(&item[1..i])
                    } else {
                        Err(Error::Unbalanced(item.to_owned()))
                    };
                }
            }
            _ => {}
        }
    }
    Err(Error::Unbalanced(item.to_owned()))
}

fn expand_into(src: &str, depth: usize, out: &mut Vec<String>) -> Result<(), Error> {
    if depth > MAX_DEPTH {
        return Err(Error::TooDeep(src.to_owned()));
    }
    for item in split_items(src)? {
        if item.starts_with('(') {
            expand_into(group_contents(item)?, depth + 1, out)?;
        } else if item.starts_with(|c: char| c.is_ascii_digit()) {
            let digits = item
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(item.len());
            let count = item[..digits]
                .parse::<usize>()
                .ok()
                .filter(|count| *count <= MAX_REPEAT)
                .ok_or_else(|| Error::RepeatTooLarge(item[..digits].to_owned()))?;
            let rest = &item[digits..];
            let body = if rest.starts_with('(') {
                group_contents(rest)?
            } else {
                rest
            };
            let mut group = Vec::new();
            expand_into(body, depth + 1, &mut group)?;
            if out.len() + group.len() * count > MAX_FORMATS {
                return Err(Error::TooManyFormats(src.to_owned()));
            }
            for _ in 0..count {
                out.extend(group.iter().cloned());
            }
        } else if !item.is_empty() {
            out.push(item.to_owned());
        }
    }
    Ok(())
}

/// Expands format controls into the ordered list of subfield formats
///
/// # Errors
///
/// This function errors on unbalanced brackets, excessive nesting, or excessive repeat
/// counts
pub fn expand_formats(controls: &str) -> Result<Vec<String>, Error> {
    let mut out = Vec::new();
    expand_into(controls, 0, &mut out)?;
    Ok(out)
}

/// Expands format controls into a comma separated string of subfield formats
///
/// # Errors
///
/// See [`expand_formats`]
pub fn expand_format(controls: &str) -> Result<String, Error> {
    Ok(expand_formats(controls)?.iter().join(","))
}

/// Checks that format controls are wrapped in brackets, then expands them
///
/// # Errors
///
/// This function errors with [`Error::MissingBrackets`] if `controls` is not of the form
/// `(...)`, and otherwise as [`expand_formats`]
pub fn subfield_formats(controls: &str) -> Result<Vec<String>, Error> {
    if controls.len() < 2 || !controls.starts_with('(') || !controls.ends_with(')') {
        return Err(Error::MissingBrackets(controls.to_owned()));
    }
    expand_formats(controls)
}
