//! Field and subfield definitions declared by the data descriptive record
//!
//! A module declares every field it uses once, in its first record. Each [`FieldDefn`]
//! carries the tag, the structure and type codes, and the ordered [`SubfieldDefn`]s
//! obtained by pairing the array descriptor with the expanded format controls.

use std::sync::Arc;

use tracing::warn;

pub mod codes;
mod field;
pub mod format;
mod subfield;

pub use field::FieldDefn;
pub use subfield::SubfieldDefn;

/// Ordered registry of the field definitions of a module
///
/// Definitions are shared with the records that use them.
#[derive(Debug, Clone, Default)]
pub struct FieldDefns {
    defns: Vec<Arc<FieldDefn>>,
}

impl FieldDefns {
    /// Creates an empty registry
    #[must_use]
    pub const fn new() -> Self {
        Self { defns: Vec::new() }
    }

    /// Adds a definition, keeping the first one when a tag is declared twice
    pub fn push(&mut self, defn: FieldDefn) {
        if self.defns.iter().any(|d| d.tag() == defn.tag()) {
            warn!(
                "Field {} is defined more than once, keeping the first definition",
                defn.tag()
            );
            return;
        }
        self.defns.push(Arc::new(defn));
    }

    /// Finds a definition by tag
    ///
    /// An exact match wins over a match that ignores ASCII case.
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<&Arc<FieldDefn>> {
        self.defns
            .iter()
            .find(|d| d.tag() == tag)
            .or_else(|| self.defns.iter().find(|d| d.tag().eq_ignore_ascii_case(tag)))
    }

    /// Definition by declaration order
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<FieldDefn>> {
        self.defns.get(index)
    }

    /// Number of definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.defns.len()
    }

    /// Whether the registry holds no definition
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defns.is_empty()
    }

    /// Iterates over the definitions in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<FieldDefn>> {
        self.defns.iter()
    }
}

impl FromIterator<FieldDefn> for FieldDefns {
    fn from_iter<I: IntoIterator<Item = FieldDefn>>(iter: I) -> Self {
        let mut defns = Self::new();
        for defn in iter {
            defns.push(defn);
        }
        defns
    }
}

impl<'a> IntoIterator for &'a FieldDefns {
    type Item = &'a Arc<FieldDefn>;
    type IntoIter = std::slice::Iter<'a, Arc<FieldDefn>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
