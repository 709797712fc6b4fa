//! Header names and their positions.

use crate::common::{Error, Result};
use std::collections::HashMap;

/// Ordered header names with a name-to-position map.
///
/// The index is replaced as a whole: after [`HeaderIndex::set`] it either
/// reflects the new names exactly or, on a duplicate, is empty.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the header set. A repeated name leaves the set empty and is
    /// reported as [`Error::DuplicateHeader`].
    pub fn set<I, T>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.clear();

        let mut ordered = Vec::new();
        let mut positions = HashMap::new();
        for (i, name) in names.into_iter().enumerate() {
            let name = name.into();
            if positions.insert(name.clone(), i).is_some() {
                return Err(Error::DuplicateHeader(name));
            }
            ordered.push(name);
        }

        self.names = ordered;
        self.positions = positions;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.positions.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Header name at position `i`.
    pub fn name(&self, i: usize) -> Option<&str> {
        self.names.get(i).map(String::as_str)
    }

    /// Position of the header called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}
