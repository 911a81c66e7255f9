//! Dangling-note list.

use crate::model::path::CanonicalPath;

/// Flat list of noted paths missing from the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DanglingList {
    entries: Vec<CanonicalPath>,
}

impl DanglingList {
    /// Entries in store insertion order.
    pub fn entries(&self) -> &[CanonicalPath] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy ordered lexically by canonical path.
    pub fn sorted(&self) -> DanglingList {
        let mut entries = self.entries.clone();
        entries.sort();
        DanglingList { entries }
    }

    /// Case-insensitive substring filter backing the search bar.
    ///
    /// A blank query keeps every entry.
    pub fn filter(&self, query: &str) -> Vec<&CanonicalPath> {
        let needle = query.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|path| needle.is_empty() || path.as_str().to_lowercase().contains(&needle))
            .collect()
    }
}

impl<'a> IntoIterator for &'a DanglingList {
    type Item = &'a CanonicalPath;
    type IntoIter = std::slice::Iter<'a, CanonicalPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Wraps reconciliation output, keeping query order.
pub fn build_dangling_list(dangling: Vec<CanonicalPath>) -> DanglingList {
    DanglingList { entries: dangling }
}
