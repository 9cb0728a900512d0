use std::collections::BTreeSet;

use serde::Serialize;

use super::domain::{FileId, LenderId};

/// Lender and document ids picked by the user for the next submission.
///
/// Each selection event replaces its set wholesale; nothing is merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSet {
    lenders: BTreeSet<LenderId>,
    files: BTreeSet<FileId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lender_selection(&mut self, ids: impl IntoIterator<Item = LenderId>) {
        self.lenders = ids.into_iter().collect();
    }

    pub fn record_file_selection(&mut self, ids: impl IntoIterator<Item = FileId>) {
        self.files = ids.into_iter().collect();
    }

    pub fn lenders(&self) -> &BTreeSet<LenderId> {
        &self.lenders
    }

    pub fn files(&self) -> &BTreeSet<FileId> {
        &self.files
    }

    pub fn lender_ids(&self) -> Vec<LenderId> {
        self.lenders.iter().cloned().collect()
    }

    pub fn file_ids(&self) -> Vec<FileId> {
        self.files.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lenders.is_empty() && self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.lenders.clear();
        self.files.clear();
    }
}
