//! Change detection: decides whether a file needs re-analysis.

use crate::error::AtlasResult;
use crate::hasher::fingerprint;
use crate::store::Store;
use crate::types::ChangeStatus;

/// Reports whether a file is new, modified, or unchanged relative to the
/// registry, backed by a `Store`.
pub struct FileRegistry<'a> {
    store: &'a Store,
}

impl<'a> FileRegistry<'a> {
    /// Wrap a store reference for change-detection queries.
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Compare `content`'s fingerprint against the registry row for `path`.
    pub fn status(&self, path: &str, content: &[u8]) -> AtlasResult<ChangeStatus> {
        let current_hash = fingerprint(content);
        match self.store.get_file(path)? {
            None => Ok(ChangeStatus::New),
            Some(record) if record.hash == current_hash => Ok(ChangeStatus::Unchanged),
            Some(_) => Ok(ChangeStatus::Modified),
        }
    }
}
