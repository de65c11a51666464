//! Durable on-disk JSON store.

use std::path::PathBuf;

use super::{read_state_file, write_state_file, LedgerStore, StoreError};
use crate::models::LedgerState;

/// Keeps the ledger in a single JSON file under a stable working directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerStore for FileStore {
    fn load(&self) -> Result<Option<LedgerState>, StoreError> {
        read_state_file(&self.path)
    }

    fn save(&self, state: &LedgerState) -> Result<(), StoreError> {
        write_state_file(&self.path, state)
    }

    fn describe(&self) -> String {
        format!("file ({})", self.path.display())
    }
}
