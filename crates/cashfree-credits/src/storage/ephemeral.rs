//! Best-effort store for serverless deployments.
//!
//! The authoritative copy lives in an in-process cache that survives for as
//! long as the execution context stays warm. The cache is mirrored into a
//! temp-directory file so a cold start on the same host can pick it up again.

use std::path::PathBuf;

use parking_lot::RwLock;

use super::{read_state_file, write_state_file, LedgerStore, StoreError};
use crate::models::LedgerState;

pub struct EphemeralStore {
    path: PathBuf,
    cache: RwLock<Option<LedgerState>>,
}

impl EphemeralStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// Whether the warm cache has been populated.
    #[cfg(test)]
    fn is_warm(&self) -> bool {
        self.cache.read().is_some()
    }
}

impl LedgerStore for EphemeralStore {
    fn load(&self) -> Result<Option<LedgerState>, StoreError> {
        if let Some(state) = self.cache.read().as_ref() {
            return Ok(Some(state.clone()));
        }

        // Cold start: whatever a previous context left in the temp dir.
        let loaded = read_state_file(&self.path)?;
        if let Some(state) = &loaded {
            tracing::debug!(path = %self.path.display(), "Ephemeral ledger restored from temp file");
            *self.cache.write() = Some(state.clone());
        }
        Ok(loaded)
    }

    fn save(&self, state: &LedgerState) -> Result<(), StoreError> {
        *self.cache.write() = Some(state.clone());

        if let Err(e) = write_state_file(&self.path, state) {
            tracing::warn!(error = %e, "Temp-file mirror write failed; ledger kept in memory only");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("ephemeral ({})", self.path.display())
    }
}
