//! Persistence backends for the credit ledger.
//!
//! The ledger only ever reads and writes its whole state, so a backend is
//! just a `load`/`save` pair. Which backend is used is decided once at
//! startup from [`StorageBackend`].

pub mod ephemeral;
pub mod file;

use std::path::{Path, PathBuf};

use crate::models::LedgerState;

pub use ephemeral::EphemeralStore;
pub use file::FileStore;

/// Storage error type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A place the ledger state can be loaded from and saved to.
pub trait LedgerStore: Send + Sync {
    /// Loads the persisted state. `Ok(None)` means nothing has been persisted yet.
    fn load(&self) -> Result<Option<LedgerState>, StoreError>;

    /// Replaces the persisted state.
    fn save(&self, state: &LedgerState) -> Result<(), StoreError>;

    /// Short backend name for logs.
    fn describe(&self) -> String;
}

/// Which backend to construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Durable JSON file.
    File(PathBuf),
    /// Temp-directory JSON file with an in-process cache.
    Ephemeral(PathBuf),
}

/// Builds the configured backend.
pub fn open_store(backend: &StorageBackend) -> Box<dyn LedgerStore> {
    match backend {
        StorageBackend::File(path) => Box::new(FileStore::new(path.clone())),
        StorageBackend::Ephemeral(path) => Box::new(EphemeralStore::new(path.clone())),
    }
}

/// Reads a ledger file. A missing file is not an error.
pub(crate) fn read_state_file(path: &Path) -> Result<Option<LedgerState>, StoreError> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    Ok(Some(serde_json::from_str(&data)?))
}

/// Writes a ledger file as pretty-printed JSON.
///
/// The document is written to a sibling `.tmp` file and renamed over the
/// target, so readers never observe a half-written ledger.
pub(crate) fn write_state_file(path: &Path, state: &LedgerState) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(state)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json).map_err(|e| StoreError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::Utc;

    use crate::models::NewPayment;

    #[test]
    fn test_read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_state_file(&dir.path().join("absent.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credits.json");

        let mut state = LedgerState::default();
        state.push_payment(NewPayment::new("A", BigDecimal::from(100)).into_payment(Utc::now()));
        write_state_file(&path, &state).unwrap();

        assert_eq!(read_state_file(&path).unwrap(), Some(state));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_written_file_is_pretty_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credits.json");
        write_state_file(&path, &LedgerState::default()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"totalCredits\": 0"));
        assert!(text.contains("\"failedPayments\""));
        assert!(text.contains("\"creditHistory\""));
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credits.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            read_state_file(&path),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_open_store_selects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let file = open_store(&StorageBackend::File(dir.path().join("a.json")));
        let ephemeral = open_store(&StorageBackend::Ephemeral(dir.path().join("b.json")));

        assert!(file.describe().starts_with("file"));
        assert!(ephemeral.describe().starts_with("ephemeral"));
    }
}
