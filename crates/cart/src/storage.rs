//! Durable storage for the checkout session reference.
//!
//! The persisted session id (plus its hosted-checkout URL) is the single
//! source of truth across reloads: it is read at client construction,
//! written on session creation, and deleted when the backend rejects the id.
//! Access is confined to one process; multi-process mutation of the same
//! session is an accepted unguarded race.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use driftwood_core::CheckoutId;

/// Errors raised by checkout storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt store file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The persisted checkout session reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCheckout {
    /// Opaque session id handed out by the backend.
    pub checkout_session_id: CheckoutId,
    /// Hosted checkout URL. Optional - can be refetched from the session.
    pub checkout_web_url: Option<String>,
}

/// Durable storage for the checkout session reference.
///
/// The browser-storage analog: two keys, synchronous access, last write
/// wins. Implementations must tolerate concurrent readers.
pub trait CheckoutStore: Send + Sync {
    /// Read the persisted reference, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying medium cannot be read.
    fn load(&self) -> Result<Option<PersistedCheckout>, StoreError>;

    /// Persist the reference, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying medium cannot be written.
    fn save(&self, checkout: &PersistedCheckout) -> Result<(), StoreError>;

    /// Delete the persisted reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying medium cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

impl<S: CheckoutStore + ?Sized> CheckoutStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<PersistedCheckout>, StoreError> {
        (**self).load()
    }

    fn save(&self, checkout: &PersistedCheckout) -> Result<(), StoreError> {
        (**self).save(checkout)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}

/// In-memory store. Used in tests and in ephemeral contexts where the
/// session should not outlive the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<PersistedCheckout>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckoutStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedCheckout>, StoreError> {
        Ok(self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone())
    }

    fn save(&self, checkout: &PersistedCheckout) -> Result<(), StoreError> {
        *self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(checkout.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON-file-backed store for native contexts.
///
/// A missing file reads as "no session"; a corrupt file is an error the
/// client treats like an absent session after logging.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the given path. The file is created on
    /// first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckoutStore for FileStore {
    fn load(&self) -> Result<Option<PersistedCheckout>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let checkout = serde_json::from_slice(&bytes)?;
        Ok(Some(checkout))
    }

    fn save(&self, checkout: &PersistedCheckout) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(checkout)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> PersistedCheckout {
        PersistedCheckout {
            checkout_session_id: CheckoutId::new("chk_1"),
            checkout_web_url: Some("https://shop.example/checkout/chk_1".to_string()),
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "driftwood-store-test-{}.json",
            std::process::id()
        ));
        let store = FileStore::new(&path);
        let _ = store.clear();

        assert!(store.load().unwrap().is_none());
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing an already-absent file is not an error
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let path = std::env::temp_dir().join(format!(
            "driftwood-store-corrupt-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, b"not json").unwrap();
        let store = FileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
        store.clear().unwrap();
    }
}
