//! Durable storage seam
//!
//! The state machine only ever talks to a `StateStore`. Implementations
//! must not report success for a write that could still be lost or torn.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::StorageError;

pub trait StateStore {
    /// Durably replace the blob stored under `id`
    fn write(&self, id: &str, bytes: &[u8]) -> Result<(), StorageError>;

    fn read(&self, id: &str) -> Result<Vec<u8>, StorageError>;
}

/// In-process store. Useful for tests and for callers that persist
/// through their own channel.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (fault injection)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().map(|e| e.contains_key(id)).unwrap_or(false)
    }
}

impl StateStore for MemoryStore {
    fn write(&self, id: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("write to {id} rejected")));
        }
        let mut entries = self.entries.lock().map_err(|e| StorageError::Backend(e.to_string()))?;
        entries.insert(id.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let entries = self.entries.lock().map_err(|e| StorageError::Backend(e.to_string()))?;
        entries.get(id).cloned().ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}
