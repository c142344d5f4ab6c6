//! File-system `StateStore`

use std::io;
use std::path::{Path, PathBuf};

use hbsig_core::{StateStore, StorageError};
use tracing::debug;

use crate::fsutil::{read_file, write_secure_file};

/// Stores each state as a file. Ids are paths relative to `base`; an
/// absolute id is used as-is.
#[derive(Debug, Clone)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Store rooted at the current directory, as the CLI uses it
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.base.join(Path::new(id))
    }
}

impl StateStore for FileStore {
    fn write(&self, id: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(id);
        write_secure_file(&path, bytes)?;
        debug!(path = %path.display(), len = bytes.len(), "state written");
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(id);
        read_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
            _ => StorageError::Io(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.write("priv.state", &[1, 2, 3]).unwrap();
        assert_eq!(store.read("priv.state").unwrap(), vec![1, 2, 3]);
        assert!(dir.path().join("priv.state").exists());
    }

    #[test]
    fn test_missing_state() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(store.read("detached.state"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_absolute_id() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("elsewhere.state");
        let store = FileStore::new("/nonexistent-base");
        store.write(target.to_str().unwrap(), b"abs").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"abs");
    }

    #[test]
    fn test_write_into_missing_location_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let store = FileStore::new(&blocker);
        assert!(matches!(store.write("priv.state", b"s"), Err(StorageError::Io(_))));
    }

    #[test]
    fn test_signing_state_survives_reopen() {
        use hbsig_core::{generate_key, Signer};
        use hbsig_crypto::{message_digest, CryptoContext, HssHeight, ParamSet, TreeStrategy, Winternitz};

        let dir = TempDir::new().unwrap();
        let params = ParamSet::Hss { winternitz: Winternitz::W4, height: HssHeight::H5 };
        let digest = message_digest(b"message.dat");

        let store = FileStore::new(dir.path());
        let (key, _) = generate_key(&CryptoContext::new(), params, TreeStrategy::Bds, &store, "priv.state").unwrap();
        let (first, _) = Signer::new(&key, &store, "priv.state").sign_next(&digest).unwrap();

        let reopened = FileStore::new(dir.path());
        let mut signer = Signer::new(&key, &reopened, "priv.state");
        let (second, state) = signer.sign_next(&digest).unwrap();
        assert_eq!((first.leaf_index(), second.leaf_index()), (0, 1));
        assert_eq!(state.remaining(), 30);
    }
}
