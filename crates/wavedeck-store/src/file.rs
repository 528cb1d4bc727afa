//! File-backed credential store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use wavedeck_protocol::Credential;

use crate::{StoreError, TokenStore, CREDENTIAL_SLOT};

/// A [`TokenStore`] persisting the credential to a single file.
///
/// The file lives at `<dir>/admin_token` and holds the raw compact token,
/// nothing else. Writes go through a sibling temp file plus rename so a
/// crash mid-save leaves either the old credential or the new one, never
/// a truncated token.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns [`StoreError::Write`] if the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(StoreError::Write)?;
        Ok(Self {
            path: dir.join(CREDENTIAL_SLOT),
        })
    }

    /// The path of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<Credential>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Credential::new(token)))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read(e)),
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        let temp = self.temp_path();
        fs::write(&temp, credential.as_str()).map_err(StoreError::Write)?;
        fs::rename(&temp, &self.path).map_err(StoreError::Write)?;
        tracing::debug!(path = %self.path.display(), "credential persisted");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(
                    path = %self.path.display(),
                    "credential slot cleared"
                );
                Ok(())
            }
            // Already empty — clearing twice must succeed.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Clear(e)),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(token: &str) -> Credential {
        Credential::new(token)
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path()).unwrap();

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path()).unwrap();

        store.save(&cred("h.p.s")).unwrap();

        assert_eq!(store.load().unwrap(), Some(cred("h.p.s")));
    }

    #[test]
    fn test_save_survives_reopening_the_store() {
        // The point of the file store: a new process (here, a new store
        // over the same directory) sees the credential.
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileTokenStore::new(dir.path()).unwrap();
            store.save(&cred("h.p.s")).unwrap();
        }

        let reopened = FileTokenStore::new(dir.path()).unwrap();
        assert_eq!(reopened.load().unwrap(), Some(cred("h.p.s")));
    }

    #[test]
    fn test_save_replaces_previous_credential() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path()).unwrap();

        store.save(&cred("old.old.old")).unwrap();
        store.save(&cred("new.new.new")).unwrap();

        assert_eq!(store.load().unwrap(), Some(cred("new.new.new")));
    }

    #[test]
    fn test_clear_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path()).unwrap();

        store.save(&cred("h.p.s")).unwrap();
        store.clear().unwrap();

        assert_eq!(store.load().unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_clear_on_empty_slot_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path()).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_whitespace_only_file_reads_as_empty() {
        // An editor or a crashed writer can leave a trailing newline or
        // an empty file; neither is a credential.
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path()).unwrap();
        std::fs::write(store.path(), "\n  \n").unwrap();

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_load_trims_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path()).unwrap();
        std::fs::write(store.path(), "h.p.s\n").unwrap();

        assert_eq!(store.load().unwrap(), Some(cred("h.p.s")));
    }

    #[test]
    fn test_uses_canonical_slot_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path()).unwrap();

        assert_eq!(
            store.path().file_name().unwrap().to_str().unwrap(),
            CREDENTIAL_SLOT
        );
    }
}
