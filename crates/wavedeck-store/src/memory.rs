//! In-memory credential store.

use std::sync::RwLock;

use wavedeck_protocol::Credential;

use crate::{StoreError, TokenStore};

/// A [`TokenStore`] backed by process memory.
///
/// Nothing survives exit — "durable" only for the lifetime of the
/// process. Tests use it everywhere; production callers use it when they
/// deliberately want a session that cannot be resumed.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<Credential>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<Credential>, StoreError> {
        // A poisoned lock means a writer panicked mid-`save`; the slot
        // itself is still a whole value, so read through it.
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        Ok(slot.clone())
    }

    fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
        Ok(())
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
    fn test_load_empty_store_returns_none() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let store = MemoryTokenStore::new();
        store.save(&cred("a.b.c")).unwrap();
        assert_eq!(store.load().unwrap(), Some(cred("a.b.c")));
    }

    #[test]
    fn test_save_replaces_previous_credential() {
        let store = MemoryTokenStore::new();
        store.save(&cred("old.old.old")).unwrap();
        store.save(&cred("new.new.new")).unwrap();
        assert_eq!(store.load().unwrap(), Some(cred("new.new.new")));
    }

    #[test]
    fn test_clear_empties_the_slot() {
        let store = MemoryTokenStore::new();
        store.save(&cred("a.b.c")).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_clear_on_empty_store_is_idempotent() {
        let store = MemoryTokenStore::new();
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
