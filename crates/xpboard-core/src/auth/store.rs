use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::token::{Token, TokenError};

use super::storage::{StorageError, TokenStorage};

/// Durable slot holding the raw token text
pub const TOKEN_KEY: &str = "jwt";

/// Buffered session events per subscriber
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Session transitions a hosting application reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    /// Explicit logout; the host should return to its initial view.
    SignedOut,
    /// The server rejected the token; the host should return to its initial view.
    Invalidated,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Owner of the current session token.
///
/// Keeps a durable copy in a [`TokenStorage`] backend and an in-memory
/// mirror. The mirror only ever holds a [`Token`], so it is structurally
/// valid whenever it is set.
pub struct SessionStore {
    storage: Box<dyn TokenStorage>,
    current: RwLock<Option<Token>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(storage: impl TokenStorage + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            storage: Box::new(storage),
            current: RwLock::new(None),
            events,
        }
    }

    /// Read the durable token into memory.
    ///
    /// A stored value that fails the shape check is purged and treated as
    /// no session. So is a backend whose contents cannot be parsed at all;
    /// every slot is dropped in that case.
    pub fn load(&self) -> Result<Option<Token>, StorageError> {
        let mut current = self.current.write();
        let loaded = match self.storage.get(TOKEN_KEY) {
            Ok(Some(raw)) => match Token::parse(raw) {
                Ok(token) => {
                    debug!(token_prefix = token.prefix(), "Restored session token");
                    Some(token)
                }
                Err(_) => {
                    warn!("Stored session token is malformed, discarding it");
                    self.storage.remove(TOKEN_KEY)?;
                    None
                }
            },
            Ok(None) => None,
            Err(StorageError::Format(e)) => {
                warn!(error = %e, "Session storage is corrupted, discarding it");
                self.storage.clear()?;
                None
            }
            Err(e) => return Err(e),
        };
        *current = loaded.clone();
        Ok(loaded)
    }

    /// Validate and commit a raw token.
    pub fn set(&self, raw: &str) -> Result<Token, StoreError> {
        let token = Token::parse(raw)?;
        self.commit(token.clone())?;
        Ok(token)
    }

    /// Commit an already validated token to durable storage and memory.
    ///
    /// The memory lock is held across the durable write so a concurrent
    /// [`clear_if_current`](Self::clear_if_current) sees either the old
    /// session or the new one, never a half-committed state.
    pub fn commit(&self, token: Token) -> Result<(), StorageError> {
        let mut current = self.current.write();
        self.storage.set(TOKEN_KEY, token.as_str())?;
        *current = Some(token);
        Ok(())
    }

    /// Forget the session. Memory is cleared even if storage fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut current = self.current.write();
        *current = None;
        self.storage.remove(TOKEN_KEY)
    }

    /// Clear the session only if it still holds `token`.
    ///
    /// Returns whether anything was cleared. A session replaced by a newer
    /// login is left alone.
    pub fn clear_if_current(&self, token: &Token) -> Result<bool, StorageError> {
        let mut current = self.current.write();
        if matches!(current.as_ref(), Some(held) if held != token) {
            return Ok(false);
        }
        *current = None;
        self.storage.remove(TOKEN_KEY)?;
        Ok(true)
    }

    /// Drop the session and every other slot in durable storage.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        let mut current = self.current.write();
        *current = None;
        self.storage.clear()
    }

    /// In-memory token. Does not consult durable storage.
    pub fn current(&self) -> Option<Token> {
        self.current.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, OnceLock, Weak};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::auth::storage::{FileStorage, MemoryStorage, SESSION_FILE};

    /// Storage that fires a stale invalidation right after each token write,
    /// while the committing call is still in progress.
    struct InvalidatingStorage {
        inner: MemoryStorage,
        store: OnceLock<Weak<SessionStore>>,
        stale: Token,
        racer: Mutex<Option<JoinHandle<bool>>>,
    }

    impl TokenStorage for InvalidatingStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set(key, value)?;
            if let Some(store) = self.store.get().and_then(Weak::upgrade) {
                let stale = self.stale.clone();
                let handle = thread::spawn(move || store.clear_if_current(&stale).unwrap());
                *self.racer.lock() = Some(handle);
                thread::sleep(Duration::from_millis(50));
            }
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }

        fn clear(&self) -> Result<(), StorageError> {
            self.inner.clear()
        }
    }

    fn shared_storage() -> Arc<MemoryStorage> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn test_set_then_current_round_trip() {
        let store = SessionStore::new(MemoryStorage::new());
        let token = store.set("abc.def.ghi").unwrap();
        assert_eq!(store.current(), Some(token));

        store.clear().unwrap();
        assert_eq!(store.current(), None);
    }

    #[test]
    fn test_set_rejects_bad_shape() {
        let storage = shared_storage();
        let store = SessionStore::new(storage.clone());
        let result = store.set("abc.def");
        assert!(matches!(
            result,
            Err(StoreError::Token(TokenError::InvalidTokenShape))
        ));
        assert_eq!(store.current(), None);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_set_writes_durable_copy() {
        let storage = shared_storage();
        let store = SessionStore::new(storage.clone());
        store.set("abc.def.ghi").unwrap();
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("abc.def.ghi"));

        let reopened = SessionStore::new(storage.clone());
        assert_eq!(reopened.current(), None);
        assert_eq!(reopened.load().unwrap().unwrap().as_str(), "abc.def.ghi");
        assert_eq!(reopened.current().unwrap().as_str(), "abc.def.ghi");
    }

    #[test]
    fn test_load_purges_corrupted_token() {
        let storage = shared_storage();
        storage.set(TOKEN_KEY, "only.two").unwrap();

        let store = SessionStore::new(storage.clone());
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.current(), None);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_current_is_lazy_about_external_changes() {
        let storage = shared_storage();
        let store = SessionStore::new(storage.clone());
        store.set("abc.def.ghi").unwrap();

        storage.set(TOKEN_KEY, "garbage").unwrap();
        assert_eq!(store.current().unwrap().as_str(), "abc.def.ghi");
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_clear_if_current_skips_newer_session() {
        let store = SessionStore::new(MemoryStorage::new());
        let old = Token::parse("old.old.old").unwrap();
        let new = store.set("new.new.new").unwrap();

        assert!(!store.clear_if_current(&old).unwrap());
        assert_eq!(store.current(), Some(new.clone()));

        assert!(store.clear_if_current(&new).unwrap());
        assert_eq!(store.current(), None);
    }

    #[test]
    fn test_load_heals_unreadable_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SESSION_FILE);
        std::fs::write(&path, r#"{"jwt": "abc.def.g"#).unwrap();

        let store = SessionStore::new(FileStorage::at_path(path.clone()));
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.current(), None);
        assert!(!path.exists());

        // The backend is usable again afterwards
        store.set("abc.def.ghi").unwrap();
        assert_eq!(store.load().unwrap().unwrap().as_str(), "abc.def.ghi");
    }

    #[test]
    fn test_stale_invalidation_during_commit_keeps_new_session() {
        let stale = Token::parse("old.old.old").unwrap();
        let storage = Arc::new(InvalidatingStorage {
            inner: MemoryStorage::new(),
            store: OnceLock::new(),
            stale,
            racer: Mutex::new(None),
        });
        let store = Arc::new(SessionStore::new(storage.clone()));
        storage.store.set(Arc::downgrade(&store)).unwrap();

        let token = store.set("new.new.new").unwrap();
        let cleared = storage.racer.lock().take().unwrap().join().unwrap();

        assert!(!cleared);
        assert_eq!(store.current(), Some(token));
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("new.new.new"));
    }

    #[test]
    fn test_clear_all_drops_unrelated_slots() {
        let storage = shared_storage();
        storage.set("dashboard_cache", "{}").unwrap();
        let store = SessionStore::new(storage.clone());
        store.set("abc.def.ghi").unwrap();

        store.clear_all().unwrap();
        assert_eq!(store.current(), None);
        assert_eq!(storage.get("dashboard_cache").unwrap(), None);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let store = SessionStore::new(MemoryStorage::new());
        let mut events = store.subscribe();
        store.notify(SessionEvent::SignedOut);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedOut);
    }
}
