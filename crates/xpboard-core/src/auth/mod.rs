//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `AuthSession`: Credential exchange, login/logout and session checks
//! - `SessionStore`: Owner of the current token, durable plus in-memory
//! - `TokenStorage`: Durable slot backends (memory, file, OS keychain)
//!
//! Tokens are persisted under the `jwt` slot and checked for shape on load.

pub mod session;
pub mod storage;
pub mod store;

pub use session::{clean_token_text, AuthError, AuthSession, Credentials};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, StorageError, TokenStorage};
pub use store::{SessionEvent, SessionStore, StoreError, TOKEN_KEY};
