//! xpboard core - session and data access for the learn-platform dashboard.
//!
//! - `token`: shape checks and claim decoding for three-segment tokens
//! - `auth`: credential exchange, session storage and lifecycle events
//! - `api`: authenticated GraphQL client and the dashboard queries
//! - `models`: typed records and chart series derived from them
//! - `config`: endpoints, storage backend and timeouts

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod token;
pub mod utils;

pub use api::{DashboardApi, QueryClient, QueryError};
pub use auth::{AuthError, AuthSession, Credentials, SessionEvent, SessionStore};
pub use config::Config;
pub use token::{Token, TokenError};
