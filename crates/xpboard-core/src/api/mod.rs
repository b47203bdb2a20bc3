//! GraphQL API client module for the learn platform.
//!
//! This module provides the `QueryClient` for sending authenticated
//! GraphQL documents, and `DashboardApi` for the fixed set of profile,
//! project, skill and level queries the dashboard renders.
//!
//! The API uses bearer token authentication obtained through the
//! sign-in endpoint (see `auth::AuthSession`).

pub mod client;
pub mod dashboard;
pub mod error;
pub mod queries;

pub use client::QueryClient;
pub use dashboard::DashboardApi;
pub use error::QueryError;
