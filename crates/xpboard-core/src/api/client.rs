//! GraphQL client for the learn-platform data API.
//!
//! Every request is a single POST of `{query, variables}` carrying the
//! session token as a bearer credential. There are no retries: each failure
//! is returned to the caller as-is.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{SessionEvent, SessionStore};
use crate::config::Config;
use crate::token::{self, Token, TokenError};

use super::QueryError;

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
}

/// Authenticated GraphQL client.
///
/// Clone is cheap: clones share the connection pool and the recorded token,
/// so a token set through one handle is seen by all of them.
#[derive(Clone)]
pub struct QueryClient {
    client: Client,
    endpoint: String,
    token: Arc<RwLock<Option<Token>>>,
    store: Arc<SessionStore>,
}

impl QueryClient {
    /// Create a client for the configured GraphQL endpoint
    pub fn new(config: &Config, store: Arc<SessionStore>) -> Result<Self, QueryError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(client, config.graphql_url.clone(), store))
    }

    /// Create a client that shares an existing connection pool
    pub fn with_client(client: Client, endpoint: impl Into<String>, store: Arc<SessionStore>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token: Arc::new(RwLock::new(None)),
            store,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Record the token used for subsequent queries.
    ///
    /// `None` or an empty string clears it; anything else must pass the
    /// shape check.
    pub fn set_token(&self, token: Option<&str>) -> Result<(), TokenError> {
        let parsed = match token {
            Some(raw) if !raw.is_empty() => Some(Token::parse(raw)?),
            _ => None,
        };
        self.set_session_token(parsed);
        Ok(())
    }

    pub(crate) fn set_session_token(&self, token: Option<Token>) {
        *self.token.write() = token;
    }

    pub fn token(&self) -> Option<Token> {
        self.token.read().clone()
    }

    /// Run a query and return its `data` payload.
    pub async fn query(&self, document: &str, variables: Value) -> Result<Value, QueryError> {
        // Read once; a login or logout mid-flight does not affect this request
        let token = self.token().ok_or(QueryError::Unauthenticated)?;
        if !token::is_structurally_valid(token.as_str()) {
            warn!("Invalid token format detected in GraphQL query");
            return Err(QueryError::Unauthenticated);
        }

        let result = self.execute(&token, document, &variables).await;
        if let Err(ref e) = result {
            warn!(error = %e, "GraphQL query failed");
            if e.is_auth_failure() {
                self.invalidate(&token);
            }
        }
        result
    }

    /// Run a query and deserialize its `data` payload.
    pub async fn query_as<T: DeserializeOwned>(
        &self,
        document: &str,
        variables: Value,
    ) -> Result<T, QueryError> {
        let data = self.query(document, variables).await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn execute(&self, token: &Token, document: &str, variables: &Value) -> Result<Value, QueryError> {
        debug!(token_prefix = token.prefix(), "Sending GraphQL request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token.as_str())
            .json(&GraphQlRequest {
                query: document,
                variables,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(QueryError::from_status(status, &body));
        }

        let parsed: GraphQlResponse = serde_json::from_str(&body)?;
        if let Some(first) = parsed.errors.as_ref().and_then(|errors| errors.first()) {
            return Err(QueryError::Application(first.message.clone()));
        }

        match parsed.data {
            Some(Value::Null) | None => Err(QueryError::MissingData),
            Some(data) => Ok(data),
        }
    }

    /// Drop a token the server rejected, unless a newer session replaced it.
    fn invalidate(&self, token: &Token) {
        {
            let mut held = self.token.write();
            if held.as_ref() == Some(token) {
                *held = None;
            }
        }
        match self.store.clear_if_current(token) {
            Ok(true) => {
                warn!("Session token rejected by server, session cleared");
                self.store.notify(SessionEvent::Invalidated);
            }
            Ok(false) => debug!("Rejected token is no longer the current session"),
            Err(e) => warn!(error = %e, "Failed to clear rejected session token"),
        }
    }
}
