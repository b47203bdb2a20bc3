use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{header, Client};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::QueryClient;
use crate::config::Config;
use crate::token::{self, Token};

use super::store::{SessionEvent, SessionStore};
use super::storage::StorageError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid token received")]
    MalformedToken,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Username and password for a single login call. Never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `username:password` encoded for an HTTP Basic header
    fn basic_value(&self) -> String {
        let pair = format!("{}:{}", self.username.trim(), self.password);
        format!("Basic {}", STANDARD.encode(pair))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Strip the wrapping the sign-in endpoint may put around the token:
/// surrounding whitespace, one leading and one trailing quote, and any
/// line breaks.
pub fn clean_token_text(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(|c: char| c == '"' || c == '\'')
        .unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_suffix(|c: char| c == '"' || c == '\'')
        .unwrap_or(trimmed);
    trimmed.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Credential exchange and session lifecycle.
///
/// Keeps the [`SessionStore`] and the [`QueryClient`] token in step: both
/// are set on login and cleared on logout.
pub struct AuthSession {
    client: Client,
    signin_url: String,
    store: Arc<SessionStore>,
    graphql: QueryClient,
}

impl AuthSession {
    /// Create a session for the configured sign-in endpoint, restoring any
    /// persisted token.
    pub fn new(config: &Config, store: Arc<SessionStore>, graphql: QueryClient) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Self::with_client(client, config.signin_url.clone(), store, graphql)
    }

    pub fn with_client(
        client: Client,
        signin_url: impl Into<String>,
        store: Arc<SessionStore>,
        graphql: QueryClient,
    ) -> Result<Self, AuthError> {
        let restored = store.load()?;
        if restored.is_some() {
            info!("Restored saved session");
        }
        graphql.set_session_token(restored);

        Ok(Self {
            client,
            signin_url: signin_url.into(),
            store,
            graphql,
        })
    }

    pub fn graphql(&self) -> &QueryClient {
        &self.graphql
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Exchange credentials for a token and make it the current session.
    ///
    /// Any previous session, and everything else in durable storage, is
    /// discarded before the request is sent.
    pub async fn login(&self, credentials: &Credentials) -> Result<Token, AuthError> {
        self.store.clear_all()?;
        self.graphql.set_session_token(None);

        debug!(username = %credentials.username.trim(), "Sending sign-in request");
        let response = self
            .client
            .post(&self.signin_url)
            .header(header::AUTHORIZATION, credentials.basic_value())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let raw = response.text().await?;
        let cleaned = clean_token_text(&raw);
        debug!(
            raw_len = raw.len(),
            cleaned_len = cleaned.len(),
            segments = cleaned.split('.').count(),
            "Received sign-in token"
        );

        if cleaned.is_empty() || !token::is_structurally_valid(&cleaned) {
            warn!("Sign-in returned a malformed token");
            return Err(AuthError::MalformedToken);
        }
        let token = Token::parse(cleaned).map_err(|_| AuthError::MalformedToken)?;

        self.store.commit(token.clone())?;
        self.graphql.set_session_token(Some(token.clone()));
        self.store.notify(SessionEvent::SignedIn);
        info!(token_prefix = token.prefix(), "Logged in");
        Ok(token)
    }

    /// End the session and tell subscribers to reset to their initial view.
    pub fn logout(&self) -> Result<(), AuthError> {
        let cleared = self.store.clear();
        self.graphql.set_session_token(None);
        self.store.notify(SessionEvent::SignedOut);
        info!("Logged out");
        cleared.map_err(AuthError::from)
    }

    /// Whether a structurally valid token is held in memory
    pub fn is_authenticated(&self) -> bool {
        self.store
            .current()
            .map(|t| token::is_structurally_valid(t.as_str()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::storage::{MemoryStorage, TokenStorage};
    use crate::auth::store::TOKEN_KEY;

    const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxMjMifQ.sig";

    struct Harness {
        auth: AuthSession,
        storage: Arc<MemoryStorage>,
    }

    fn harness(server: &MockServer, storage: Arc<MemoryStorage>) -> Harness {
        let store = Arc::new(SessionStore::new(storage.clone()));
        let graphql = QueryClient::with_client(
            Client::new(),
            format!("{}/graphql", server.uri()),
            store.clone(),
        );
        let auth = AuthSession::with_client(
            Client::new(),
            format!("{}/api/auth/signin", server.uri()),
            store,
            graphql,
        )
        .unwrap();
        Harness { auth, storage }
    }

    async fn mount_signin(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/api/auth/signin"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[test]
    fn test_clean_token_text() {
        assert_eq!(clean_token_text("  \"abc.def.ghi\"\n"), "abc.def.ghi");
        assert_eq!(clean_token_text("'abc.def.ghi'"), "abc.def.ghi");
        assert_eq!(clean_token_text("abc.de\r\nf.ghi"), "abc.def.ghi");
        assert_eq!(clean_token_text("\"\""), "");
        assert_eq!(clean_token_text("   "), "");
        // Only one quote is removed from each end
        assert_eq!(clean_token_text("\"\"abc\"\""), "\"abc\"");
    }

    #[test]
    fn test_basic_value_trims_username() {
        let credentials = Credentials::new("  zoe ", "p:ss");
        assert_eq!(
            credentials.basic_value(),
            format!("Basic {}", STANDARD.encode("zoe:p:ss"))
        );
        assert!(!format!("{:?}", credentials).contains("p:ss"));
    }

    #[tokio::test]
    async fn test_login_commits_cleaned_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/signin"))
            .and(header_matcher(
                "authorization",
                format!("Basic {}", STANDARD.encode("zoe:secret")).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string("  \"abc.def.ghi\"\n"))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&server, Arc::new(MemoryStorage::new()));
        let mut events = h.auth.store().subscribe();

        let token = h.auth.login(&Credentials::new("zoe", "secret")).await.unwrap();
        assert_eq!(token.as_str(), "abc.def.ghi");
        assert!(h.auth.is_authenticated());
        assert_eq!(h.auth.store().current(), Some(token.clone()));
        assert_eq!(h.auth.graphql().token(), Some(token));
        assert_eq!(h.storage.get(TOKEN_KEY).unwrap().as_deref(), Some("abc.def.ghi"));
        assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedIn);
    }

    #[tokio::test]
    async fn test_login_rejected_leaves_store_empty() {
        let server = MockServer::start().await;
        mount_signin(&server, ResponseTemplate::new(401).set_body_string("Unauthorized")).await;

        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, TOKEN).unwrap();
        let h = harness(&server, storage);
        assert!(h.auth.is_authenticated());

        let err = h.auth.login(&Credentials::new("zoe", "wrong")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!h.auth.is_authenticated());
        assert_eq!(h.auth.store().current(), None);
        assert_eq!(h.auth.graphql().token(), None);
        assert_eq!(h.storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_malformed_token() {
        let server = MockServer::start().await;
        mount_signin(&server, ResponseTemplate::new(200).set_body_string("not-a-token")).await;

        let h = harness(&server, Arc::new(MemoryStorage::new()));
        let err = h.auth.login(&Credentials::new("zoe", "secret")).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken));
        assert!(!h.auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_empty_body() {
        let server = MockServer::start().await;
        mount_signin(&server, ResponseTemplate::new(200).set_body_string("\"\"\n")).await;

        let h = harness(&server, Arc::new(MemoryStorage::new()));
        let err = h.auth.login(&Credentials::new("zoe", "secret")).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken));
    }

    #[tokio::test]
    async fn test_login_discards_unrelated_state() {
        let server = MockServer::start().await;
        mount_signin(&server, ResponseTemplate::new(200).set_body_string(TOKEN)).await;

        let storage = Arc::new(MemoryStorage::new());
        storage.set("profile_cache", "{}").unwrap();
        let h = harness(&server, storage);

        h.auth.login(&Credentials::new("zoe", "secret")).await.unwrap();
        assert_eq!(h.storage.get("profile_cache").unwrap(), None);
        assert_eq!(h.storage.get(TOKEN_KEY).unwrap().as_deref(), Some(TOKEN));
    }

    #[tokio::test]
    async fn test_restores_persisted_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header_matcher("authorization", format!("Bearer {}", TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"user": []}})))
            .expect(1)
            .mount(&server)
            .await;

        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, TOKEN).unwrap();
        let h = harness(&server, storage);

        assert!(h.auth.is_authenticated());
        let data = h.auth.graphql().query("{ user { id } }", json!({})).await.unwrap();
        assert_eq!(data, json!({"user": []}));
    }

    #[tokio::test]
    async fn test_corrupted_persisted_session_is_purged() {
        let server = MockServer::start().await;
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "two.parts").unwrap();

        let h = harness(&server, storage);
        assert!(!h.auth.is_authenticated());
        assert_eq!(h.storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_and_signals_reset() {
        let server = MockServer::start().await;
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, TOKEN).unwrap();
        let h = harness(&server, storage);
        let mut events = h.auth.store().subscribe();

        h.auth.logout().unwrap();
        assert!(!h.auth.is_authenticated());
        assert_eq!(h.auth.graphql().token(), None);
        assert_eq!(h.storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedOut);

        let err = h.auth.graphql().query("{ user { id } }", json!({})).await.unwrap_err();
        assert!(matches!(err, crate::api::QueryError::Unauthenticated));
    }
}
