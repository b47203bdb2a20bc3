use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Request failed: {status} - {body}")]
    Transport { status: u16, body: String },

    #[error("{0}")]
    Application(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid response format - no data")]
    MissingData,

    #[error("Invalid response format - {0}")]
    UnexpectedShape(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Markers the GraphQL engine uses when it rejects a token. Matched
/// case-sensitively so a field merely named `jwt` is not mistaken for one.
const AUTH_FAILURE_MARKERS: [&str; 2] = ["JWT", "Authentication"];

impl QueryError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        QueryError::Transport {
            status: status.as_u16(),
            body: Self::truncate_body(body),
        }
    }

    /// Whether this failure means the session token is missing or was rejected.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            QueryError::Unauthenticated => true,
            QueryError::Transport { status, body } => *status == 401 || mentions_auth(body),
            QueryError::Application(message) => mentions_auth(message),
            _ => false,
        }
    }
}

fn mentions_auth(text: &str) -> bool {
    AUTH_FAILURE_MARKERS.iter().any(|marker| text.contains(marker))
}
