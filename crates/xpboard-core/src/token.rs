//! Three-segment signed token handling.
//!
//! Tokens are checked for shape only: three dot-separated URL-safe base64
//! segments. The signature segment is never verified here; the issuing
//! server is the authority on whether a token is genuine or expired.

use std::fmt;
use std::str::FromStr;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Number of dot-separated segments in a well-formed token.
pub const SEGMENT_COUNT: usize = 3;

/// Index of the claims payload segment.
const CLAIMS_SEGMENT: usize = 1;

/// Characters shown when a token is logged or debug-printed.
const TOKEN_PREFIX_LEN: usize = 10;

/// Standard alphabet decoder that tolerates non-zero trailing bits,
/// matching what browsers accept for `atob`.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid base64url string length: {0}")]
    MalformedSegment(usize),

    #[error("Invalid token format")]
    InvalidTokenShape,

    #[error("Failed to decode token claims: {0}")]
    Decode(String),
}

/// Convert a base64url segment to standard base64 with `=` padding.
///
/// A length of `4n + 1` can never be produced by an encoder and is rejected.
pub fn normalize_base64_url(segment: &str) -> Result<String, TokenError> {
    let mut output: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let length = output.chars().count();
    match length % 4 {
        0 => {}
        2 => output.push_str("=="),
        3 => output.push('='),
        _ => return Err(TokenError::MalformedSegment(length)),
    }
    Ok(output)
}

fn is_base64_url_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Shape check: exactly three segments, each in the base64url alphabet and
/// of a paddable length. Says nothing about the signature or expiry.
pub fn is_structurally_valid(token: &str) -> bool {
    if token.is_empty() {
        debug!("Token is empty");
        return false;
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != SEGMENT_COUNT {
        debug!(segments = parts.len(), "Token does not have three parts");
        return false;
    }

    for (index, part) in parts.iter().enumerate() {
        if !part.chars().all(is_base64_url_char) {
            debug!(segment = index, "Token part contains invalid characters");
            return false;
        }
        if let Err(e) = normalize_base64_url(part) {
            debug!(segment = index, error = %e, "Token part cannot be converted to base64");
            return false;
        }
    }
    true
}

/// Decode the claims segment into JSON.
///
/// Intended for inspection and display; nothing decoded here is trusted.
pub fn decode_claims(token: &str) -> Result<Value, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != SEGMENT_COUNT {
        return Err(TokenError::InvalidTokenShape);
    }

    let normalized = normalize_base64_url(parts[CLAIMS_SEGMENT])?;
    let bytes = LENIENT_STANDARD
        .decode(normalized)
        .map_err(|e| TokenError::Decode(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|e| TokenError::Decode(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| TokenError::Decode(e.to_string()))
}

/// A token that has passed [`is_structurally_valid`].
///
/// The only way to build one is through [`Token::parse`], so holders never
/// need to re-check the shape.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn parse(raw: impl Into<String>) -> Result<Self, TokenError> {
        let raw = raw.into();
        if is_structurally_valid(&raw) {
            Ok(Self(raw))
        } else {
            Err(TokenError::InvalidTokenShape)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Decoded claims payload
    pub fn claims(&self) -> Result<Value, TokenError> {
        decode_claims(&self.0)
    }

    /// Leading characters, safe to put in logs
    pub fn prefix(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(TOKEN_PREFIX_LEN)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}...)", self.prefix())
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Token::parse(s)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
