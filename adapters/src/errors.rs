//! Custom error types specific to the `adapters` crate.
//!
//! This module defines errors that can occur while talking to the hosted
//! platform (auth endpoints, the relational REST layer, remote functions)
//! or while persisting the session, providing a unified error handling
//! mechanism for all adapter implementations.

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by every adapter operation.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The auth endpoints rejected the request (bad credentials, expired
    /// refresh token, missing session).
    #[error("Authentication error ({status}): {message}")]
    Auth { status: u16, message: String },

    /// The data or functions layer answered with an error body.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A response body could not be decoded into the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Reading or writing the persisted session failed.
    #[error("Session storage error: {0}")]
    Storage(String),

    /// The adapter was built with unusable settings.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AdapterError {
    /// Postgres / PostgREST error code, when the platform sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            AdapterError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// True for failures that never reached the platform or never came back.
    pub fn is_transient(&self) -> bool {
        matches!(self, AdapterError::Network(_) | AdapterError::Timeout)
    }

    /// True when the platform refused the caller's credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, AdapterError::Auth { .. })
    }

    /// Builds an error from a non-success HTTP response body.
    ///
    /// The auth endpoints and the REST layer use different error shapes; both
    /// are folded into one lookup here.
    pub(crate) fn from_response(status: u16, body: &str, auth: bool) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .error_description
            .or(parsed.msg)
            .or(parsed.message)
            .or(parsed.error)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.trim().to_string()
                }
            });

        if auth {
            AdapterError::Auth { status, message }
        } else {
            AdapterError::Api {
                status,
                code: parsed.code.map(|c| c.into_string()),
                message,
            }
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_decode() {
            AdapterError::Decode(err.to_string())
        } else {
            AdapterError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Decode(err.to_string())
    }
}

/// Union of the error body shapes the platform emits.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<ErrorCode>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// PostgREST sends string codes, the auth service sends numeric ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorCode {
    Text(String),
    Number(i64),
}

impl ErrorCode {
    fn into_string(self) -> String {
        match self {
            ErrorCode::Text(s) => s,
            ErrorCode::Number(n) => n.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgrest_body_keeps_code() {
        let err = AdapterError::from_response(
            409,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":null,"hint":null}"#,
            false,
        );
        assert_eq!(err.code(), Some("23505"));
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn auth_body_prefers_description() {
        let err = AdapterError::from_response(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
            true,
        );
        match err {
            AdapterError::Auth { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn newer_auth_body_uses_msg() {
        let err = AdapterError::from_response(
            400,
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
            true,
        );
        assert!(err.to_string().ends_with("Invalid login credentials"));
    }

    #[test]
    fn non_json_body_is_kept_verbatim() {
        let err = AdapterError::from_response(502, "Bad Gateway", false);
        assert!(err.to_string().contains("Bad Gateway"));
        assert_eq!(err.code(), None);
    }
}
