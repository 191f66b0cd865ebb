//! Generic data models for the `adapters` crate.
//!
//! These models define the platform-neutral representations of identities,
//! sessions, auth notifications and table queries that every adapter
//! implementation accepts or returns, so the application layer works with a
//! consistent data format.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Seconds before `expires_at` at which a session is already treated as
/// expired.
pub const EXPIRY_MARGIN_SECS: i64 = 10;

/// An authenticated identity as issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

/// Tokens plus the identity they were issued for.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix seconds. Filled from `expires_in` when the provider omits it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Fills `expires_at` from `expires_in` when the provider left it out.
    pub fn stamped(mut self) -> Self {
        if self.expires_at.is_none() && self.expires_in > 0 {
            self.expires_at = Some(Utc::now().timestamp() + self.expires_in);
        }
        self
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => at - EXPIRY_MARGIN_SECS <= Utc::now().timestamp(),
            None => false,
        }
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Kinds of auth state transitions the provider announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for AuthChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthChangeEvent::SignedIn => "SIGNED_IN",
            AuthChangeEvent::SignedOut => "SIGNED_OUT",
            AuthChangeEvent::TokenRefreshed => "TOKEN_REFRESHED",
            AuthChangeEvent::UserUpdated => "USER_UPDATED",
        };
        f.write_str(name)
    }
}

/// One notification: the event and the session that is current after it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStateChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

impl AuthStateChange {
    pub fn new(event: AuthChangeEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// Third-party identity providers offered on the sign-in screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
        }
    }
}

/// Equality filter on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }
}

/// Sort key for a select.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A select against one relation.
///
/// Built fluently:
///
/// ```
/// use academy_adapters::Query;
///
/// let query = Query::table("profiles")
///     .eq("status", "pending")
///     .order("created_at", false);
/// assert_eq!(query.table, "profiles");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    /// Column list in the platform's select syntax, embedded relations
    /// included (`id,title,categories(name_ar,slug)`).
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at: Option<i64>) -> Session {
        Session {
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
            token_type: "bearer".into(),
            expires_in: 3600,
            expires_at,
            user: User {
                id: "u1".into(),
                email: Some("a@example.com".into()),
                user_metadata: Value::Null,
            },
        }
    }

    #[test]
    fn stamped_fills_missing_expiry() {
        let s = session(None).stamped();
        let at = s.expires_at.unwrap();
        assert!(at > Utc::now().timestamp());
        assert!(!s.is_expired());
    }

    #[test]
    fn past_expiry_is_expired() {
        let s = session(Some(Utc::now().timestamp() - 5));
        assert!(s.is_expired());
    }

    #[test]
    fn debug_hides_tokens() {
        let rendered = format!("{:?}", session(Some(0)));
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
        assert!(rendered.contains("u1"));
    }

    #[test]
    fn session_deserializes_provider_payload() {
        let body = r#"{
            "access_token": "at",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "rt",
            "user": {"id": "u1", "email": "a@example.com", "user_metadata": {"full_name": "Ali"}}
        }"#;
        let s: Session = serde_json::from_str(body).unwrap();
        assert_eq!(s.user.user_metadata["full_name"], "Ali");
        assert_eq!(s.expires_at, None);
    }
}
