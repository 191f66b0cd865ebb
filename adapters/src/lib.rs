//! Core `adapters` crate for abstracting the hosted backend platform.
//!
//! This crate defines the [`AuthAdapter`], [`DataAdapter`] and
//! [`FunctionsAdapter`] traits, which outline the operations the academy
//! client needs from its backend-as-a-service, and provides the concrete
//! HTTP implementation ([`SupabaseAdapter`]) together with session
//! persistence and the auth notification channel.

pub mod errors;
pub mod events;
pub mod models;
pub mod storage;
pub mod supabase;

use async_trait::async_trait;
use serde_json::Value;

pub use errors::AdapterError;
pub use events::{AuthEventHub, AuthSubscription};
pub use models::{AuthChangeEvent, AuthStateChange, Filter, OAuthProvider, Order, Query, Session, User};
pub use storage::{FileSessionStorage, MemorySessionStorage, SessionStorage};
pub use supabase::{SupabaseAdapter, SupabaseConfig};

/// Identity operations of the auth provider.
#[async_trait]
pub trait AuthAdapter: Send + Sync {
    /// Registers a new account. Returns the session when the provider signs
    /// the user in straight away, `None` when email confirmation is pending.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Option<Session>, AdapterError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AdapterError>;

    /// Ends the current session. Local state is cleared even when the
    /// provider call fails.
    async fn sign_out(&self) -> Result<(), AdapterError>;

    /// URL the user opens to authenticate with a third-party provider.
    fn oauth_authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String, AdapterError>;

    /// Current session, refreshed first when its access token has expired.
    async fn get_session(&self) -> Result<Option<Session>, AdapterError>;

    fn subscribe(&self) -> AuthSubscription;
}

/// Row-level operations against the platform's relations.
#[async_trait]
pub trait DataAdapter: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, AdapterError>;

    /// Inserts one row and returns the stored representation.
    async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, AdapterError>;

    /// Applies `patch` to every row matching `filters`; returns the updated rows.
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>, AdapterError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), AdapterError>;

    /// Calls a named remote procedure with JSON arguments.
    async fn rpc(&self, function: &str, args: Value) -> Result<Value, AdapterError>;
}

/// Remotely deployed functions.
#[async_trait]
pub trait FunctionsAdapter: Send + Sync {
    async fn invoke(&self, function: &str, access_token: &str, body: Value) -> Result<Value, AdapterError>;
}
