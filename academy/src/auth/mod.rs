//! Authentication module for managing sessions, profiles, and access control.
//!
//! This module provides the public interface for authentication-related
//! functionality: the session store, the listener feeding it provider
//! notifications, the authorization gate with its route table, and the
//! console handlers for signing in and out.

pub mod errors;
pub mod handlers;
pub mod listener;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;

// Re-exports for convenience
pub use errors::AuthError;
pub use listener::{AuthChangeListener, ListenerHandle};
pub use middleware::{evaluate, AccessRequirement, DenyReason, GateDecision};
pub use models::{AuthSnapshot, ProfileUpdate, SignUpForm};
pub use service::SessionStore;
