//! Shared handles passed to every console handler.

use std::sync::Arc;
use std::time::Duration;

use academy_adapters::{AuthAdapter, DataAdapter, FunctionsAdapter};

use crate::auth::errors::AuthError;
use crate::auth::middleware::GateDecision;
use crate::auth::routes;
use crate::auth::service::SessionStore;
use crate::config::{Config, DEFAULT_PROFILE_TIMEOUT_MS, DEFAULT_REDIRECT_URL, DEFAULT_SETTLE_DELAY_MS};
use crate::errors::AppError;
use crate::services::ProfileFetcher;

#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub profile_timeout: Duration,
    pub settle_delay: Duration,
    pub redirect_url: String,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            profile_timeout: Duration::from_millis(DEFAULT_PROFILE_TIMEOUT_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
        }
    }
}

impl From<&Config> for ContextOptions {
    fn from(config: &Config) -> Self {
        Self {
            profile_timeout: config.profile_timeout,
            settle_delay: config.settle_delay,
            redirect_url: config.redirect_url.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub auth: Arc<dyn AuthAdapter>,
    pub db: Arc<dyn DataAdapter>,
    pub functions: Arc<dyn FunctionsAdapter>,
    pub store: Arc<SessionStore>,
    pub options: ContextOptions,
}

impl AppContext {
    /// Wires one backend into every seam.
    pub fn new<B>(backend: Arc<B>, options: ContextOptions) -> Self
    where
        B: AuthAdapter + DataAdapter + FunctionsAdapter + 'static,
    {
        let auth: Arc<dyn AuthAdapter> = backend.clone();
        let db: Arc<dyn DataAdapter> = backend.clone();
        let functions: Arc<dyn FunctionsAdapter> = backend;
        let fetcher = ProfileFetcher::new(db.clone(), options.profile_timeout);
        let store = Arc::new(SessionStore::new(
            auth.clone(),
            db.clone(),
            fetcher,
            options.settle_delay,
        ));
        Self {
            auth,
            db,
            functions,
            store,
            options,
        }
    }

    /// Checks the current auth state against the access `path` requires.
    pub fn authorize(&self, path: &str) -> Result<(), AppError> {
        let snapshot = self.store.snapshot();
        match routes::check(&snapshot, path) {
            Some(GateDecision::Allow) => Ok(()),
            Some(GateDecision::Deny(reason)) => Err(AppError::Forbidden(reason)),
            Some(GateDecision::Pending) => Err(AppError::Validation(
                "جاري التحميل، حاول مرة أخرى".to_string(),
            )),
            None => Err(AppError::NotFound(path.to_string())),
        }
    }

    /// Access token of the provider's current session.
    pub async fn access_token(&self) -> Result<String, AppError> {
        self.auth
            .get_session()
            .await?
            .map(|s| s.access_token)
            .ok_or(AppError::Auth(AuthError::NotSignedIn))
    }
}
