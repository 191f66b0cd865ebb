//! Supabase-compatible adapter implementation for the hosted platform.
//!
//! This file contains the complete concrete implementation of the
//! [`AuthAdapter`], [`DataAdapter`] and [`FunctionsAdapter`] traits over
//! HTTP: the auth endpoints (`/auth/v1`), the REST layer over the relational
//! store (`/rest/v1`) and deployed functions (`/functions/v1`), including
//! session persistence and refresh.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::errors::AdapterError;
use crate::events::{AuthEventHub, AuthSubscription};
use crate::models::{AuthChangeEvent, AuthStateChange, Filter, OAuthProvider, Query, Session};
use crate::storage::SessionStorage;
use crate::{AuthAdapter, DataAdapter, FunctionsAdapter};

pub const DEFAULT_STORAGE_KEY: &str = "ibdae-academy-auth-session";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const CLIENT_INFO: &str = concat!("academy-rs/", env!("CARGO_PKG_VERSION"));

/// Connection settings for one platform project.
#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub request_timeout: Duration,
    pub storage_key: String,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"***")
            .field("request_timeout", &self.request_timeout)
            .field("storage_key", &self.storage_key)
            .finish()
    }
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    fn validate(&self) -> Result<(), AdapterError> {
        let url = Url::parse(&self.url)
            .map_err(|e| AdapterError::InvalidConfig(format!("platform url {}: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AdapterError::InvalidConfig(format!(
                "platform url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.anon_key.trim().is_empty() {
            return Err(AdapterError::InvalidConfig("anon key is empty".to_string()));
        }
        Ok(())
    }
}

/// Cached copy of the persisted session.
#[derive(Default)]
struct SessionSlot {
    loaded: bool,
    current: Option<Session>,
}

pub struct SupabaseAdapter {
    config: SupabaseConfig,
    base_url: String,
    client: Client,
    storage: Arc<dyn SessionStorage>,
    slot: Mutex<SessionSlot>,
    /// Held while a refresh-token grant is in flight.
    refresh: Mutex<()>,
    events: AuthEventHub,
}

impl fmt::Debug for SupabaseAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SupabaseAdapter {
    pub fn new(config: SupabaseConfig, storage: Arc<dyn SessionStorage>) -> Result<Self, AdapterError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AdapterError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        info!(url = %config.url, "initializing platform client");

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            config,
            client,
            storage,
            slot: Mutex::new(SessionSlot::default()),
            refresh: Mutex::new(()),
            events: AuthEventHub::new(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, builder: RequestBuilder, bearer: &str) -> RequestBuilder {
        builder
            .header("apikey", &self.config.anon_key)
            .header("x-client-info", CLIENT_INFO)
            .bearer_auth(bearer)
    }

    async fn send(&self, builder: RequestBuilder, auth: bool) -> Result<Response, AdapterError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "platform returned error");
        Err(AdapterError::from_response(status.as_u16(), &body, auth))
    }

    /// Reads a body that may legitimately be empty (204, `return=minimal`).
    async fn json_or_null(response: Response) -> Result<Value, AdapterError> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }

    fn rows(value: Value) -> Result<Vec<Value>, AdapterError> {
        match value {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    /// Token for data requests: the user's when signed in, else the anon key.
    async fn bearer(&self) -> Result<String, AdapterError> {
        Ok(match self.get_session().await? {
            Some(session) => session.access_token,
            None => self.config.anon_key.clone(),
        })
    }

    async fn cached_session(&self) -> Result<Option<Session>, AdapterError> {
        let mut slot = self.slot.lock().await;
        if !slot.loaded {
            slot.current = match self.storage.get_item(&self.config.storage_key).await? {
                Some(raw) => match serde_json::from_str::<Session>(&raw) {
                    Ok(session) => Some(session),
                    Err(e) => {
                        warn!(error = %e, "discarding unreadable stored session");
                        self.storage.remove_item(&self.config.storage_key).await?;
                        None
                    }
                },
                None => None,
            };
            slot.loaded = true;
        }
        Ok(slot.current.clone())
    }

    async fn store_session(&self, session: &Session) -> Result<(), AdapterError> {
        let raw = serde_json::to_string(session)?;
        self.storage.set_item(&self.config.storage_key, &raw).await?;
        let mut slot = self.slot.lock().await;
        slot.current = Some(session.clone());
        slot.loaded = true;
        Ok(())
    }

    async fn clear_session(&self) -> Result<(), AdapterError> {
        {
            let mut slot = self.slot.lock().await;
            slot.current = None;
            slot.loaded = true;
        }
        self.storage.remove_item(&self.config.storage_key).await
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, AdapterError> {
        let builder = self
            .client
            .post(self.endpoint("/auth/v1/token"))
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let response = self
            .send(self.request(builder, &self.config.anon_key), true)
            .await?;
        let session: Session = response.json().await?;
        Ok(session.stamped())
    }

    fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
        filters
            .iter()
            .map(|f| (f.column.clone(), format!("eq.{}", f.value)))
            .collect()
    }
}

#[async_trait]
impl AuthAdapter for SupabaseAdapter {
    #[instrument(skip(self, password, full_name), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Option<Session>, AdapterError> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        });
        let builder = self.client.post(self.endpoint("/auth/v1/signup")).json(&body);
        let response = self
            .send(self.request(builder, &self.config.anon_key), true)
            .await?;
        let value: Value = response.json().await?;

        // Without an access token the account awaits email confirmation.
        if value.get("access_token").is_none() {
            info!("sign-up accepted, confirmation pending");
            return Ok(None);
        }

        let session: Session = serde_json::from_value::<Session>(value)?.stamped();
        self.store_session(&session).await?;
        self.events
            .emit(AuthStateChange::new(AuthChangeEvent::SignedIn, Some(session.clone())));
        Ok(Some(session))
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AdapterError> {
        let session = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        info!(user_id = %session.user.id, "signed in");
        self.store_session(&session).await?;
        self.events
            .emit(AuthStateChange::new(AuthChangeEvent::SignedIn, Some(session.clone())));
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AdapterError> {
        let remote = match self.cached_session().await? {
            Some(session) => {
                let builder = self.client.post(self.endpoint("/auth/v1/logout"));
                match self.send(self.request(builder, &session.access_token), true).await {
                    Ok(_) => Ok(()),
                    // The session is already gone on the provider side.
                    Err(AdapterError::Auth { status, .. })
                        if matches!(status, 401 | 403 | 404) =>
                    {
                        Ok(())
                    }
                    Err(e) => {
                        warn!(error = %e, "provider sign-out failed, clearing local session anyway");
                        Err(e)
                    }
                }
            }
            None => Ok(()),
        };

        self.clear_session().await?;
        self.events
            .emit(AuthStateChange::new(AuthChangeEvent::SignedOut, None));
        remote
    }

    fn oauth_authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String, AdapterError> {
        let url = Url::parse_with_params(
            &self.endpoint("/auth/v1/authorize"),
            &[("provider", provider.as_str()), ("redirect_to", redirect_to)],
        )
        .map_err(|e| AdapterError::InvalidConfig(e.to_string()))?;
        Ok(url.to_string())
    }

    async fn get_session(&self) -> Result<Option<Session>, AdapterError> {
        let session = match self.cached_session().await? {
            Some(session) => session,
            None => return Ok(None),
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }

        // Refresh tokens are single-use: one grant at a time, and a caller
        // that waited here picks up the session the other one stored.
        let _refreshing = self.refresh.lock().await;
        let session = match self.cached_session().await? {
            Some(session) if !session.is_expired() => return Ok(Some(session)),
            Some(session) => session,
            None => return Ok(None),
        };

        debug!(user_id = %session.user.id, "access token expired, refreshing");
        match self
            .token_grant("refresh_token", json!({ "refresh_token": session.refresh_token }))
            .await
        {
            Ok(fresh) => {
                self.store_session(&fresh).await?;
                self.events
                    .emit(AuthStateChange::new(AuthChangeEvent::TokenRefreshed, Some(fresh.clone())));
                Ok(Some(fresh))
            }
            Err(e) if e.is_auth() => {
                warn!(error = %e, "refresh token rejected, signing out locally");
                self.clear_session().await?;
                self.events
                    .emit(AuthStateChange::new(AuthChangeEvent::SignedOut, None));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

#[async_trait]
impl DataAdapter for SupabaseAdapter {
    #[instrument(skip(self, query), fields(table = %query.table))]
    async fn select(&self, query: &Query) -> Result<Vec<Value>, AdapterError> {
        let mut params = vec![("select".to_string(), query.columns.clone())];
        params.extend(Self::filter_pairs(&query.filters));
        if !query.order.is_empty() {
            let order = query
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        let bearer = self.bearer().await?;
        let builder = self
            .client
            .get(self.endpoint(&format!("/rest/v1/{}", query.table)))
            .query(&params);
        let response = self.send(self.request(builder, &bearer), false).await?;
        Self::rows(Self::json_or_null(response).await?)
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, AdapterError> {
        let bearer = self.bearer().await?;
        let builder = self
            .client
            .post(self.endpoint(&format!("/rest/v1/{table}")))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send(self.request(builder, &bearer), false).await?;
        Self::rows(Self::json_or_null(response).await?)
    }

    #[instrument(skip(self, filters, patch))]
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>, AdapterError> {
        let bearer = self.bearer().await?;
        let builder = self
            .client
            .patch(self.endpoint(&format!("/rest/v1/{table}")))
            .query(&Self::filter_pairs(filters))
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(self.request(builder, &bearer), false).await?;
        Self::rows(Self::json_or_null(response).await?)
    }

    #[instrument(skip(self, filters))]
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), AdapterError> {
        let bearer = self.bearer().await?;
        let builder = self
            .client
            .delete(self.endpoint(&format!("/rest/v1/{table}")))
            .query(&Self::filter_pairs(filters));
        self.send(self.request(builder, &bearer), false).await?;
        Ok(())
    }

    #[instrument(skip(self, args))]
    async fn rpc(&self, function: &str, args: Value) -> Result<Value, AdapterError> {
        let bearer = self.bearer().await?;
        let builder = self
            .client
            .post(self.endpoint(&format!("/rest/v1/rpc/{function}")))
            .json(&args);
        let response = self.send(self.request(builder, &bearer), false).await?;
        Self::json_or_null(response).await
    }
}

#[async_trait]
impl FunctionsAdapter for SupabaseAdapter {
    #[instrument(skip(self, access_token, body))]
    async fn invoke(&self, function: &str, access_token: &str, body: Value) -> Result<Value, AdapterError> {
        let builder = self
            .client
            .post(self.endpoint(&format!("/functions/v1/{function}")))
            .json(&body);
        let response = self.send(self.request(builder, access_token), false).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        Self::json_or_null(response).await
    }
}
