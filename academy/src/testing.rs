//! In-memory stand-in for the hosted platform, used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use academy_adapters::{
    AdapterError, AuthAdapter, AuthChangeEvent, AuthEventHub, AuthStateChange, AuthSubscription,
    DataAdapter, Filter, FunctionsAdapter, OAuthProvider, Query, Session, User,
};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::database::models::{Profile, ProfileStatus, Role};
use crate::database::GET_USER_PROFILE_RPC;

pub fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: Some(format!("{id}@example.com")),
        user_metadata: Value::Null,
    }
}

pub fn session(id: &str) -> Session {
    Session {
        access_token: format!("token-{id}"),
        refresh_token: format!("refresh-{id}"),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        expires_at: None,
        user: user(id),
    }
}

pub fn profile(id: &str, role: Role, status: ProfileStatus) -> Profile {
    Profile {
        id: id.to_string(),
        email: Some(format!("{id}@example.com")),
        full_name: Some(format!("User {id}")),
        avatar_url: None,
        role,
        status,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

/// Canned reply for a remote function call.
#[derive(Debug, Clone)]
pub enum FunctionReply {
    Json(Value),
    NetworkFailure,
}

#[derive(Default)]
struct State {
    session: Option<Session>,
    session_error: bool,
    credentials: HashMap<String, (String, String)>,
    profiles: HashMap<String, Profile>,
    rpc_delay: Duration,
    tables: HashMap<String, Vec<Value>>,
    insert_error: Option<(u16, String, String)>,
    function_reply: Option<FunctionReply>,
    calls: Vec<String>,
}

pub struct FakeBackend {
    hub: AuthEventHub,
    rpc_fail: AtomicBool,
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hub: AuthEventHub::new(),
            rpc_fail: AtomicBool::new(false),
            state: Mutex::new(State::default()),
        })
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn record(&self, call: impl Into<String>) {
        self.with(|s| s.calls.push(call.into()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|s| s.calls.clone())
    }

    pub fn set_session(&self, session: Option<Session>) {
        self.with(|s| s.session = session);
    }

    pub fn fail_get_session(&self, fail: bool) {
        self.with(|s| s.session_error = fail);
    }

    pub fn add_account(&self, email: &str, password: &str, user_id: &str) {
        self.with(|s| {
            s.credentials
                .insert(email.to_string(), (password.to_string(), user_id.to_string()))
        });
    }

    pub fn put_profile(&self, profile: Profile) {
        self.with(|s| {
            s.tables
                .entry("profiles".to_string())
                .or_default()
                .push(serde_json::to_value(&profile).unwrap());
            s.profiles.insert(profile.id.clone(), profile);
        });
    }

    pub fn set_rpc_delay(&self, delay: Duration) {
        self.with(|s| s.rpc_delay = delay);
    }

    pub fn fail_rpc(&self, fail: bool) {
        self.rpc_fail.store(fail, Ordering::SeqCst);
    }

    pub fn put_rows(&self, table: &str, rows: Vec<Value>) {
        self.with(|s| s.tables.entry(table.to_string()).or_default().extend(rows));
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.with(|s| s.tables.get(table).cloned().unwrap_or_default())
    }

    pub fn fail_inserts(&self, status: u16, code: &str, message: &str) {
        self.with(|s| s.insert_error = Some((status, code.to_string(), message.to_string())));
    }

    pub fn reply_to_functions(&self, reply: FunctionReply) {
        self.with(|s| s.function_reply = Some(reply));
    }

    pub fn emit(&self, change: AuthStateChange) {
        self.hub.emit(change);
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    fn matches(row: &Value, filters: &[Filter]) -> bool {
        filters.iter().all(|f| match row.get(&f.column) {
            Some(Value::String(s)) => *s == f.value,
            Some(other) => other.to_string() == f.value,
            None => false,
        })
    }
}

#[async_trait]
impl AuthAdapter for FakeBackend {
    async fn sign_up(&self, email: &str, _password: &str, _full_name: &str) -> Result<Option<Session>, AdapterError> {
        self.record(format!("sign_up:{email}"));
        Ok(None)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AdapterError> {
        self.record(format!("sign_in:{email}"));
        let account = self.with(|s| s.credentials.get(email).cloned());
        match account {
            Some((expected, user_id)) if expected == password => {
                let session = session(&user_id);
                self.set_session(Some(session.clone()));
                self.hub
                    .emit(AuthStateChange::new(AuthChangeEvent::SignedIn, Some(session.clone())));
                Ok(session)
            }
            _ => Err(AdapterError::Auth {
                status: 400,
                message: "Invalid login credentials".to_string(),
            }),
        }
    }

    async fn sign_out(&self) -> Result<(), AdapterError> {
        self.record("sign_out");
        self.set_session(None);
        self.hub
            .emit(AuthStateChange::new(AuthChangeEvent::SignedOut, None));
        Ok(())
    }

    fn oauth_authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String, AdapterError> {
        Ok(format!(
            "https://fake.test/auth/v1/authorize?provider={}&redirect_to={redirect_to}",
            provider.as_str()
        ))
    }

    async fn get_session(&self) -> Result<Option<Session>, AdapterError> {
        self.record("get_session");
        self.with(|s| {
            if s.session_error {
                Err(AdapterError::Network("connection refused".to_string()))
            } else {
                Ok(s.session.clone())
            }
        })
    }

    fn subscribe(&self) -> AuthSubscription {
        self.hub.subscribe()
    }
}

#[async_trait]
impl DataAdapter for FakeBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, AdapterError> {
        self.record(format!("select:{}", query.table));
        Ok(self.with(|s| {
            let rows = s.tables.get(&query.table).cloned().unwrap_or_default();
            let mut rows: Vec<Value> = rows
                .into_iter()
                .filter(|row| Self::matches(row, &query.filters))
                .collect();
            if let Some(limit) = query.limit {
                rows.truncate(limit);
            }
            rows
        }))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, AdapterError> {
        self.record(format!("insert:{table}"));
        self.with(|s| {
            if let Some((status, code, message)) = s.insert_error.clone() {
                return Err(AdapterError::Api {
                    status,
                    code: Some(code),
                    message,
                });
            }
            s.tables
                .entry(table.to_string())
                .or_default()
                .push(row.clone());
            Ok(vec![row])
        })
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>, AdapterError> {
        self.record(format!("update:{table}"));
        Ok(self.with(|s| {
            let mut updated = Vec::new();
            for row in s.tables.entry(table.to_string()).or_default().iter_mut() {
                if Self::matches(row, filters) {
                    if let (Value::Object(target), Value::Object(changes)) = (&mut *row, &patch) {
                        for (k, v) in changes {
                            target.insert(k.clone(), v.clone());
                        }
                    }
                    updated.push(row.clone());
                }
            }
            updated
        }))
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), AdapterError> {
        self.record(format!("delete:{table}"));
        self.with(|s| {
            if let Some(rows) = s.tables.get_mut(table) {
                rows.retain(|row| !Self::matches(row, filters));
            }
        });
        Ok(())
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, AdapterError> {
        self.record(format!("rpc:{function}"));
        let delay = self.with(|s| s.rpc_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.rpc_fail.load(Ordering::SeqCst) {
            return Err(AdapterError::Network("rpc unavailable".to_string()));
        }
        if function != GET_USER_PROFILE_RPC {
            return Err(AdapterError::Api {
                status: 404,
                code: Some("PGRST202".to_string()),
                message: format!("unknown function {function}"),
            });
        }
        let user_id = args["user_id"].as_str().unwrap_or_default().to_string();
        Ok(self.with(|s| match s.profiles.get(&user_id) {
            Some(p) => json!([p]),
            None => json!([]),
        }))
    }
}

#[async_trait]
impl FunctionsAdapter for FakeBackend {
    async fn invoke(&self, function: &str, access_token: &str, _body: Value) -> Result<Value, AdapterError> {
        self.record(format!("invoke:{function}:{access_token}"));
        match self.with(|s| s.function_reply.clone()) {
            Some(FunctionReply::Json(value)) => Ok(value),
            Some(FunctionReply::NetworkFailure) => {
                Err(AdapterError::Network("connection reset".to_string()))
            }
            None => Ok(json!({ "success": [], "errors": [] })),
        }
    }
}
