//! Core business logic for the authentication system.
//!
//! [`SessionStore`] is the single owner of "who is signed in" and "what is
//! their profile". It delegates credential work to the auth provider, keeps
//! the cached profile in step with the identity, and publishes every change
//! through a `watch` channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use academy_adapters::{AuthAdapter, AuthStateChange, DataAdapter, OAuthProvider, Session};
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::auth::errors::AuthError;
use crate::auth::models::{AuthSnapshot, ProfileUpdate, SignUpForm};
use crate::database::models::Profile;
use crate::database::queries;
use crate::services::ProfileFetcher;

pub struct SessionStore {
    auth: Arc<dyn AuthAdapter>,
    db: Arc<dyn DataAdapter>,
    fetcher: ProfileFetcher,
    settle_delay: Duration,
    state: watch::Sender<AuthSnapshot>,
    alive: AtomicBool,
    /// Bumped whenever the signed-in user changes. A profile fetch only
    /// commits if the epoch it started under is still current.
    epoch: AtomicU64,
}

impl SessionStore {
    pub fn new(
        auth: Arc<dyn AuthAdapter>,
        db: Arc<dyn DataAdapter>,
        fetcher: ProfileFetcher,
        settle_delay: Duration,
    ) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::initial());
        Self {
            auth,
            db,
            fetcher,
            settle_delay,
            state,
            alive: AtomicBool::new(true),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stops all further state writes. Requests already in flight finish
    /// but their results are dropped.
    pub fn teardown(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            info!("session store torn down");
        }
    }

    /// Resolves the persisted session, if any, and its profile.
    pub async fn initialize(&self) {
        info!("initializing auth state");
        match self.auth.get_session().await {
            Ok(session) => {
                let epoch = self.set_identity(session.as_ref());
                if let Some(session) = session {
                    let profile = self.fetcher.fetch(&session.user.id).await;
                    self.commit_profile(epoch, &session.user.id, profile);
                }
            }
            Err(e) => {
                error!(error = %e, "error getting session");
                self.set_identity(None);
            }
        }
        self.write(|s| s.loading = false);
    }

    /// Applies one provider notification. Callers must feed notifications in
    /// emission order and await each before the next.
    pub async fn on_auth_state_changed(&self, change: AuthStateChange) {
        if !self.is_alive() {
            return;
        }
        info!(event = %change.event, user_id = ?change.user().map(|u| u.id.as_str()), "auth state changed");

        let epoch = self.set_identity(change.session.as_ref());
        let Some(user) = change.user() else {
            return;
        };

        tokio::time::sleep(self.settle_delay).await;
        if !self.is_alive() || self.current_epoch() != epoch {
            debug!(user_id = %user.id, "identity changed during settle delay, skipping fetch");
            return;
        }

        let profile = self.fetcher.fetch(&user.id).await;
        self.commit_profile(epoch, &user.id, profile);
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<Option<Session>, AuthError> {
        form.validate()?;
        let session = self
            .auth
            .sign_up(form.email.trim(), &form.password, form.full_name.trim())
            .await?;
        info!(confirmed = session.is_some(), "account registered");
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation("يرجى ملء جميع الحقول المطلوبة".to_string()));
        }
        self.auth
            .sign_in_with_password(email.trim(), password)
            .await
            .map_err(AuthError::from_sign_in)
    }

    /// Returns the URL the user must visit to continue with `provider`.
    pub fn sign_in_with_oauth(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String, AuthError> {
        Ok(self.auth.oauth_authorize_url(provider, redirect_to)?)
    }

    /// Signs out remotely, then forgets identity and profile locally even if
    /// the remote call failed.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.auth.sign_out().await;
        self.set_identity(None);
        if let Err(e) = &result {
            warn!(error = %e, "remote sign-out failed, local state cleared anyway");
        }
        result.map_err(AuthError::from)
    }

    /// Re-reads the profile of the current user.
    pub async fn refresh_profile(&self) {
        let (epoch, user_id) = {
            let state = self.state.borrow();
            match state.user_id() {
                Some(id) => (self.current_epoch(), id.to_string()),
                None => return,
            }
        };
        self.write(|s| s.profile_pending = true);
        let profile = self.fetcher.fetch(&user_id).await;
        self.commit_profile(epoch, &user_id, profile);
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), AuthError> {
        let user_id = self
            .state
            .borrow()
            .user_id()
            .map(str::to_string)
            .ok_or(AuthError::NotSignedIn)?;
        if update.is_empty() {
            debug!(user_id = %user_id, "empty profile update ignored");
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        queries::update_profile(self.db.as_ref(), &user_id, update, &now).await?;
        info!(user_id = %user_id, "profile updated");
        self.refresh_profile().await;
        Ok(())
    }

    /// Waits until the store has resolved everything for `user_id`, or the
    /// deadline passes, and returns the state at that point.
    pub async fn settled_for(&self, user_id: &str, within: Duration) -> AuthSnapshot {
        let mut rx = self.subscribe();
        let wait = rx.wait_for(|s| s.user_id() == Some(user_id) && s.is_settled());
        if tokio::time::timeout(within, wait).await.is_err() {
            warn!(user_id, "auth state did not settle in time");
        }
        self.snapshot()
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Publishes a state change unless the store has been torn down.
    fn write(&self, f: impl FnOnce(&mut AuthSnapshot)) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.state.send_modify(f);
        true
    }

    /// Sets user and session in one update. A different user (or none)
    /// drops the cached profile in that same update and starts a new epoch.
    fn set_identity(&self, session: Option<&Session>) -> u64 {
        let epoch = &self.epoch;
        self.write(|s| {
            let next_user = session.map(|sess| sess.user.clone());
            let same_user = match (&s.user, &next_user) {
                (Some(current), Some(next)) => current.id == next.id,
                _ => false,
            };
            if !same_user {
                epoch.fetch_add(1, Ordering::SeqCst);
                s.profile = None;
            }
            s.profile_pending = next_user.is_some();
            s.user = next_user;
            s.session = session.cloned();
        });
        self.current_epoch()
    }

    fn commit_profile(&self, epoch: u64, user_id: &str, profile: Option<Profile>) -> bool {
        if !self.is_alive() {
            debug!(user_id, "store torn down, dropping fetched profile");
            return false;
        }
        let current = &self.epoch;
        let committed = self.state.send_if_modified(|s| {
            if current.load(Ordering::SeqCst) != epoch || s.user_id() != Some(user_id) {
                return false;
            }
            s.profile = profile;
            s.profile_pending = false;
            true
        });
        if !committed {
            debug!(user_id, "identity changed while fetching, discarding profile");
        }
        committed
    }
}
