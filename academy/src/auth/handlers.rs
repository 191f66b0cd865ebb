//! Handler functions for the sign-in, sign-up and session commands.
//!
//! These validate input, call the `auth::service` session store and return
//! what the console prints. State changes themselves arrive through the
//! auth change listener.

use std::time::Duration;

use academy_adapters::OAuthProvider;
use tracing::info;

use crate::auth::errors::AuthError;
use crate::auth::middleware::GateDecision;
use crate::auth::models::{AuthSnapshot, ProfileUpdate, SignUpForm};
use crate::auth::routes;
use crate::context::AppContext;
use crate::errors::AppError;

/// Slack on top of settle delay and profile timeout when waiting for the
/// listener to catch up with a sign-in.
const SETTLE_SLACK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn,
    /// The provider wants the address confirmed first.
    ConfirmationPending,
}

impl SignUpOutcome {
    pub fn user_message(&self) -> &'static str {
        match self {
            SignUpOutcome::SignedIn => "تم إنشاء الحساب بنجاح",
            SignUpOutcome::ConfirmationPending => {
                "تم إنشاء الحساب بنجاح، يرجى التحقق من بريدك الإلكتروني"
            }
        }
    }
}

fn settle_window(ctx: &AppContext) -> Duration {
    ctx.options.settle_delay + ctx.options.profile_timeout + SETTLE_SLACK
}

/// Signs in and waits until the profile for the new identity is resolved.
pub async fn sign_in(ctx: &AppContext, email: &str, password: &str) -> Result<AuthSnapshot, AppError> {
    let session = ctx.store.sign_in(email, password).await?;
    info!(user_id = %session.user.id, "signed in");
    Ok(ctx.store.settled_for(&session.user.id, settle_window(ctx)).await)
}

pub async fn sign_up(ctx: &AppContext, form: &SignUpForm) -> Result<SignUpOutcome, AppError> {
    let outcome = match ctx.store.sign_up(form).await? {
        Some(session) => {
            ctx.store.settled_for(&session.user.id, settle_window(ctx)).await;
            SignUpOutcome::SignedIn
        }
        None => SignUpOutcome::ConfirmationPending,
    };
    Ok(outcome)
}

pub async fn sign_out(ctx: &AppContext) -> Result<(), AppError> {
    ctx.store.sign_out().await?;
    info!("signed out");
    Ok(())
}

/// URL to open in a browser to continue with Google.
pub fn google(ctx: &AppContext) -> Result<String, AppError> {
    Ok(ctx
        .store
        .sign_in_with_oauth(OAuthProvider::Google, &ctx.options.redirect_url)?)
}

pub fn whoami(ctx: &AppContext) -> Result<AuthSnapshot, AppError> {
    let snapshot = ctx.store.snapshot();
    if snapshot.user.is_none() {
        return Err(AuthError::NotSignedIn.into());
    }
    Ok(snapshot)
}

/// Changes the signed-in user's own name or avatar and returns the
/// refreshed state.
pub async fn update_profile(ctx: &AppContext, update: &ProfileUpdate) -> Result<AuthSnapshot, AppError> {
    ctx.store.update_profile(update).await?;
    Ok(ctx.store.snapshot())
}

/// What the gate decides for `path` right now.
pub fn gate(ctx: &AppContext, path: &str) -> Result<GateDecision, AppError> {
    routes::check(&ctx.store.snapshot(), path).ok_or_else(|| AppError::NotFound(path.to_string()))
}
