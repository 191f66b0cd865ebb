//! Data structures for authentication-related entities.
//!
//! This module defines the snapshot the session store publishes, partial
//! profile updates, and the sign-up form with its client-side checks.

use academy_adapters::{Session, User};
use serde::Serialize;

use crate::auth::errors::AuthError;
use crate::database::models::{Profile, ProfileStatus, Role};

pub const MIN_PASSWORD_LEN: usize = 6;

/// What the session store currently knows.
///
/// `profile` is only ever `Some` while `user` is `Some`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    /// True until the initial session lookup has finished.
    pub loading: bool,
    /// A profile lookup for the current user has not resolved yet.
    pub profile_pending: bool,
}

impl AuthSnapshot {
    /// State before the provider has been asked for a session.
    pub fn initial() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::is_admin)
    }

    /// Nothing is left to resolve for the current identity.
    pub fn is_settled(&self) -> bool {
        !self.loading && !self.profile_pending
    }
}

/// Columns a profile owner or an admin may change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProfileStatus>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.email.trim().is_empty() || self.full_name.trim().is_empty() {
            return Err(AuthError::Validation("يرجى ملء جميع الحقول المطلوبة".to_string()));
        }
        if self.password != self.confirm_password {
            return Err(AuthError::Validation("كلمات المرور غير متطابقة".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(
                "كلمة المرور يجب أن تكون 6 أحرف على الأقل".to_string(),
            ));
        }
        Ok(())
    }
}
