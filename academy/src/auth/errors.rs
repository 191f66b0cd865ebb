//! Custom error types specific to authentication failures.
//!
//! Auth errors are never retried automatically; each maps to a localized
//! message for the person at the console.

use academy_adapters::AdapterError;
use thiserror::Error;

/// Provider message for a wrong email/password pair.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid login credentials";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("No user is signed in")]
    NotSignedIn,

    /// Input rejected before contacting the provider. Carries the localized
    /// message.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Auth provider error: {0}")]
    Provider(#[from] AdapterError),
}

impl AuthError {
    /// Maps a provider failure from a credential check.
    pub fn from_sign_in(err: AdapterError) -> Self {
        match &err {
            AdapterError::Auth { message, .. } if message == INVALID_CREDENTIALS_MESSAGE => {
                AuthError::InvalidCredentials
            }
            _ => AuthError::Provider(err),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "البريد الإلكتروني أو كلمة المرور غير صحيحة".to_string(),
            AuthError::NotSignedIn => "يجب تسجيل الدخول".to_string(),
            AuthError::Validation(message) => message.clone(),
            AuthError::Provider(AdapterError::Auth { message, .. }) => message.clone(),
            AuthError::Provider(err) if err.is_transient() => {
                "تعذر الاتصال بالخادم، حاول مرة أخرى".to_string()
            }
            AuthError::Provider(err) => err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_credentials_get_localized_message() {
        let err = AuthError::from_sign_in(AdapterError::Auth {
            status: 400,
            message: INVALID_CREDENTIALS_MESSAGE.to_string(),
        });
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.user_message(), "البريد الإلكتروني أو كلمة المرور غير صحيحة");
    }

    #[test]
    fn other_provider_messages_pass_through() {
        let err = AuthError::from_sign_in(AdapterError::Auth {
            status: 400,
            message: "Email not confirmed".to_string(),
        });
        assert_eq!(err.user_message(), "Email not confirmed");
    }
}
