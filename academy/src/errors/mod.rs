//! Global application error types.
//!
//! Every layer has its own `thiserror` enum; [`AppError`] gathers them for
//! the console handlers, classifies them with [`ErrorKind`] and renders the
//! localized message shown to the user.

use academy_adapters::AdapterError;
use thiserror::Error;

use crate::auth::errors::AuthError;
use crate::auth::middleware::DenyReason;
use crate::config::ConfigError;
use crate::services::ImportError;

/// Postgres unique-violation code.
pub const UNIQUE_VIOLATION: &str = "23505";

pub const DUPLICATE_MESSAGE: &str = "هذا الاسم أو المعرف موجود مسبقاً";
pub const GENERIC_MESSAGE: &str = "حدث خطأ غير متوقع";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or timeout. Safe to try again.
    Transient,
    /// Bad credentials, no session or insufficient rights.
    Authentication,
    /// Rejected by a store constraint such as a unique key.
    Constraint,
    /// Input rejected before anything was sent.
    Validation,
    NotFound,
    /// Missing or malformed configuration. Fatal at startup.
    Configuration,
    Other,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Data request failed: {0}")]
    Data(#[from] AdapterError),

    #[error("Access denied: {0}")]
    Forbidden(DenyReason),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Carries the localized message.
    #[error("Invalid input: {0}")]
    Validation(String),
}

fn adapter_kind(err: &AdapterError) -> ErrorKind {
    if err.is_transient() {
        ErrorKind::Transient
    } else if err.is_auth() {
        ErrorKind::Authentication
    } else if err.code() == Some(UNIQUE_VIOLATION) {
        ErrorKind::Constraint
    } else if matches!(err, AdapterError::InvalidConfig(_)) {
        ErrorKind::Configuration
    } else {
        ErrorKind::Other
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) => ErrorKind::Configuration,
            AppError::Auth(AuthError::Provider(err)) => match adapter_kind(err) {
                ErrorKind::Other => ErrorKind::Authentication,
                kind => kind,
            },
            AppError::Auth(AuthError::Validation(_)) => ErrorKind::Validation,
            AppError::Auth(_) => ErrorKind::Authentication,
            AppError::Import(ImportError::NotSignedIn) => ErrorKind::Authentication,
            AppError::Import(ImportError::Transport(err)) => adapter_kind(err),
            AppError::Import(ImportError::NoRecords) => ErrorKind::Validation,
            AppError::Import(_) => ErrorKind::Other,
            AppError::Data(err) => adapter_kind(err),
            AppError::Forbidden(_) => ErrorKind::Authentication,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Validation(_) => ErrorKind::Validation,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(err) => err.to_string(),
            AppError::Auth(err) => err.user_message(),
            AppError::Import(err) => err.user_message(),
            AppError::Data(err) => match adapter_kind(err) {
                ErrorKind::Constraint => DUPLICATE_MESSAGE.to_string(),
                ErrorKind::Transient => "تعذر الاتصال بالخادم، حاول مرة أخرى".to_string(),
                ErrorKind::Authentication => "يجب تسجيل الدخول".to_string(),
                _ => GENERIC_MESSAGE.to_string(),
            },
            AppError::Forbidden(reason) => reason.user_message().to_string(),
            AppError::NotFound(message) | AppError::Validation(message) => message.clone(),
        }
    }
}
