//! Bulk account creation from a spreadsheet.
//!
//! [`ImportPipeline`] walks `Idle -> FileSelected -> Parsed -> Submitting ->
//! Completed`. The whole record set goes to the `create-users` function in
//! one request; per-record outcomes come back in the response and are
//! surfaced as-is.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use academy_adapters::{AdapterError, AuthAdapter, FunctionsAdapter};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::services::spreadsheet::{self, ImportRecord};

pub const CREATE_USERS_FUNCTION: &str = "create-users";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("No records to import")]
    NoRecords,

    #[error("No active session")]
    NotSignedIn,

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("Cannot {action} while {state}")]
    InvalidTransition { state: &'static str, action: &'static str },

    #[error("Import request failed: {0}")]
    Transport(#[from] AdapterError),

    #[error("Unexpected import response: {0}")]
    MalformedResponse(String),
}

impl ImportError {
    pub fn user_message(&self) -> String {
        match self {
            ImportError::NoRecords => "لا يوجد مستخدمين للاستيراد".to_string(),
            ImportError::NotSignedIn => "يجب تسجيل الدخول".to_string(),
            ImportError::UnsupportedFile(_) | ImportError::Spreadsheet(_) => {
                "فشل قراءة ملف Excel".to_string()
            }
            ImportError::InvalidTransition { .. } => self.to_string(),
            ImportError::Transport(_) | ImportError::MalformedResponse(_) => {
                "حدث خطأ أثناء الاستيراد".to_string()
            }
        }
    }
}

/// A record the endpoint refused, with its reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportFailure {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub error: String,
}

/// Outcome of one batch. Created accounts are echoed back by the endpoint;
/// fields it leaves out stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    #[serde(default)]
    pub success: Vec<ImportRecord>,
    #[serde(default)]
    pub errors: Vec<ImportFailure>,
}

impl ImportResult {
    /// Lines shown after a batch: created count, then failed count, each
    /// only when non-zero.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.success.is_empty() {
            lines.push(format!("تم إنشاء {} مستخدم بنجاح", self.success.len()));
        }
        if !self.errors.is_empty() {
            lines.push(format!("فشل إنشاء {} مستخدم", self.errors.len()));
        }
        lines
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportState {
    Idle,
    FileSelected { path: PathBuf },
    Parsed { path: PathBuf, records: Vec<ImportRecord> },
    Submitting { count: usize },
    Completed(ImportResult),
}

impl ImportState {
    pub fn name(&self) -> &'static str {
        match self {
            ImportState::Idle => "idle",
            ImportState::FileSelected { .. } => "file selected",
            ImportState::Parsed { .. } => "parsed",
            ImportState::Submitting { .. } => "submitting",
            ImportState::Completed(_) => "completed",
        }
    }
}

/// Sends one batch to the creation endpoint and decodes its answer.
pub async fn submit_batch(
    functions: &dyn FunctionsAdapter,
    access_token: &str,
    records: &[ImportRecord],
) -> Result<ImportResult, ImportError> {
    let body = json!({ "users": records });
    let value = functions
        .invoke(CREATE_USERS_FUNCTION, access_token, body)
        .await?;
    match value {
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| ImportError::MalformedResponse(e.to_string())),
        other => Err(ImportError::MalformedResponse(format!("expected an object, got {other}"))),
    }
}

pub struct ImportPipeline {
    auth: Arc<dyn AuthAdapter>,
    functions: Arc<dyn FunctionsAdapter>,
    state: ImportState,
}

impl ImportPipeline {
    pub fn new(auth: Arc<dyn AuthAdapter>, functions: Arc<dyn FunctionsAdapter>) -> Self {
        Self {
            auth,
            functions,
            state: ImportState::Idle,
        }
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    /// Parsed records awaiting submission, if any.
    pub fn records(&self) -> &[ImportRecord] {
        match &self.state {
            ImportState::Parsed { records, .. } => records,
            _ => &[],
        }
    }

    fn reject(&self, action: &'static str) -> ImportError {
        ImportError::InvalidTransition {
            state: self.state.name(),
            action,
        }
    }

    pub fn select_file(&mut self, path: impl AsRef<Path>) -> Result<(), ImportError> {
        if !matches!(self.state, ImportState::Idle) {
            return Err(self.reject("select a file"));
        }
        self.state = ImportState::FileSelected {
            path: path.as_ref().to_path_buf(),
        };
        Ok(())
    }

    /// Reads the selected file. On failure the file stays selected.
    pub fn parse(&mut self) -> Result<usize, ImportError> {
        let path = match &self.state {
            ImportState::FileSelected { path } => path.clone(),
            _ => return Err(self.reject("parse")),
        };
        let records = spreadsheet::parse_file(&path).map_err(|e| {
            error!(path = %path.display(), error = %e, "error parsing import file");
            e
        })?;
        let count = records.len();
        self.state = ImportState::Parsed { path, records };
        Ok(count)
    }

    /// Submits the parsed batch. Any failure before a decoded response
    /// leaves the pipeline in `Parsed` so the batch can be retried by hand.
    pub async fn submit(&mut self) -> Result<ImportResult, ImportError> {
        let records = match &self.state {
            ImportState::Parsed { records, .. } => records.clone(),
            _ => return Err(self.reject("submit")),
        };
        if records.is_empty() {
            return Err(ImportError::NoRecords);
        }

        let session = self
            .auth
            .get_session()
            .await?
            .ok_or(ImportError::NotSignedIn)?;

        let count = records.len();
        let previous = std::mem::replace(&mut self.state, ImportState::Submitting { count });
        info!(count, "submitting import batch");

        match submit_batch(self.functions.as_ref(), &session.access_token, &records).await {
            Ok(result) => {
                info!(
                    succeeded = result.success.len(),
                    failed = result.errors.len(),
                    "import batch finished"
                );
                for failure in &result.errors {
                    warn!(email = %failure.email, reason = %failure.error, "record rejected");
                }
                self.state = ImportState::Completed(result.clone());
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "import error");
                self.state = previous;
                Err(e)
            }
        }
    }

    /// Returns to `Idle` from any state.
    pub fn close(&mut self) {
        self.state = ImportState::Idle;
    }

    pub fn cancel(&mut self) {
        self.close();
    }
}
