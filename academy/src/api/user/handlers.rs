//! Handler functions for user administration.
//!
//! Listing, filtering, status changes and account creation, single or from
//! a spreadsheet. Every handler requires the admin screen to be accessible.

use std::path::Path;

use serde::Serialize;
use tracing::{error, info};

use crate::context::AppContext;
use crate::database::models::{Profile, ProfileStatus};
use crate::database::queries;
use crate::errors::AppError;
use crate::services::bulk_import::submit_batch;
use crate::services::{ImportPipeline, ImportRecord, ImportResult};

const ADMIN_PATH: &str = "/admin";

/// Search text plus an optional status. `None` means all statuses.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub search: Option<String>,
    pub status: Option<ProfileStatus>,
}

/// Case-insensitive match on email or full name, then status.
pub fn filter_users<'a>(users: &'a [Profile], filter: &UserFilter) -> Vec<&'a Profile> {
    let needle = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    users
        .iter()
        .filter(|u| match &needle {
            Some(needle) => [u.email.as_deref(), u.full_name.as_deref()]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(needle)),
            None => true,
        })
        .filter(|u| filter.status.map_or(true, |status| u.status == status))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl UserStats {
    pub fn from_users(users: &[Profile]) -> Self {
        users.iter().fold(
            Self {
                total: users.len(),
                ..Self::default()
            },
            |mut stats, user| {
                match user.status {
                    ProfileStatus::Pending => stats.pending += 1,
                    ProfileStatus::Approved => stats.approved += 1,
                    ProfileStatus::Rejected => stats.rejected += 1,
                }
                stats
            },
        )
    }
}

pub async fn list_users(ctx: &AppContext) -> Result<Vec<Profile>, AppError> {
    ctx.authorize(ADMIN_PATH)?;
    queries::list_profiles(ctx.db.as_ref()).await.map_err(|e| {
        error!(error = %e, "error fetching users");
        AppError::from(e)
    })
}

/// Changes a user's status and returns the confirmation message.
pub async fn change_status(ctx: &AppContext, user_id: &str, status: ProfileStatus) -> Result<&'static str, AppError> {
    ctx.authorize(ADMIN_PATH)?;
    queries::update_profile_status(ctx.db.as_ref(), user_id, status).await?;
    info!(user_id, status = %status, "user status updated");
    Ok(match status {
        ProfileStatus::Approved => "تم قبول المستخدم",
        ProfileStatus::Rejected => "تم رفض المستخدم",
        ProfileStatus::Pending => "تم تحديث حالة المستخدم",
    })
}

/// Creates one account through the batch endpoint. A per-record rejection
/// comes back as a validation error carrying the endpoint's reason.
pub async fn create_user(ctx: &AppContext, record: ImportRecord) -> Result<ImportResult, AppError> {
    ctx.authorize(ADMIN_PATH)?;
    if !record.has_required_fields() {
        return Err(AppError::Validation("يرجى ملء جميع الحقول المطلوبة".to_string()));
    }

    let token = ctx.access_token().await?;
    let result = submit_batch(ctx.functions.as_ref(), &token, std::slice::from_ref(&record)).await?;
    if let Some(failure) = result.errors.first() {
        let reason = if failure.error.is_empty() {
            "فشل إنشاء المستخدم".to_string()
        } else {
            failure.error.clone()
        };
        return Err(AppError::Validation(reason));
    }
    info!(email = %record.email, "user created");
    Ok(result)
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub result: ImportResult,
    /// Fresh user list, present only when at least one record succeeded.
    pub users: Option<Vec<Profile>>,
}

/// Parses `path` and submits every row as one batch. The user list is
/// re-read only after the batch has resolved.
pub async fn import_users(ctx: &AppContext, path: &Path) -> Result<ImportOutcome, AppError> {
    ctx.authorize(ADMIN_PATH)?;

    let mut pipeline = ImportPipeline::new(ctx.auth.clone(), ctx.functions.clone());
    pipeline.select_file(path)?;
    let parsed = pipeline.parse()?;
    info!(parsed, path = %path.display(), "import file loaded");

    let result = pipeline.submit().await?;
    pipeline.close();

    let users = if result.success.is_empty() {
        None
    } else {
        Some(list_users(ctx).await?)
    };
    Ok(ImportOutcome { result, users })
}
