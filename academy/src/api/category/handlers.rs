//! Handler functions for course categories.

use academy_adapters::AdapterError;
use serde::Serialize;
use tracing::{error, info};

use crate::context::AppContext;
use crate::database::models::Category;
use crate::database::queries;
use crate::errors::AppError;

const ADMIN_PATH: &str = "/admin";

/// Editable category fields. An empty slug is derived from `name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryForm {
    pub name: String,
    pub name_ar: String,
    pub slug: String,
    pub icon: String,
    pub description: String,
}

/// Lowercases `text` and collapses every run of characters outside
/// `[a-z0-9]` into one dash, without leading or trailing dashes.
pub fn generate_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Categories ordered by Arabic name.
pub async fn list_categories(ctx: &AppContext) -> Result<Vec<Category>, AppError> {
    Ok(queries::list_categories(ctx.db.as_ref()).await?)
}

/// Creates a category, or updates `id` when given. Returns the
/// confirmation message.
pub async fn save_category(ctx: &AppContext, id: Option<&str>, form: CategoryForm) -> Result<&'static str, AppError> {
    ctx.authorize(ADMIN_PATH)?;
    if form.name.trim().is_empty() || form.name_ar.trim().is_empty() {
        return Err(AppError::Validation("يرجى ملء جميع الحقول المطلوبة".to_string()));
    }

    let slug = if form.slug.trim().is_empty() {
        generate_slug(&form.name)
    } else {
        form.slug.trim().to_string()
    };
    let fields = serde_json::to_value(CategoryForm { slug, ..form }).map_err(AdapterError::from)?;

    let saved = match id {
        Some(id) => queries::update_category(ctx.db.as_ref(), id, fields).await,
        None => queries::insert_category(ctx.db.as_ref(), fields).await,
    };
    saved.map_err(|e| {
        error!(error = %e, "error saving category");
        AppError::from(e)
    })?;

    info!(updated = id.is_some(), "category saved");
    Ok(if id.is_some() {
        "تم تحديث الفئة بنجاح"
    } else {
        "تم إضافة الفئة بنجاح"
    })
}

pub async fn delete_category(ctx: &AppContext, id: &str) -> Result<(), AppError> {
    ctx.authorize(ADMIN_PATH)?;
    queries::delete_category(ctx.db.as_ref(), id).await?;
    info!(category_id = id, "category deleted");
    Ok(())
}
