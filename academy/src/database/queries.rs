//! Database query functions (Data Access Objects).
//!
//! This module centralizes all operations against the platform's relations,
//! providing typed functions over a [`DataAdapter`] so services and console
//! handlers never build queries by hand.

use academy_adapters::{AdapterError, DataAdapter, Filter, Query};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::auth::models::ProfileUpdate;
use crate::database::models::{Category, Course, CourseAccess, Lesson, Profile, ProfileStatus};
use crate::database::{CATEGORIES, COURSES, GET_USER_PROFILE_RPC, LESSONS, PROFILES, USER_COURSE_ACCESS};

/// Columns the catalog shows, with the category embedded.
const CATALOG_COLUMNS: &str = "id,title,description,thumbnail_url,duration,level,instructor_name,price,category_id,created_at,categories(name_ar,slug)";

const COURSE_DETAIL_COLUMNS: &str = "id,title,description,thumbnail_url,duration,level,instructor_name,price,content,video_url,categories(name_ar,slug)";

fn decode<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, AdapterError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(AdapterError::from))
        .collect()
}

fn first<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Option<T>, AdapterError> {
    Ok(decode(rows)?.into_iter().next())
}

// ---- profiles ----

/// Runs the profile RPC. The procedure answers with a row set.
pub async fn get_user_profile(db: &dyn DataAdapter, user_id: &str) -> Result<Option<Profile>, AdapterError> {
    let value = db
        .rpc(GET_USER_PROFILE_RPC, json!({ "user_id": user_id }))
        .await?;
    match value {
        Value::Array(rows) => first(rows),
        Value::Null => Ok(None),
        other => Err(AdapterError::Decode(format!(
            "{GET_USER_PROFILE_RPC} returned a non-array value: {other}"
        ))),
    }
}

/// Every profile, newest first.
pub async fn list_profiles(db: &dyn DataAdapter) -> Result<Vec<Profile>, AdapterError> {
    let rows = db
        .select(&Query::table(PROFILES).order("created_at", false))
        .await?;
    decode(rows)
}

pub async fn update_profile_status(
    db: &dyn DataAdapter,
    user_id: &str,
    status: ProfileStatus,
) -> Result<(), AdapterError> {
    db.update(PROFILES, &[Filter::eq("id", user_id)], json!({ "status": status }))
        .await?;
    Ok(())
}

/// Applies a partial update and stamps `updated_at`.
pub async fn update_profile(
    db: &dyn DataAdapter,
    user_id: &str,
    update: &ProfileUpdate,
    updated_at: &str,
) -> Result<(), AdapterError> {
    let mut patch = serde_json::to_value(update)?;
    if let Value::Object(map) = &mut patch {
        map.insert("updated_at".to_string(), Value::String(updated_at.to_string()));
    }
    db.update(PROFILES, &[Filter::eq("id", user_id)], patch).await?;
    Ok(())
}

// ---- courses ----

/// Published courses, newest first.
pub async fn list_published_courses(db: &dyn DataAdapter) -> Result<Vec<Course>, AdapterError> {
    let rows = db
        .select(
            &Query::table(COURSES)
                .select(CATALOG_COLUMNS)
                .eq("is_published", true)
                .order("created_at", false),
        )
        .await?;
    decode(rows)
}

pub async fn get_published_course(db: &dyn DataAdapter, course_id: &str) -> Result<Option<Course>, AdapterError> {
    let rows = db
        .select(
            &Query::table(COURSES)
                .select(COURSE_DETAIL_COLUMNS)
                .eq("id", course_id)
                .eq("is_published", true)
                .limit(1),
        )
        .await?;
    first(rows)
}

/// All courses regardless of publication, for moderation.
pub async fn list_all_courses(db: &dyn DataAdapter) -> Result<Vec<Course>, AdapterError> {
    let rows = db
        .select(&Query::table(COURSES).order("created_at", false))
        .await?;
    decode(rows)
}

pub async fn set_course_published(db: &dyn DataAdapter, course_id: &str, published: bool) -> Result<(), AdapterError> {
    db.update(COURSES, &[Filter::eq("id", course_id)], json!({ "is_published": published }))
        .await?;
    Ok(())
}

pub async fn delete_course(db: &dyn DataAdapter, course_id: &str) -> Result<(), AdapterError> {
    db.delete(COURSES, &[Filter::eq("id", course_id)]).await
}

// ---- lessons ----

/// Lessons of a course in teaching order.
pub async fn list_lessons(db: &dyn DataAdapter, course_id: &str) -> Result<Vec<Lesson>, AdapterError> {
    let rows = db
        .select(
            &Query::table(LESSONS)
                .eq("course_id", course_id)
                .order("order_index", true),
        )
        .await?;
    decode(rows)
}

pub async fn count_lessons(db: &dyn DataAdapter, course_id: &str) -> Result<usize, AdapterError> {
    let rows = db
        .select(&Query::table(LESSONS).select("id").eq("course_id", course_id))
        .await?;
    Ok(rows.len())
}

// ---- user_course_access ----

pub async fn get_course_access(
    db: &dyn DataAdapter,
    user_id: &str,
    course_id: &str,
) -> Result<Option<CourseAccess>, AdapterError> {
    let rows = db
        .select(
            &Query::table(USER_COURSE_ACCESS)
                .eq("user_id", user_id)
                .eq("course_id", course_id)
                .limit(1),
        )
        .await?;
    first(rows)
}

pub async fn create_course_access(
    db: &dyn DataAdapter,
    user_id: &str,
    course_id: &str,
) -> Result<CourseAccess, AdapterError> {
    let rows = db
        .insert(
            USER_COURSE_ACCESS,
            json!({ "user_id": user_id, "course_id": course_id, "progress": 0, "completed_lessons": [] }),
        )
        .await?;
    first(rows)?.ok_or_else(|| AdapterError::Decode("insert returned no row".to_string()))
}

/// Stores the completed lesson ids together with the progress derived
/// from them.
pub async fn update_course_progress(
    db: &dyn DataAdapter,
    user_id: &str,
    course_id: &str,
    completed_lessons: &[String],
    progress: u8,
    completed_at: Option<&str>,
) -> Result<(), AdapterError> {
    let mut patch = json!({ "progress": progress, "completed_lessons": completed_lessons });
    if let Some(at) = completed_at {
        patch["completed_at"] = Value::String(at.to_string());
    }
    db.update(
        USER_COURSE_ACCESS,
        &[Filter::eq("user_id", user_id), Filter::eq("course_id", course_id)],
        patch,
    )
    .await?;
    Ok(())
}

// ---- categories ----

pub async fn list_categories(db: &dyn DataAdapter) -> Result<Vec<Category>, AdapterError> {
    let rows = db
        .select(&Query::table(CATEGORIES).order("name_ar", true))
        .await?;
    decode(rows)
}

pub async fn insert_category(db: &dyn DataAdapter, fields: Value) -> Result<(), AdapterError> {
    db.insert(CATEGORIES, fields).await?;
    Ok(())
}

pub async fn update_category(db: &dyn DataAdapter, category_id: &str, fields: Value) -> Result<(), AdapterError> {
    db.update(CATEGORIES, &[Filter::eq("id", category_id)], fields)
        .await?;
    Ok(())
}

pub async fn delete_category(db: &dyn DataAdapter, category_id: &str) -> Result<(), AdapterError> {
    db.delete(CATEGORIES, &[Filter::eq("id", category_id)]).await
}
