//! Handler functions for the course catalog, the course viewer and course
//! moderation.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::auth::errors::AuthError;
use crate::context::AppContext;
use crate::database::models::{Course, CourseAccess, Lesson};
use crate::database::queries;
use crate::errors::AppError;
use crate::services::progress::{self, CompletedLessons};

const ADMIN_PATH: &str = "/admin";

pub const COURSE_NOT_FOUND: &str = "الدورة غير موجودة";

fn course_path(course_id: &str) -> String {
    format!("/course/{course_id}")
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub course: Course,
    pub lessons_count: usize,
}

/// Published courses with their lesson counts. A failed count shows as 0.
pub async fn catalog(ctx: &AppContext) -> Result<Vec<CatalogEntry>, AppError> {
    let courses = queries::list_published_courses(ctx.db.as_ref()).await?;
    let mut entries = Vec::with_capacity(courses.len());
    for course in courses {
        let lessons_count = match queries::count_lessons(ctx.db.as_ref(), &course.id).await {
            Ok(count) => count,
            Err(e) => {
                warn!(course_id = %course.id, error = %e, "error counting lessons");
                0
            }
        };
        entries.push(CatalogEntry { course, lessons_count });
    }
    Ok(entries)
}

#[derive(Debug, Clone)]
pub struct CourseView {
    pub course: Course,
    pub lessons: Vec<Lesson>,
    /// `None` if the access row could neither be read nor created.
    pub access: Option<CourseAccess>,
}

impl CourseView {
    pub fn first_lesson(&self) -> Option<&Lesson> {
        self.lessons.first()
    }

    /// Lessons the learner has finished, as stored on the access row.
    pub fn completed(&self) -> CompletedLessons {
        self.access
            .as_ref()
            .map(|a| CompletedLessons::from_ids(a.completed_lessons.iter().cloned()))
            .unwrap_or_default()
    }

    pub fn progress(&self) -> u8 {
        self.completed().percent_of(&self.lessons)
    }
}

/// Opens a published course for the signed-in, approved learner and makes
/// sure an access row exists for them.
pub async fn open_course(ctx: &AppContext, course_id: &str) -> Result<CourseView, AppError> {
    ctx.authorize(&course_path(course_id))?;
    let user_id = ctx
        .store
        .snapshot()
        .user_id()
        .map(str::to_string)
        .ok_or(AppError::Auth(AuthError::NotSignedIn))?;

    let course = queries::get_published_course(ctx.db.as_ref(), course_id)
        .await?
        .ok_or_else(|| AppError::NotFound(COURSE_NOT_FOUND.to_string()))?;
    let lessons = queries::list_lessons(ctx.db.as_ref(), course_id).await?;

    let existing = match queries::get_course_access(ctx.db.as_ref(), &user_id, course_id).await {
        Ok(access) => access,
        Err(e) => {
            error!(course_id, error = %e, "error fetching access");
            None
        }
    };
    let access = match existing {
        Some(access) => Some(access),
        None => match queries::create_course_access(ctx.db.as_ref(), &user_id, course_id).await {
            Ok(access) => {
                info!(course_id, user_id = %user_id, "course access created");
                Some(access)
            }
            Err(e) => {
                error!(course_id, error = %e, "error creating access");
                None
            }
        },
    };

    Ok(CourseView {
        course,
        lessons,
        access,
    })
}

/// One lesson of an opened course with its neighbours.
#[derive(Debug, Clone)]
pub struct LessonView {
    pub lesson: Lesson,
    pub previous: Option<Lesson>,
    pub next: Option<Lesson>,
    pub completed: bool,
}

impl LessonView {
    fn locate(view: &CourseView, lesson_id: &str) -> Result<Self, AppError> {
        let index = progress::position(&view.lessons, lesson_id)
            .ok_or_else(|| AppError::NotFound(format!("lesson {lesson_id}")))?;
        Ok(Self {
            lesson: view.lessons[index].clone(),
            previous: progress::previous_lesson(&view.lessons, lesson_id).cloned(),
            next: progress::next_lesson(&view.lessons, lesson_id).cloned(),
            completed: view.completed().contains(lesson_id),
        })
    }
}

/// Opens `lesson_id` inside a course, defaulting to the first lesson.
pub async fn view_lesson(ctx: &AppContext, course_id: &str, lesson_id: Option<&str>) -> Result<LessonView, AppError> {
    let view = open_course(ctx, course_id).await?;
    let lesson_id = match lesson_id {
        Some(id) => id.to_string(),
        None => view
            .first_lesson()
            .map(|l| l.id.clone())
            .ok_or_else(|| AppError::NotFound("لا توجد دروس في هذه الدورة".to_string()))?,
    };
    LessonView::locate(&view, &lesson_id)
}

#[derive(Debug, Clone)]
pub struct LessonCompletion {
    pub progress: u8,
    /// Lesson to continue with, if any.
    pub next: Option<Lesson>,
}

/// Adds `lesson_id` to the learner's completed set and stores the set with
/// the progress derived from it. Completing a lesson twice changes nothing.
pub async fn complete_lesson(ctx: &AppContext, course_id: &str, lesson_id: &str) -> Result<LessonCompletion, AppError> {
    let view = open_course(ctx, course_id).await?;
    if progress::position(&view.lessons, lesson_id).is_none() {
        return Err(AppError::NotFound(format!("lesson {lesson_id}")));
    }
    let access = view
        .access
        .as_ref()
        .ok_or_else(|| AppError::NotFound(COURSE_NOT_FOUND.to_string()))?;
    let next = progress::next_lesson(&view.lessons, lesson_id).cloned();

    let mut completed = view.completed();
    if !completed.complete(lesson_id) {
        debug!(course_id, lesson_id, "lesson already completed");
        return Ok(LessonCompletion {
            progress: view.progress(),
            next,
        });
    }
    let percent = completed.percent_of(&view.lessons);

    let finished_at = match &access.completed_at {
        Some(at) => Some(at.clone()),
        None => (percent == 100).then(|| Utc::now().to_rfc3339()),
    };
    queries::update_course_progress(
        ctx.db.as_ref(),
        &access.user_id,
        course_id,
        &completed.to_ids(),
        percent,
        finished_at.as_deref(),
    )
    .await
    .map_err(|e| {
        error!(course_id, error = %e, "error updating progress");
        AppError::from(e)
    })?;
    info!(course_id, lesson_id, progress = percent, "lesson completed");
    Ok(LessonCompletion {
        progress: percent,
        next,
    })
}

pub async fn admin_courses(ctx: &AppContext) -> Result<Vec<Course>, AppError> {
    ctx.authorize(ADMIN_PATH)?;
    Ok(queries::list_all_courses(ctx.db.as_ref()).await?)
}

/// Sets the publication flag and returns the confirmation message.
pub async fn set_published(ctx: &AppContext, course_id: &str, published: bool) -> Result<&'static str, AppError> {
    ctx.authorize(ADMIN_PATH)?;
    queries::set_course_published(ctx.db.as_ref(), course_id, published).await?;
    info!(course_id, published, "course publication changed");
    Ok(if published { "تم نشر الدورة" } else { "تم إخفاء الدورة" })
}

pub async fn delete_course(ctx: &AppContext, course_id: &str) -> Result<(), AppError> {
    ctx.authorize(ADMIN_PATH)?;
    queries::delete_course(ctx.db.as_ref(), course_id).await?;
    info!(course_id, "course deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::auth::middleware::DenyReason;
    use crate::context::ContextOptions;
    use crate::database::models::{ProfileStatus, Role};
    use crate::testing::{profile, session, FakeBackend};

    fn seed_course(backend: &FakeBackend, lessons: usize) {
        backend.put_rows(
            "courses",
            vec![
                json!({ "id": "c1", "title": "Rust", "price": 0, "is_published": true }),
                json!({ "id": "c2", "title": "Draft", "price": 0, "is_published": false }),
            ],
        );
        backend.put_rows(
            "lessons",
            (1..=lessons)
                .map(|i| json!({ "id": format!("l{i}"), "course_id": "c1", "title": format!("Lesson {i}"), "order_index": i }))
                .collect(),
        );
    }

    async fn learner(backend: &Arc<FakeBackend>, status: ProfileStatus) -> AppContext {
        backend.set_session(Some(session("u1")));
        backend.put_profile(profile("u1", Role::User, status));
        let ctx = AppContext::new(backend.clone(), ContextOptions::default());
        ctx.store.initialize().await;
        ctx
    }

    #[tokio::test]
    async fn catalog_lists_published_with_counts() {
        let backend = FakeBackend::new();
        seed_course(&backend, 3);
        let ctx = AppContext::new(backend.clone(), ContextOptions::default());

        let entries = catalog(&ctx).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].course.id, "c1");
        assert_eq!(entries[0].lessons_count, 3);
    }

    #[tokio::test]
    async fn pending_learner_is_sent_back_to_catalog() {
        let backend = FakeBackend::new();
        seed_course(&backend, 2);
        let ctx = learner(&backend, ProfileStatus::Pending).await;

        let err = open_course(&ctx, "c1").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(DenyReason::NotApproved)));
        assert_eq!(err.user_message(), "يجب أن يتم الموافقة على حسابك أولاً");
    }

    #[tokio::test]
    async fn opening_creates_access_once() {
        let backend = FakeBackend::new();
        seed_course(&backend, 2);
        let ctx = learner(&backend, ProfileStatus::Approved).await;

        let view = open_course(&ctx, "c1").await.unwrap();
        assert_eq!(view.lessons.len(), 2);
        assert_eq!(view.first_lesson().map(|l| l.id.as_str()), Some("l1"));
        assert_eq!(view.progress(), 0);

        open_course(&ctx, "c1").await.unwrap();
        assert_eq!(backend.rows("user_course_access").len(), 1);
    }

    #[tokio::test]
    async fn unpublished_course_is_not_found() {
        let backend = FakeBackend::new();
        seed_course(&backend, 1);
        let ctx = learner(&backend, ProfileStatus::Approved).await;

        let err = open_course(&ctx, "c2").await.unwrap_err();
        assert_eq!(err.user_message(), COURSE_NOT_FOUND);
    }

    #[tokio::test]
    async fn completing_lessons_accumulates_progress() {
        let backend = FakeBackend::new();
        seed_course(&backend, 4);
        let ctx = learner(&backend, ProfileStatus::Approved).await;

        let first = complete_lesson(&ctx, "c1", "l1").await.unwrap();
        assert_eq!(first.progress, 25);
        assert_eq!(first.next.map(|l| l.id), Some("l2".to_string()));
        assert_eq!(complete_lesson(&ctx, "c1", "l2").await.unwrap().progress, 50);
        assert_eq!(complete_lesson(&ctx, "c1", "l2").await.unwrap().progress, 50);
        assert!(backend.rows("user_course_access")[0]["completed_at"].is_null());

        complete_lesson(&ctx, "c1", "l3").await.unwrap();
        let last = complete_lesson(&ctx, "c1", "l4").await.unwrap();
        assert_eq!(last.progress, 100);
        assert!(last.next.is_none());
        let row = &backend.rows("user_course_access")[0];
        assert_eq!(row["progress"], 100);
        assert!(row["completed_at"].is_string());
    }

    #[tokio::test]
    async fn repeating_a_lesson_does_not_add_progress() {
        let backend = FakeBackend::new();
        seed_course(&backend, 4);
        let ctx = learner(&backend, ProfileStatus::Approved).await;

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(complete_lesson(&ctx, "c1", "l4").await.unwrap().progress);
        }
        assert_eq!(seen, vec![25, 25, 25, 25]);

        let row = &backend.rows("user_course_access")[0];
        assert_eq!(row["completed_lessons"], json!(["l4"]));
        assert_eq!(row["progress"], 25);
        assert!(row["completed_at"].is_null());
    }

    #[tokio::test]
    async fn out_of_order_completion_marks_the_right_lesson() {
        let backend = FakeBackend::new();
        seed_course(&backend, 4);
        let ctx = learner(&backend, ProfileStatus::Approved).await;

        complete_lesson(&ctx, "c1", "l3").await.unwrap();
        assert!(view_lesson(&ctx, "c1", Some("l3")).await.unwrap().completed);
        assert!(!view_lesson(&ctx, "c1", Some("l1")).await.unwrap().completed);
        assert_eq!(open_course(&ctx, "c1").await.unwrap().progress(), 25);
    }

    #[tokio::test]
    async fn lesson_view_links_neighbours() {
        let backend = FakeBackend::new();
        seed_course(&backend, 3);
        let ctx = learner(&backend, ProfileStatus::Approved).await;

        let first = view_lesson(&ctx, "c1", None).await.unwrap();
        assert_eq!(first.lesson.id, "l1");
        assert!(first.previous.is_none());
        assert!(!first.completed);

        complete_lesson(&ctx, "c1", "l1").await.unwrap();
        let middle = view_lesson(&ctx, "c1", Some("l2")).await.unwrap();
        assert_eq!(middle.previous.map(|l| l.id), Some("l1".to_string()));
        assert_eq!(middle.next.map(|l| l.id), Some("l3".to_string()));
        assert!(view_lesson(&ctx, "c1", Some("l1")).await.unwrap().completed);

        assert!(matches!(view_lesson(&ctx, "c1", Some("l9")).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn moderation_requires_admin() {
        let backend = FakeBackend::new();
        seed_course(&backend, 1);
        let ctx = learner(&backend, ProfileStatus::Approved).await;
        assert!(matches!(
            set_published(&ctx, "c2", true).await,
            Err(AppError::Forbidden(DenyReason::MissingRole(Role::Admin)))
        ));

        backend.put_profile(profile("u1", Role::Admin, ProfileStatus::Approved));
        ctx.store.refresh_profile().await;
        assert_eq!(set_published(&ctx, "c2", true).await.unwrap(), "تم نشر الدورة");
        assert_eq!(admin_courses(&ctx).await.unwrap().len(), 2);
        delete_course(&ctx, "c2").await.unwrap();
        assert_eq!(admin_courses(&ctx).await.unwrap().len(), 1);
    }
}
