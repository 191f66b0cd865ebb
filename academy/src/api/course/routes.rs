//! Console commands for courses.

use clap::Subcommand;

use super::handlers;
use crate::context::AppContext;
use crate::errors::AppError;

#[derive(Debug, Subcommand)]
pub enum CourseCommand {
    /// Published courses
    Catalog,
    /// Open a course and list its lessons
    Open { course_id: String },
    /// Show one lesson, the first when none is given
    Lesson {
        course_id: String,
        #[arg(long)]
        lesson_id: Option<String>,
    },
    /// Mark a lesson as completed
    Complete { course_id: String, lesson_id: String },
    /// Every course, published or not
    AdminList,
    /// Publish or hide a course
    Publish {
        course_id: String,
        /// Hide the course instead
        #[arg(long)]
        hide: bool,
    },
    Delete { course_id: String },
}

pub async fn dispatch(ctx: &AppContext, command: CourseCommand) -> Result<(), AppError> {
    match command {
        CourseCommand::Catalog => {
            for entry in handlers::catalog(ctx).await? {
                let course = &entry.course;
                println!(
                    "{}  {}  [{}]  {} درس  {}",
                    course.id,
                    course.title,
                    course.categories.as_ref().map_or("-", |c| c.name_ar.as_str()),
                    entry.lessons_count,
                    course.instructor_name.as_deref().unwrap_or("-"),
                );
            }
        }
        CourseCommand::Open { course_id } => {
            let view = handlers::open_course(ctx, &course_id).await?;
            println!("{}", view.course.title);
            if let Some(description) = &view.course.description {
                println!("{description}");
            }
            let completed = view.completed();
            let done = view.lessons.iter().filter(|l| completed.contains(&l.id)).count();
            println!(
                "التقدم: {}%  ({} من {} دروس مكتملة)",
                view.progress(),
                done,
                view.lessons.len()
            );
            if let Some(first) = view.first_lesson() {
                println!("ابدأ من: {}", first.title);
            }
            for (i, lesson) in view.lessons.iter().enumerate() {
                let marker = if completed.contains(&lesson.id) { "✓" } else { " " };
                println!(
                    "{marker} {}. {}  {}",
                    i + 1,
                    lesson.title,
                    lesson.duration.as_deref().unwrap_or("")
                );
            }
        }
        CourseCommand::Lesson { course_id, lesson_id } => {
            let view = handlers::view_lesson(ctx, &course_id, lesson_id.as_deref()).await?;
            let marker = if view.completed { "✓" } else { " " };
            println!("{marker} {}", view.lesson.title);
            if let Some(text) = view.lesson.content.as_ref().or(view.lesson.description.as_ref()) {
                println!("{text}");
            }
            if let Some(url) = &view.lesson.video_url {
                println!("{url}");
            }
            if let Some(previous) = &view.previous {
                println!("السابق: {} ({})", previous.title, previous.id);
            }
            if let Some(next) = &view.next {
                println!("التالي: {} ({})", next.title, next.id);
            }
        }
        CourseCommand::Complete { course_id, lesson_id } => {
            let completion = handlers::complete_lesson(ctx, &course_id, &lesson_id).await?;
            println!("التقدم: {}%", completion.progress);
            if let Some(next) = completion.next {
                println!("التالي: {} ({})", next.title, next.id);
            }
        }
        CourseCommand::AdminList => {
            for course in handlers::admin_courses(ctx).await? {
                let state = if course.is_published.unwrap_or(false) { "منشورة" } else { "مسودة" };
                println!("{}  {}  ({state})", course.id, course.title);
            }
        }
        CourseCommand::Publish { course_id, hide } => {
            println!("{}", handlers::set_published(ctx, &course_id, !hide).await?);
        }
        CourseCommand::Delete { course_id } => {
            handlers::delete_course(ctx, &course_id).await?;
            println!("تم حذف الدورة بنجاح");
        }
    }
    Ok(())
}
