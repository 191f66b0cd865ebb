//! Course progress and lesson navigation.
//!
//! Progress is the share of a course's lessons found in the learner's set
//! of completed lessons, rounded to a whole percent.

use std::collections::BTreeSet;

use crate::database::models::Lesson;

/// Lessons a learner has finished in one course.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedLessons {
    ids: BTreeSet<String>,
}

impl CompletedLessons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set of the lesson ids stored on an access row.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Ids in a stable order, for storing.
    pub fn to_ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }

    /// Marks a lesson done. Returns false if it already was.
    pub fn complete(&mut self, lesson_id: &str) -> bool {
        self.ids.insert(lesson_id.to_string())
    }

    pub fn contains(&self, lesson_id: &str) -> bool {
        self.ids.contains(lesson_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Percent of `lessons` in the set. Ids not belonging to the course
    /// don't count; a course without lessons is at 0.
    pub fn percent_of(&self, lessons: &[Lesson]) -> u8 {
        if lessons.is_empty() {
            return 0;
        }
        let done = lessons.iter().filter(|l| self.ids.contains(&l.id)).count();
        ((done * 100 + lessons.len() / 2) / lessons.len()) as u8
    }
}

/// Position of `lesson_id` in teaching order.
pub fn position(lessons: &[Lesson], lesson_id: &str) -> Option<usize> {
    lessons.iter().position(|l| l.id == lesson_id)
}

pub fn next_lesson<'a>(lessons: &'a [Lesson], current: &str) -> Option<&'a Lesson> {
    position(lessons, current).and_then(|i| lessons.get(i + 1))
}

pub fn previous_lesson<'a>(lessons: &'a [Lesson], current: &str) -> Option<&'a Lesson> {
    position(lessons, current)
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| lessons.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lessons(n: usize) -> Vec<Lesson> {
        (1..=n)
            .map(|i| Lesson {
                id: format!("l{i}"),
                course_id: Some("c1".into()),
                title: format!("Lesson {i}"),
                description: None,
                video_url: None,
                duration: None,
                order_index: i as i32,
                is_free: false,
                content: None,
            })
            .collect()
    }

    #[test]
    fn progress_counts_completed_set() {
        let lessons = lessons(4);
        let mut done = CompletedLessons::new();
        assert_eq!(done.percent_of(&lessons), 0);

        done.complete("l1");
        done.complete("l3");
        assert_eq!(done.percent_of(&lessons), 50);

        assert!(!done.complete("l3"));
        assert_eq!(done.percent_of(&lessons), 50);
    }

    #[test]
    fn progress_rounds_and_ignores_foreign_ids() {
        let lessons = lessons(3);
        let mut done = CompletedLessons::new();
        done.complete("l1");
        done.complete("other-course-lesson");
        assert_eq!(done.percent_of(&lessons), 33);
        done.complete("l2");
        assert_eq!(done.percent_of(&lessons), 67);
        done.complete("l3");
        assert_eq!(done.percent_of(&lessons), 100);
    }

    #[test]
    fn empty_course_is_zero() {
        let mut done = CompletedLessons::new();
        done.complete("l1");
        assert_eq!(done.percent_of(&[]), 0);
    }

    #[test]
    fn stored_ids_keep_out_of_order_lessons() {
        let lessons = lessons(4);
        let done = CompletedLessons::from_ids(["l4", "l2", "l4"]);
        assert!(done.contains("l4") && done.contains("l2"));
        assert!(!done.contains("l1"));
        assert_eq!(done.len(), 2);
        assert_eq!(done.percent_of(&lessons), 50);
        assert_eq!(done.to_ids(), vec!["l2".to_string(), "l4".to_string()]);
    }

    #[test]
    fn navigation_stops_at_ends() {
        let lessons = lessons(3);
        assert_eq!(next_lesson(&lessons, "l1").map(|l| l.id.as_str()), Some("l2"));
        assert!(next_lesson(&lessons, "l3").is_none());
        assert_eq!(previous_lesson(&lessons, "l2").map(|l| l.id.as_str()), Some("l1"));
        assert!(previous_lesson(&lessons, "l1").is_none());
        assert!(next_lesson(&lessons, "missing").is_none());
    }
}
