// src/models/progress.rs

use serde::Serialize;
use sqlx::prelude::FromRow;

/// Joined per-lesson completion check for one learner.
/// `is_done` for a quiz-backed lesson is set by the attempt engine only
/// after a passing submission; plain lessons are flagged elsewhere.
/// `quiz_ok` is true when the lesson has no linked quiz, or when the
/// learner has at least one passing attempt on it.
#[derive(Debug, FromRow)]
pub struct LessonPassRow {
    pub id: i64,
    pub is_done: bool,
    pub quiz_ok: bool,
}

/// DTO returned by ModuleProgress.
#[derive(Debug, Serialize)]
pub struct ModuleProgressResponse {
    pub module_id: i64,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub percentage: f64,
}

/// DTO returned by CourseProgress.
#[derive(Debug, Serialize)]
pub struct CourseProgressResponse {
    pub course_id: i64,
    pub total_modules: i64,
    pub completed_modules: i64,
    pub percentage: f64,
}
