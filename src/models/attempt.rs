// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::models::quiz::QuestionKind;

/// Lifecycle state of an attempt. Transitions in_progress ->
/// {completed | timed_out} exactly once, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    TimedOut,
}

/// Represents the 'attempts' table in the database.
/// Created by StartAttempt, closed exactly once by SubmitAttempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,

    /// 1-based, dense per (quiz, user).
    pub attempt_number: i64,

    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,

    /// Holds the deadline while in progress (NULL when untimed),
    /// the close timestamp once the attempt is closed.
    pub end_time: Option<DateTime<Utc>>,

    pub score: i64,

    /// Sum of active question points, frozen at start time.
    pub max_score: i64,

    pub percentage: f64,
    pub is_passed: bool,
}

/// Represents the 'user_answers' table: one row per selected option,
/// or a single free-text row for an essay question.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub answer_id: Option<i64>,
    pub free_text: Option<String>,
}

/// DTO returned by StartAttempt.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    pub attempt_id: i64,
    pub attempt_number: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub time_limit_minutes: i64,
}

/// One submitted item, keyed by question id.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmittedAnswer {
    pub question_id: i64,

    /// Selected option ids for choice questions; de-duplicated on scoring.
    #[serde(default)]
    pub selected_answer_ids: Vec<i64>,

    /// Free text for essay questions; stored for human review, never
    /// auto-scored.
    #[validate(length(max = 10000, message = "Essay text too long."))]
    pub essay_text: Option<String>,
}

/// DTO for submitting an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(nested)]
    pub answers: Vec<SubmittedAnswer>,
}

/// Per-question breakdown in an attempt result. Correct-answer ids are
/// revealed here since the attempt is closed by the time this is built.
#[derive(Debug, Serialize)]
pub struct QuestionResult {
    pub question_id: i64,
    pub content: String,
    pub kind: QuestionKind,
    pub points: i64,
    pub awarded_points: i64,
    pub correct_answer_ids: Vec<i64>,
    pub selected_answer_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub essay_text: Option<String>,
}

/// DTO returned by SubmitAttempt and GetAttemptResult.
#[derive(Debug, Serialize)]
pub struct AttemptResult {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub attempt_number: i64,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: i64,
    pub max_score: i64,
    pub percentage: f64,
    pub is_passed: bool,
    pub questions: Vec<QuestionResult>,
}

/// One row of the attempt history listing.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptSummary {
    pub id: i64,
    pub attempt_number: i64,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: i64,
    pub max_score: i64,
    pub percentage: f64,
    pub is_passed: bool,
}

/// Query parameters for GetAttemptHistory.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Paged attempt history, most recent start first.
#[derive(Debug, Serialize)]
pub struct AttemptHistoryResponse {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub attempts: Vec<AttemptSummary>,
}
