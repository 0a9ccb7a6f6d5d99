// src/history.rs

use chrono::Utc;
use sqlx::SqlitePool;

/// Audit events appended around the attempt lifecycle. The engine only ever
/// writes this log, never reads it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    QuizStarted,
    QuizCompleted,
    QuizPassed,
    QuizFailed,
}

impl HistoryEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryEvent::QuizStarted => "quiz_started",
            HistoryEvent::QuizCompleted => "quiz_completed",
            HistoryEvent::QuizPassed => "quiz_passed",
            HistoryEvent::QuizFailed => "quiz_failed",
        }
    }
}

/// Appends one history entry. Fire-and-forget: a failed write is logged and
/// swallowed so it can never fail the scoring operation that triggered it.
pub async fn record(
    pool: &SqlitePool,
    user_id: i64,
    quiz_id: i64,
    attempt_id: i64,
    event: HistoryEvent,
) {
    let result = sqlx::query(
        "INSERT INTO quiz_history (user_id, quiz_id, attempt_id, event, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(attempt_id)
    .bind(event.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(
            "Failed to append {} history for attempt {}: {:?}",
            event.as_str(),
            attempt_id,
            e
        );
    }
}
