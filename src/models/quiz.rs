// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Question type. Stored as TEXT in the database; scoring matches on the
/// variant so every kind is handled exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    Essay,
}

impl QuestionKind {
    /// Whether the question carries a selectable answer list.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionKind::MultipleChoice | QuestionKind::TrueFalse)
    }
}

/// Represents the 'quizzes' table in the database.
/// Owned by the authoring subsystem; immutable from this engine's view.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,

    /// 0 means unlimited.
    pub time_limit_minutes: i64,

    pub max_attempts: i64,
    pub passing_score_percent: i64,
    pub is_active: bool,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub content: String,
    pub kind: QuestionKind,
    pub points: i64,
    pub order_index: i64,
    pub is_active: bool,
}

/// Represents the 'answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
    pub is_correct: bool,
    pub order_index: i64,
    pub is_active: bool,
}

/// DTO for presenting a quiz to a learner mid-attempt.
/// Never carries correctness flags.
#[derive(Debug, Serialize)]
pub struct QuizView {
    pub id: i64,
    pub title: String,
    pub attempt_id: i64,
    pub time_limit_minutes: i64,
    pub questions: Vec<QuestionView>,
}

/// DTO for a single question inside `QuizView`.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: i64,
    pub content: String,
    pub kind: QuestionKind,
    pub points: i64,
    /// Empty for essay questions, which never expose an answer list.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<AnswerView>,
}

/// DTO for a single answer option (id and text only).
#[derive(Debug, Serialize)]
pub struct AnswerView {
    pub id: i64,
    pub content: String,
}

impl AnswerView {
    pub fn from_answer(answer: &Answer) -> Self {
        Self {
            id: answer.id,
            content: answer.content.clone(),
        }
    }
}
