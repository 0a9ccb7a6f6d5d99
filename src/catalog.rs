// src/catalog.rs

use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::quiz::{Answer, Question, Quiz},
};

/// A question together with its active answer options, in stable order
/// (order_index, then id as the tie-break).
#[derive(Debug, Clone)]
pub struct QuestionWithAnswers {
    pub question: Question,
    pub answers: Vec<Answer>,
}

/// Immutable-for-the-attempt view of a quiz: policy fields plus the active
/// questions and their answers. Authored elsewhere; this engine only reads.
#[derive(Debug, Clone)]
pub struct QuizDefinition {
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithAnswers>,
}

impl QuizDefinition {
    /// Sum of active question points. Snapshotted onto an attempt at start.
    pub fn max_score(&self) -> i64 {
        self.questions.iter().map(|q| q.question.points).sum()
    }

    pub fn question(&self, question_id: i64) -> Option<&QuestionWithAnswers> {
        self.questions
            .iter()
            .find(|q| q.question.id == question_id)
    }
}

/// Loads a quiz regardless of its active flag, with active questions and
/// answers. Used when closing an attempt, which must succeed even if the
/// quiz was deactivated mid-attempt.
pub async fn load_quiz(pool: &SqlitePool, quiz_id: i64) -> Result<QuizDefinition, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        "SELECT id, title, time_limit_minutes, max_attempts, passing_score_percent, is_active
         FROM quizzes WHERE id = ?",
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch quiz {}: {:?}", quiz_id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, content, kind, points, order_index, is_active
         FROM questions
         WHERE quiz_id = ? AND is_active = 1
         ORDER BY order_index, id",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let answers = sqlx::query_as::<_, Answer>(
        "SELECT a.id, a.question_id, a.content, a.is_correct, a.order_index, a.is_active
         FROM answers a
         JOIN questions q ON q.id = a.question_id
         WHERE q.quiz_id = ? AND q.is_active = 1 AND a.is_active = 1
         ORDER BY a.order_index, a.id",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let questions = questions
        .into_iter()
        .map(|question| {
            let answers = answers
                .iter()
                .filter(|a| a.question_id == question.id)
                .cloned()
                .collect();
            QuestionWithAnswers { question, answers }
        })
        .collect();

    Ok(QuizDefinition { quiz, questions })
}

/// Loads an active quiz, or NotFound. The precondition for starting and
/// presenting attempts.
pub async fn load_active_quiz(pool: &SqlitePool, quiz_id: i64) -> Result<QuizDefinition, AppError> {
    let def = load_quiz(pool, quiz_id).await?;
    if !def.quiz.is_active {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }
    Ok(def)
}
