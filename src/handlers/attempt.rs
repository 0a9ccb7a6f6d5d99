// src/handlers/attempt.rs

use std::collections::BTreeMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    catalog::{self, QuizDefinition},
    error::AppError,
    history::{self, HistoryEvent},
    models::{
        attempt::{
            Attempt, AttemptHistoryResponse, AttemptResult, AttemptStatus, AttemptSummary,
            HistoryParams, QuestionResult, StartAttemptResponse, SubmitAttemptRequest,
            SubmittedAnswer, UserAnswer,
        },
        quiz::{AnswerView, QuestionView, QuizView},
    },
    scoring::{self, ScoreOutcome},
    shuffle,
    utils::jwt::Claims,
};

const ATTEMPT_COLUMNS: &str = "id, quiz_id, user_id, attempt_number, status, start_time, \
                               end_time, score, max_score, percentage, is_passed";

/// Fetches an attempt and verifies it belongs to the caller.
async fn fetch_owned_attempt(
    pool: &SqlitePool,
    attempt_id: i64,
    user_id: i64,
) -> Result<Attempt, AppError> {
    let attempt = sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {} FROM attempts WHERE id = ?",
        ATTEMPT_COLUMNS
    ))
    .bind(attempt_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.user_id != user_id {
        return Err(AppError::AuthError(
            "Attempt does not belong to the caller".to_string(),
        ));
    }

    Ok(attempt)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

/// Starts a new attempt on an active quiz.
///
/// * Fails with 404 if the quiz is missing or inactive.
/// * Fails with 403 once the learner has used up `max_attempts`.
/// * max_score is snapshotted from the active questions at this moment and
///   never recomputed afterwards.
/// * A concurrent start for the same (quiz, user) trips the uniqueness
///   constraint on attempt_number; we recompute the count and retry once.
pub async fn start_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();
    let def = catalog::load_active_quiz(&pool, quiz_id).await?;
    let max_score = def.max_score();

    for _ in 0..2 {
        let prior: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE quiz_id = ? AND user_id = ?")
                .bind(quiz_id)
                .bind(user_id)
                .fetch_one(&pool)
                .await?;

        if prior >= def.quiz.max_attempts {
            return Err(AppError::LimitExceeded(format!(
                "Maximum of {} attempts reached for this quiz",
                def.quiz.max_attempts
            )));
        }

        let now = Utc::now();
        // end_time holds the deadline while the attempt is open; NULL when
        // the quiz is untimed.
        let deadline = (def.quiz.time_limit_minutes > 0)
            .then(|| now + Duration::minutes(def.quiz.time_limit_minutes));

        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO attempts
                 (quiz_id, user_id, attempt_number, status, start_time, end_time,
                  score, max_score, percentage, is_passed)
             VALUES (?, ?, ?, 'in_progress', ?, ?, 0, ?, 0, 0)
             RETURNING id",
        )
        .bind(quiz_id)
        .bind(user_id)
        .bind(prior + 1)
        .bind(now)
        .bind(deadline)
        .bind(max_score)
        .fetch_one(&pool)
        .await;

        match inserted {
            Ok(attempt_id) => {
                history::record(&pool, user_id, quiz_id, attempt_id, HistoryEvent::QuizStarted)
                    .await;

                return Ok((
                    StatusCode::CREATED,
                    Json(StartAttemptResponse {
                        attempt_id,
                        attempt_number: prior + 1,
                        start_time: now,
                        end_time: deadline,
                        time_limit_minutes: def.quiz.time_limit_minutes,
                    }),
                ));
            }
            // Another start for the same (quiz, user) won the attempt
            // number; recompute the count and try again.
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Conflict(
        "Concurrent attempt creation, please retry".to_string(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ShuffleParams {
    pub shuffle_questions: Option<bool>,
    pub shuffle_answers: Option<bool>,
}

/// Renders the quiz for one attempt. Read-only.
///
/// Question order is shuffled with seed = attempt id when requested,
/// otherwise it is the stable (order_index, id) order. Answer order within a
/// non-essay question uses seed = attempt id + question id. The view never
/// exposes correctness flags.
pub async fn get_quiz_for_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, attempt_id)): Path<(i64, i64)>,
    Query(params): Query<ShuffleParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();
    let def = catalog::load_active_quiz(&pool, quiz_id).await?;

    let attempt = fetch_owned_attempt(&pool, attempt_id, user_id).await?;
    if attempt.quiz_id != quiz_id {
        return Err(AppError::NotFound(
            "Attempt not found for this quiz".to_string(),
        ));
    }

    let shuffle_questions = params.shuffle_questions.unwrap_or(false);
    let shuffle_answers = params.shuffle_answers.unwrap_or(false);

    let mut questions = def.questions.clone();
    if shuffle_questions {
        questions = shuffle::shuffled(attempt_id as u64, questions);
    }

    let question_views = questions
        .into_iter()
        .map(|q| {
            let answers = if q.question.kind.is_choice() {
                let mut answers = q.answers;
                if shuffle_answers {
                    answers =
                        shuffle::shuffled(shuffle::answer_seed(attempt_id, q.question.id), answers);
                }
                answers.iter().map(AnswerView::from_answer).collect()
            } else {
                // Essay questions never expose an answer list.
                Vec::new()
            };

            QuestionView {
                id: q.question.id,
                content: q.question.content,
                kind: q.question.kind,
                points: q.question.points,
                answers,
            }
        })
        .collect();

    Ok(Json(QuizView {
        id: def.quiz.id,
        title: def.quiz.title,
        attempt_id,
        time_limit_minutes: def.quiz.time_limit_minutes,
        questions: question_views,
    }))
}

/// Closes an attempt: scores the submission, persists the answers, and
/// flips the linked lesson's progress flag on a pass. Atomic end-to-end.
///
/// The status transition is a conditional UPDATE; a concurrent submit that
/// loses the race affects zero rows and fails with 409 instead of
/// re-scoring.
pub async fn submit_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();
    let mut attempt = fetch_owned_attempt(&pool, attempt_id, user_id).await?;

    if attempt.status != AttemptStatus::InProgress {
        return Err(AppError::InvalidState(
            "Attempt already submitted or closed".to_string(),
        ));
    }

    // Closing must succeed even if the quiz was deactivated mid-attempt.
    let def = catalog::load_quiz(&pool, attempt.quiz_id).await?;

    let outcome = scoring::score_submission(&def.questions, &payload.answers);

    let now = Utc::now();
    let timed_out = def.quiz.time_limit_minutes > 0
        && now > attempt.start_time + Duration::minutes(def.quiz.time_limit_minutes);
    let status = if timed_out {
        AttemptStatus::TimedOut
    } else {
        AttemptStatus::Completed
    };

    // max_score was frozen at start time; the live question set may have
    // drifted since, so the score is capped against the snapshot.
    let score = outcome.score.min(attempt.max_score);
    let percentage = scoring::percentage(score, attempt.max_score);
    let is_passed = percentage >= def.quiz.passing_score_percent as f64;

    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE attempts
         SET status = ?, end_time = ?, score = ?, percentage = ?, is_passed = ?
         WHERE id = ? AND status = 'in_progress'",
    )
    .bind(status)
    .bind(now)
    .bind(score)
    .bind(percentage)
    .bind(is_passed)
    .bind(attempt_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        // Lost the race against a concurrent submit.
        return Err(AppError::InvalidState(
            "Attempt already submitted or closed".to_string(),
        ));
    }

    for question_score in &outcome.questions {
        let Some(q) = def.question(question_score.question_id) else {
            continue;
        };

        if q.question.kind.is_choice() {
            // The scorer already restricted these to the question's own
            // answers, so the stored rows are the scored set.
            for answer_id in &question_score.selected_answer_ids {
                sqlx::query(
                    "INSERT INTO user_answers (attempt_id, question_id, answer_id)
                     VALUES (?, ?, ?)",
                )
                .bind(attempt_id)
                .bind(question_score.question_id)
                .bind(*answer_id)
                .execute(&mut *tx)
                .await?;
            }
        } else if let Some(text) = &question_score.essay_text {
            sqlx::query(
                "INSERT INTO user_answers (attempt_id, question_id, free_text)
                 VALUES (?, ?, ?)",
            )
            .bind(attempt_id)
            .bind(question_score.question_id)
            .bind(text.as_str())
            .execute(&mut *tx)
            .await?;
        }
    }

    if is_passed {
        crate::handlers::progress::mark_quiz_lessons_done(&mut tx, attempt.quiz_id, user_id, now)
            .await?;
    }

    tx.commit().await?;

    history::record(
        &pool,
        user_id,
        attempt.quiz_id,
        attempt_id,
        HistoryEvent::QuizCompleted,
    )
    .await;
    let verdict = if is_passed {
        HistoryEvent::QuizPassed
    } else {
        HistoryEvent::QuizFailed
    };
    history::record(&pool, user_id, attempt.quiz_id, attempt_id, verdict).await;

    attempt.status = status;
    attempt.end_time = Some(now);
    attempt.score = score;
    attempt.percentage = percentage;
    attempt.is_passed = is_passed;

    Ok(Json(build_result(&attempt, &def, outcome)))
}

/// Read-only reconstruction of a closed attempt's result from the persisted
/// attempt and user_answers rows.
pub async fn get_attempt_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();
    let attempt = fetch_owned_attempt(&pool, attempt_id, user_id).await?;

    if attempt.status == AttemptStatus::InProgress {
        return Err(AppError::InvalidState(
            "Attempt still in progress".to_string(),
        ));
    }

    let def = catalog::load_quiz(&pool, attempt.quiz_id).await?;

    let rows = sqlx::query_as::<_, UserAnswer>(
        "SELECT id, attempt_id, question_id, answer_id, free_text
         FROM user_answers WHERE attempt_id = ?",
    )
    .bind(attempt_id)
    .fetch_all(&pool)
    .await?;

    // Regroup the stored rows into the submission shape and re-run the
    // scorer for the per-question breakdown; the headline figures come from
    // the attempt row itself.
    let mut by_question: BTreeMap<i64, SubmittedAnswer> = BTreeMap::new();
    for row in rows {
        let entry = by_question
            .entry(row.question_id)
            .or_insert_with(|| SubmittedAnswer {
                question_id: row.question_id,
                selected_answer_ids: Vec::new(),
                essay_text: None,
            });
        if let Some(answer_id) = row.answer_id {
            entry.selected_answer_ids.push(answer_id);
        }
        if entry.essay_text.is_none() {
            entry.essay_text = row.free_text;
        }
    }

    let submitted: Vec<SubmittedAnswer> = by_question.into_values().collect();
    let outcome = scoring::score_submission(&def.questions, &submitted);

    Ok(Json(build_result(&attempt, &def, outcome)))
}

/// Paginated attempt history for the caller on one quiz, most recent start
/// first.
pub async fn get_attempt_history(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let quiz_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .fetch_optional(&pool)
        .await?;
    if quiz_exists.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(10).clamp(1, 50);
    // Saturates so an absurd page number yields an empty page, not an
    // arithmetic overflow.
    let offset = page.saturating_sub(1).saturating_mul(page_size);

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE quiz_id = ? AND user_id = ?")
            .bind(quiz_id)
            .bind(user_id)
            .fetch_one(&pool)
            .await?;

    let attempts = sqlx::query_as::<_, AttemptSummary>(
        "SELECT id, attempt_number, status, start_time, end_time,
                score, max_score, percentage, is_passed
         FROM attempts
         WHERE quiz_id = ? AND user_id = ?
         ORDER BY start_time DESC, id DESC
         LIMIT ? OFFSET ?",
    )
    .bind(quiz_id)
    .bind(user_id)
    .bind(page_size)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch attempt history: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(AttemptHistoryResponse {
        page,
        page_size,
        total,
        attempts,
    }))
}

/// Assembles the result DTO from the attempt row, the quiz definition and a
/// scoring outcome. Correct-answer ids are revealed here.
fn build_result(attempt: &Attempt, def: &QuizDefinition, outcome: ScoreOutcome) -> AttemptResult {
    let questions = outcome
        .questions
        .into_iter()
        .filter_map(|qs| {
            let q = def.question(qs.question_id)?;
            Some(QuestionResult {
                question_id: qs.question_id,
                content: q.question.content.clone(),
                kind: q.question.kind,
                points: q.question.points,
                awarded_points: qs.awarded_points,
                correct_answer_ids: qs.correct_answer_ids,
                selected_answer_ids: qs.selected_answer_ids,
                essay_text: qs.essay_text,
            })
        })
        .collect();

    AttemptResult {
        attempt_id: attempt.id,
        quiz_id: attempt.quiz_id,
        attempt_number: attempt.attempt_number,
        status: attempt.status,
        start_time: attempt.start_time,
        end_time: attempt.end_time,
        score: attempt.score,
        max_score: attempt.max_score,
        percentage: attempt.percentage,
        is_passed: attempt.is_passed,
        questions,
    }
}
