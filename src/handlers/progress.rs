// src/handlers/progress.rs

use axum::{Extension, Json, extract::Path, extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::{
    error::AppError,
    models::progress::{CourseProgressResponse, LessonPassRow, ModuleProgressResponse},
    utils::jwt::Claims,
};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Marks every lesson backed by the given quiz as done for one learner.
/// Called inside the submit transaction, only for a passing submission.
/// Upserting keeps the original started_at when the learner had already
/// opened the lesson.
pub async fn mark_quiz_lessons_done(
    tx: &mut Transaction<'_, Sqlite>,
    quiz_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let lesson_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM lessons WHERE quiz_id = ?")
        .bind(quiz_id)
        .fetch_all(&mut **tx)
        .await?;

    for lesson_id in lesson_ids {
        sqlx::query(
            "INSERT INTO lesson_progress (user_id, lesson_id, is_done, started_at, completed_at)
             VALUES (?, ?, 1, ?, ?)
             ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                 is_done = 1,
                 completed_at = excluded.completed_at",
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Per-lesson completion for one learner across a module.
///
/// A lesson counts as passed when its progress flag is set AND, for a
/// quiz-backed lesson, the learner has at least one passing attempt on the
/// linked quiz.
async fn lesson_pass_rows(
    pool: &SqlitePool,
    module_id: i64,
    user_id: i64,
) -> Result<Vec<LessonPassRow>, AppError> {
    let rows = sqlx::query_as::<_, LessonPassRow>(
        "SELECT
             l.id,
             COALESCE(lp.is_done, 0) AS is_done,
             CASE
                 WHEN l.quiz_id IS NULL THEN 1
                 WHEN EXISTS (
                     SELECT 1 FROM attempts a
                     WHERE a.quiz_id = l.quiz_id AND a.user_id = ? AND a.is_passed = 1
                 ) THEN 1
                 ELSE 0
             END AS quiz_ok
         FROM lessons l
         LEFT JOIN lesson_progress lp ON lp.lesson_id = l.id AND lp.user_id = ?
         WHERE l.module_id = ?",
    )
    .bind(user_id)
    .bind(user_id)
    .bind(module_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch lesson progress for module {}: {:?}", module_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(rows)
}

async fn module_completion(
    pool: &SqlitePool,
    module_id: i64,
    user_id: i64,
) -> Result<(i64, i64), AppError> {
    let rows = lesson_pass_rows(pool, module_id, user_id).await?;
    let total = rows.len() as i64;
    let completed = rows.iter().filter(|r| r.is_done && r.quiz_ok).count() as i64;
    Ok((total, completed))
}

/// Module completion percentage for the caller: share of lessons passed,
/// rounded to 2 decimals. A module with no lessons reports 0.
pub async fn module_progress(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM course_modules WHERE id = ?")
        .bind(module_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Module not found".to_string()));
    }

    let (total, completed) = module_completion(&pool, module_id, user_id).await?;
    let percentage = if total > 0 {
        round2(completed as f64 * 100.0 / total as f64)
    } else {
        0.0
    };

    Ok(Json(ModuleProgressResponse {
        module_id,
        total_lessons: total,
        completed_lessons: completed,
        percentage,
    }))
}

/// Course completion percentage for the caller: share of modules whose own
/// progress is exactly 100%, rounded to 2 decimals. A partially complete
/// module contributes nothing to the rollup.
pub async fn course_progress(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM courses WHERE id = ?")
        .bind(course_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let module_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM course_modules WHERE course_id = ?")
            .bind(course_id)
            .fetch_all(&pool)
            .await?;

    let total_modules = module_ids.len() as i64;
    let mut completed_modules = 0;
    for module_id in module_ids {
        let (total, completed) = module_completion(&pool, module_id, user_id).await?;
        // "Complete" means every lesson passed; an empty module never is.
        if total > 0 && completed == total {
            completed_modules += 1;
        }
    }

    let percentage = if total_modules > 0 {
        round2(completed_modules as f64 * 100.0 / total_modules as f64)
    } else {
        0.0
    };

    Ok(Json(CourseProgressResponse {
        course_id,
        total_modules,
        completed_modules,
        percentage,
    }))
}
