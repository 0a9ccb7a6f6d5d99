// src/scoring.rs

use std::collections::{BTreeSet, HashMap};

use crate::{
    catalog::QuestionWithAnswers,
    models::{attempt::SubmittedAnswer, quiz::QuestionKind},
};

/// Scoring for one question.
#[derive(Debug, Clone)]
pub struct QuestionScore {
    pub question_id: i64,
    pub awarded_points: i64,
    pub correct_answer_ids: Vec<i64>,
    pub selected_answer_ids: Vec<i64>,
    pub essay_text: Option<String>,
}

/// Outcome of scoring one submission against a quiz definition.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub score: i64,
    pub max_score: i64,
    pub questions: Vec<QuestionScore>,
}

/// Scores a submission. Pure function over the quiz's active questions and
/// the submitted items.
///
/// * Essay questions contribute 0 points; the text is carried through for
///   later human review.
/// * Choice questions award full points iff the de-duplicated selected set
///   equals the correct set exactly. No partial credit.
/// * Submitted items for question ids the quiz does not contain are
///   silently ignored, and so are answer ids that do not belong to the
///   question. Reads that re-score the persisted rows therefore see the
///   exact set that was scored at submit time.
pub fn score_submission(
    questions: &[QuestionWithAnswers],
    submitted: &[SubmittedAnswer],
) -> ScoreOutcome {
    // Merge duplicate entries per question id; unknown ids drop out because
    // only the quiz's own questions are consulted below.
    let mut by_question: HashMap<i64, (BTreeSet<i64>, Option<String>)> = HashMap::new();
    for item in submitted {
        let entry = by_question.entry(item.question_id).or_default();
        entry.0.extend(item.selected_answer_ids.iter().copied());
        if entry.1.is_none() {
            entry.1 = item.essay_text.clone();
        }
    }

    let mut score = 0;
    let mut max_score = 0;
    let mut results = Vec::with_capacity(questions.len());

    for q in questions {
        max_score += q.question.points;

        let (selected, essay_text) = by_question
            .remove(&q.question.id)
            .unwrap_or((BTreeSet::new(), None));

        let result = match q.question.kind {
            QuestionKind::Essay => QuestionScore {
                question_id: q.question.id,
                awarded_points: 0,
                correct_answer_ids: Vec::new(),
                selected_answer_ids: Vec::new(),
                essay_text,
            },
            QuestionKind::MultipleChoice | QuestionKind::TrueFalse => {
                let known: BTreeSet<i64> = q.answers.iter().map(|a| a.id).collect();
                let correct: BTreeSet<i64> = q
                    .answers
                    .iter()
                    .filter(|a| a.is_correct)
                    .map(|a| a.id)
                    .collect();

                // Ids from other questions drop out before comparison, the
                // same tolerance as unknown question ids.
                let selected: BTreeSet<i64> = selected
                    .into_iter()
                    .filter(|id| known.contains(id))
                    .collect();

                // Set equality, order-independent. A strict subset or a
                // superset both award zero. A question with no correct
                // answers is an authoring defect and never awards, even for
                // an empty selection.
                let awarded = if !correct.is_empty() && selected == correct {
                    q.question.points
                } else {
                    0
                };

                QuestionScore {
                    question_id: q.question.id,
                    awarded_points: awarded,
                    correct_answer_ids: correct.into_iter().collect(),
                    selected_answer_ids: selected.into_iter().collect(),
                    essay_text: None,
                }
            }
        };

        score += result.awarded_points;
        results.push(result);
    }

    ScoreOutcome {
        score,
        max_score,
        questions: results,
    }
}

/// percentage = score * 100 / max_score, or 0 for an empty quiz.
pub fn percentage(score: i64, max_score: i64) -> f64 {
    if max_score > 0 {
        score as f64 * 100.0 / max_score as f64
    } else {
        0.0
    }
}
