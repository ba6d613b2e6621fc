// src/services/scorer.rs

use std::collections::{HashMap, HashSet};

use crate::models::{
    result::{AnswerSubmission, CategoryScore, ResultStatus, ScoredAnswer},
    test::{Question, Test},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("Test {test_id} has no achievable points and cannot be scored")]
    InvalidTotalPoints { test_id: i64 },
}

/// Everything derived from one submission before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSheet {
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: i32,
    pub status: ResultStatus,
    /// Strongest category first.
    pub category_scores: Vec<CategoryScore>,
    pub scored_answers: Vec<ScoredAnswer>,
    /// Seconds, carried through unchanged.
    pub time_spent: i64,
}

/// `round(part / whole * 100)`, or 0 when there is nothing to score against.
pub fn percentage_of(part: i32, whole: i32) -> i32 {
    if whole <= 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as i32
}

/// Grades a submission against its test.
///
/// * Answers to questions missing from the test score 0 and are kept as incorrect.
/// * Only the first answer to a question can earn points; repeats score 0.
/// * `max_score` is the test's total, so unanswered questions simply count as 0.
///
/// Fails only when the test is worth 0 points, since no percentage exists then.
pub fn score_submission(
    test: &Test,
    answers: &[AnswerSubmission],
    time_spent: i64,
) -> Result<ScoreSheet, ScoringError> {
    if test.total_points <= 0 {
        return Err(ScoringError::InvalidTotalPoints { test_id: test.id });
    }

    let mut answered: HashSet<i64> = HashSet::new();
    let mut correct: HashSet<i64> = HashSet::new();
    let mut scored_answers = Vec::with_capacity(answers.len());

    for answer in answers {
        let Some(question) = test.question(answer.question_id) else {
            tracing::warn!(
                "Question not found: {} (test {})",
                answer.question_id,
                test.id
            );
            scored_answers.push(ScoredAnswer {
                question_id: answer.question_id,
                selected_option_index: answer.selected_option_index,
                is_correct: false,
                points: 0,
                category: None,
            });
            continue;
        };

        let first_answer = answered.insert(question.id);
        if !first_answer {
            tracing::debug!("Repeated answer for question {} ignored", question.id);
        }

        let is_correct = first_answer && question.is_answered_by(answer.selected_option_index);
        if is_correct {
            correct.insert(question.id);
        }

        scored_answers.push(ScoredAnswer {
            question_id: answer.question_id,
            selected_option_index: answer.selected_option_index,
            is_correct,
            points: if is_correct { question.points } else { 0 },
            category: Some(question.category.clone()),
        });
    }

    let total_score: i32 = scored_answers.iter().map(|a| a.points).sum();
    let percentage = percentage_of(total_score, test.total_points);

    Ok(ScoreSheet {
        total_score,
        max_score: test.total_points,
        percentage,
        status: ResultStatus::from_percentage(percentage, test.passing_score),
        category_scores: category_scores(&test.questions, &correct),
        scored_answers,
        time_spent,
    })
}

/// Per-category breakdown over all of the test's questions, answered or not.
///
/// Sorted by percentage, highest first. The sort is stable, so equal
/// percentages keep the order in which the categories first appear.
pub fn category_scores(questions: &[Question], correct: &HashSet<i64>) -> Vec<CategoryScore> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut scores: Vec<CategoryScore> = Vec::new();

    for question in questions {
        let slot = *index.entry(question.category.as_str()).or_insert_with(|| {
            scores.push(CategoryScore {
                category: question.category.clone(),
                score: 0,
                max_score: 0,
                percentage: 0,
            });
            scores.len() - 1
        });

        let entry = &mut scores[slot];
        entry.max_score += question.points;
        if correct.contains(&question.id) {
            entry.score += question.points;
        }
    }

    for entry in &mut scores {
        entry.percentage = percentage_of(entry.score, entry.max_score);
    }

    scores.sort_by(|a, b| b.percentage.cmp(&a.percentage));
    scores
}
