// src/services/submission.rs

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::result::{NewResult, Recommendation, SubmitTestRequest, TestResult},
    repository::{ProgramCatalog, RepositoryError, ResultStore, TestCatalog},
    services::{
        recommender::{self, RecommendationOutcome},
        scorer::{self, ScoreSheet},
    },
};

/// The storage collaborators a submission touches.
#[derive(Clone, Copy)]
pub struct SubmissionDeps<'a> {
    pub tests: &'a dyn TestCatalog,
    pub programs: &'a dyn ProgramCatalog,
    pub results: &'a dyn ResultStore,
}

/// Scores a submission, attaches recommendations and stores the attempt.
///
/// Steps run strictly in order: load test, score, recommend, persist.
/// An unknown test or an unscorable test aborts before anything is stored;
/// a failing program catalog only empties the recommendation list.
pub async fn submit_test(
    deps: SubmissionDeps<'_>,
    student_id: i64,
    request: &SubmitTestRequest,
    time_spent: i64,
) -> Result<TestResult, AppError> {
    let test = deps
        .tests
        .find_test_by_id(request.test_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test not found".to_string()))?;

    let sheet = scorer::score_submission(&test, &request.answers, time_spent)?;

    let recommendations = match recommender::recommend(&sheet.category_scores, deps.programs).await
    {
        RecommendationOutcome::Matched(recommendations) => recommendations,
        RecommendationOutcome::NoMatches => Vec::new(),
        RecommendationOutcome::CatalogUnavailable(reason) => {
            tracing::warn!(
                "Saving result for student {} on test {} without recommendations: {}",
                student_id,
                test.id,
                reason
            );
            Vec::new()
        }
    };

    let result = save_result(
        deps.results,
        test.id,
        student_id,
        sheet,
        recommendations,
        request.start_time,
        request.end_time,
    )
    .await?;

    Ok(result)
}

/// Appends one attempt; the store assigns the attempt number.
pub async fn save_result(
    store: &dyn ResultStore,
    test_id: i64,
    student_id: i64,
    sheet: ScoreSheet,
    recommendations: Vec<Recommendation>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<TestResult, RepositoryError> {
    let percentage = sheet.percentage;

    let result = store
        .insert(NewResult {
            test_id,
            student_id,
            answers: sheet.scored_answers,
            total_score: sheet.total_score,
            max_score: sheet.max_score,
            percentage: sheet.percentage,
            status: sheet.status,
            category_scores: sheet.category_scores,
            recommendations,
            start_time,
            end_time,
            time_spent: sheet.time_spent,
        })
        .await?;

    tracing::info!(
        "Result saved for student {} on test {}: {}% (attempt {})",
        student_id,
        test_id,
        percentage,
        result.attempt_number
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::models::{
        program::Program,
        result::{AnswerSubmission, ResultStatus},
        test::{Difficulty, Question, QuestionOption, QuestionType, Test},
    };
    use crate::repository::MemoryStore;

    struct UnavailableCatalog;

    #[async_trait]
    impl ProgramCatalog for UnavailableCatalog {
        async fn find_active_programs(
            &self,
            _fields: &[String],
            _limit: usize,
        ) -> Result<Vec<Program>, RepositoryError> {
            Err(RepositoryError::Unavailable("timeout".to_string()))
        }
    }

    fn aptitude_test(total_points: i32) -> Test {
        let question = |id: i64, category: &str, points: i32, correct: i32| Question {
            id,
            text: format!("Q{}", id),
            question_type: QuestionType::MultipleChoice,
            category: category.to_string(),
            difficulty: Difficulty::Easy,
            options: vec![
                QuestionOption { text: "A".to_string() },
                QuestionOption { text: "B".to_string() },
            ],
            correct_option_index: correct,
            points,
            explanation: None,
        };

        Test {
            id: 5,
            title: "Orientation".to_string(),
            description: String::new(),
            category: "Aptitude".to_string(),
            subcategories: vec!["Math".to_string(), "Verbal".to_string()],
            difficulty: Difficulty::Easy,
            duration: 20,
            total_points,
            passing_score: 60,
            questions: vec![question(1, "Math", 10, 1), question(2, "Verbal", 5, 0)],
            is_active: true,
            created_at: None,
        }
    }

    fn math_program() -> Program {
        Program {
            id: 40,
            name: "Applied Mathematics".to_string(),
            description: String::new(),
            abbreviation: "AMATH".to_string(),
            field: "Mathematics".to_string(),
            level: "Bachelor".to_string(),
            duration: 3,
            required_skills: Vec::new(),
            career_outlook: "Growing".to_string(),
            average_salary: Some(52000),
            is_active: true,
        }
    }

    fn request(test_id: i64) -> SubmitTestRequest {
        let start = Utc::now() - Duration::minutes(10);
        SubmitTestRequest {
            test_id,
            answers: vec![
                AnswerSubmission {
                    question_id: 1,
                    selected_option_index: 1,
                },
                AnswerSubmission {
                    question_id: 2,
                    selected_option_index: 1,
                },
            ],
            start_time: start,
            end_time: start + Duration::minutes(10),
        }
    }

    fn deps(store: &MemoryStore) -> SubmissionDeps<'_> {
        SubmissionDeps {
            tests: store,
            programs: store,
            results: store,
        }
    }

    #[tokio::test]
    async fn test_submission_is_scored_recommended_and_numbered() {
        let store = MemoryStore::with_catalog(vec![aptitude_test(15)], vec![math_program()]);

        let first = submit_test(deps(&store), 9, &request(5), 600).await.unwrap();
        let second = submit_test(deps(&store), 9, &request(5), 600).await.unwrap();

        assert_eq!(first.attempt_number, 1);
        assert_eq!(second.attempt_number, 2);
        assert_eq!(first.total_score, 10);
        assert_eq!(first.percentage, 67);
        assert_eq!(first.status, ResultStatus::Passed);
        assert_eq!(first.time_spent, 600);
        assert_eq!(first.recommendations.len(), 1);
        assert_eq!(first.recommendations[0].program_id, 40);
        assert_eq!(first.recommendations[0].match_score, 100);
    }

    #[tokio::test]
    async fn test_unknown_test_is_not_found_and_nothing_is_saved() {
        let store = MemoryStore::new();

        let err = submit_test(deps(&store), 9, &request(77), 600).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.count_by_student(9).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_point_test_is_configuration_error() {
        let store = MemoryStore::with_catalog(vec![aptitude_test(0)], Vec::new());

        let err = submit_test(deps(&store), 9, &request(5), 600).await.unwrap_err();

        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(store.count_by_student(9).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_catalog_outage_still_saves_result() {
        let store = MemoryStore::with_catalog(vec![aptitude_test(15)], Vec::new());
        let deps = SubmissionDeps {
            tests: &store,
            programs: &UnavailableCatalog,
            results: &store,
        };

        let result = submit_test(deps, 9, &request(5), 600).await.unwrap();

        assert!(result.recommendations.is_empty());
        assert_eq!(result.attempt_number, 1);
        assert_eq!(store.count_by_student_and_test(9, 5).await.unwrap(), 1);
    }
}
