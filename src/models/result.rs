// src/models/result.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    config::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT},
    utils::jwt::is_staff_role,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Passed,
    Failed,
}

impl ResultStatus {
    /// A percentage exactly at the passing score passes.
    pub fn from_percentage(percentage: i32, passing_score: i32) -> Self {
        if percentage >= passing_score {
            ResultStatus::Passed
        } else {
            ResultStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Passed => "Passed",
            ResultStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Passed" => Ok(ResultStatus::Passed),
            "Failed" => Ok(ResultStatus::Failed),
            other => Err(format!("unknown result status '{}'", other)),
        }
    }
}

/// One answer as sent by the test taker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: i64,
    pub selected_option_index: i32,
}

/// A submitted answer after grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredAnswer {
    pub question_id: i64,
    pub selected_option_index: i32,
    pub is_correct: bool,
    pub points: i32,
    /// `None` when the question no longer exists in the test.
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category: String,
    pub score: i32,
    pub max_score: i32,
    pub percentage: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub program_id: i64,
    pub program_name: String,
    /// 0 to 100.
    pub match_score: i32,
    pub reason: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// One persisted test attempt. Never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: i64,
    pub test_id: i64,
    pub student_id: i64,
    pub answers: Vec<ScoredAnswer>,
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: i32,
    pub status: ResultStatus,
    pub category_scores: Vec<CategoryScore>,
    pub recommendations: Vec<Recommendation>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Seconds.
    pub time_spent: i64,
    pub attempt_number: i32,
    pub created_at: DateTime<Utc>,
}

impl TestResult {
    pub fn is_visible_to(&self, user_id: i64, role: &str) -> bool {
        self.student_id == user_id || is_staff_role(role)
    }
}

/// A result ready to be stored; the store assigns id, attempt number and timestamp.
#[derive(Debug, Clone)]
pub struct NewResult {
    pub test_id: i64,
    pub student_id: i64,
    pub answers: Vec<ScoredAnswer>,
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: i32,
    pub status: ResultStatus,
    pub category_scores: Vec<CategoryScore>,
    pub recommendations: Vec<Recommendation>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub time_spent: i64,
}

/// DTO for submitting a test attempt.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTestRequest {
    pub test_id: i64,

    #[validate(
        length(min = 1, message = "At least one answer is required."),
        custom(function = validate_answers)
    )]
    pub answers: Vec<AnswerSubmission>,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl SubmitTestRequest {
    /// Whole seconds between start and end, or `None` if the attempt ends before it starts.
    pub fn time_spent(&self) -> Option<i64> {
        if self.end_time <= self.start_time {
            return None;
        }
        let millis = (self.end_time - self.start_time).num_milliseconds();
        Some((millis as f64 / 1000.0).round() as i64)
    }
}

fn validate_answers(answers: &[AnswerSubmission]) -> Result<(), validator::ValidationError> {
    if answers.iter().any(|a| a.selected_option_index < 0) {
        return Err(validator::ValidationError::new("negative_option_index"));
    }
    Ok(())
}

/// Query parameters for paginated listings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    /// Returns `(skip, limit)` with skip >= 0 and limit clamped to 1..=100.
    pub fn resolve(&self) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        (skip, limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(total: i64, skip: i64, limit: i64) -> Self {
        let pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            total,
            skip,
            limit,
            pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultPage {
    pub results: Vec<TestResult>,
    pub pagination: Pagination,
}

/// Filters for the staff-wide result listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultFilter {
    pub student_id: Option<i64>,
    pub test_id: Option<i64>,
    pub status: Option<ResultStatus>,
}

impl ResultFilter {
    pub fn matches(&self, result: &TestResult) -> bool {
        self.student_id.is_none_or(|id| id == result.student_id)
            && self.test_id.is_none_or(|id| id == result.test_id)
            && self.status.is_none_or(|status| status == result.status)
    }
}

/// Query parameters for `GET /api/results/admin/all`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminResultParams {
    pub student_id: Option<i64>,
    pub test_id: Option<i64>,
    pub status: Option<ResultStatus>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl AdminResultParams {
    pub fn filter(&self) -> ResultFilter {
        ResultFilter {
            student_id: self.student_id,
            test_id: self.test_id,
            status: self.status,
        }
    }

    pub fn page(&self) -> PageParams {
        PageParams {
            skip: self.skip,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsView {
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_match: Option<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_matches: Option<Vec<Recommendation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&TestResult> for RecommendationsView {
    fn from(result: &TestResult) -> Self {
        match result.recommendations.first() {
            Some(top) => Self {
                recommendations: result.recommendations.clone(),
                top_match: Some(top.clone()),
                all_matches: Some(result.recommendations.clone()),
                message: None,
            },
            None => Self {
                recommendations: Vec::new(),
                top_match: None,
                all_matches: None,
                message: Some("No recommendations available yet".to_string()),
            },
        }
    }
}

/// Detailed breakdown of one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultAnalysis {
    pub percentage: i32,
    pub status: ResultStatus,
    pub category_scores: Vec<CategoryScore>,
    pub recommendations: Vec<Recommendation>,
    pub time_spent: i64,
    pub attempt_number: i32,
    /// Three highest categories.
    pub top_strengths: Vec<CategoryScore>,
    /// Two lowest categories, weakest first.
    pub areas_to_improve: Vec<CategoryScore>,
}

impl From<&TestResult> for ResultAnalysis {
    fn from(result: &TestResult) -> Self {
        let mut strongest = result.category_scores.clone();
        strongest.sort_by(|a, b| b.percentage.cmp(&a.percentage));

        let mut weakest = result.category_scores.clone();
        weakest.sort_by(|a, b| a.percentage.cmp(&b.percentage));

        Self {
            percentage: result.percentage,
            status: result.status,
            category_scores: result.category_scores.clone(),
            recommendations: result.recommendations.clone(),
            time_spent: result.time_spent,
            attempt_number: result.attempt_number,
            top_strengths: strongest.into_iter().take(3).collect(),
            areas_to_improve: weakest.into_iter().take(2).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(start_secs: i64, end_secs: i64) -> SubmitTestRequest {
        SubmitTestRequest {
            test_id: 1,
            answers: vec![AnswerSubmission {
                question_id: 1,
                selected_option_index: 0,
            }],
            start_time: Utc.timestamp_opt(start_secs, 0).unwrap(),
            end_time: Utc.timestamp_opt(end_secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_time_spent_requires_end_after_start() {
        assert_eq!(request(100, 190).time_spent(), Some(90));
        assert_eq!(request(100, 100).time_spent(), None);
        assert_eq!(request(100, 50).time_spent(), None);
    }

    #[test]
    fn test_time_spent_rounds_to_nearest_second() {
        let mut req = request(0, 10);
        req.end_time = Utc.timestamp_millis_opt(10_600).unwrap();
        assert_eq!(req.time_spent(), Some(11));
    }

    #[test]
    fn test_submit_request_validation() {
        let mut req = request(0, 10);
        assert!(req.validate().is_ok());

        req.answers[0].selected_option_index = -1;
        assert!(req.validate().is_err());

        req.answers.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_submit_request_parses_camel_case() {
        let req: SubmitTestRequest = serde_json::from_value(serde_json::json!({
            "testId": 3,
            "answers": [{"questionId": 11, "selectedOptionIndex": 2}],
            "startTime": "2026-01-01T10:00:00Z",
            "endTime": "2026-01-01T10:05:00.000Z"
        }))
        .unwrap();

        assert_eq!(req.test_id, 3);
        assert_eq!(req.answers[0].question_id, 11);
        assert_eq!(req.time_spent(), Some(300));
    }

    #[test]
    fn test_page_params_clamp() {
        assert_eq!(PageParams::default().resolve(), (0, 10));
        let params = PageParams {
            skip: Some(-5),
            limit: Some(1000),
        };
        assert_eq!(params.resolve(), (0, 100));
    }

    #[test]
    fn test_pagination_pages_round_up() {
        assert_eq!(Pagination::new(0, 0, 10).pages, 0);
        assert_eq!(Pagination::new(10, 0, 10).pages, 1);
        assert_eq!(Pagination::new(11, 0, 10).pages, 2);
    }

    #[test]
    fn test_status_tie_passes() {
        assert_eq!(ResultStatus::from_percentage(60, 60), ResultStatus::Passed);
        assert_eq!(ResultStatus::from_percentage(59, 60), ResultStatus::Failed);
    }

    #[test]
    fn test_visibility_follows_ownership_and_staff_roles() {
        let now = Utc::now();
        let result = TestResult {
            id: 1,
            test_id: 1,
            student_id: 7,
            answers: Vec::new(),
            total_score: 0,
            max_score: 10,
            percentage: 0,
            status: ResultStatus::Failed,
            category_scores: Vec::new(),
            recommendations: Vec::new(),
            start_time: now,
            end_time: now,
            time_spent: 0,
            attempt_number: 1,
            created_at: now,
        };

        assert!(result.is_visible_to(7, "student"));
        assert!(!result.is_visible_to(8, "student"));
        assert!(!result.is_visible_to(8, "parent"));
        assert!(result.is_visible_to(8, "counselor"));
        assert!(result.is_visible_to(8, "admin"));
    }
}
