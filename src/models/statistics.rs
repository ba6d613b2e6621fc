// src/models/statistics.rs

use serde::{Deserialize, Serialize};

use crate::models::result::TestResult;

/// Average percentage of one category across every attempt it appeared in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPerformance {
    pub category: String,
    pub average_score: i32,
}

/// Dashboard summary of a student's whole result history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatistics {
    pub total_tests: i64,
    pub average_score: i32,
    pub passed_tests: i64,
    pub failed_tests: i64,
    pub pass_rate: i32,
    pub category_performance: Vec<CategoryPerformance>,
    pub latest_results: Vec<TestResult>,
}
