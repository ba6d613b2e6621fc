// src/services/statistics.rs

use std::collections::HashMap;

use crate::{
    config::LATEST_RESULTS_COUNT,
    models::{
        result::{ResultStatus, TestResult},
        statistics::{CategoryPerformance, StudentStatistics},
    },
    repository::{RepositoryError, ResultStore},
};

pub async fn student_statistics(
    store: &dyn ResultStore,
    student_id: i64,
) -> Result<StudentStatistics, RepositoryError> {
    let history = store.history(student_id).await?;
    Ok(summarize(history))
}

fn mean(sum: i64, count: i64) -> i32 {
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as i32
}

/// Summarizes a student's results (expected newest first).
///
/// Category performance is the plain mean of each category's per-attempt
/// percentage, not weighted by points. An empty history yields all zeros.
pub fn summarize(results: Vec<TestResult>) -> StudentStatistics {
    if results.is_empty() {
        return StudentStatistics::default();
    }

    let total = results.len() as i64;
    let passed = results
        .iter()
        .filter(|r| r.status == ResultStatus::Passed)
        .count() as i64;
    let failed = total - passed;

    let percentage_sum: i64 = results.iter().map(|r| i64::from(r.percentage)).sum();

    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, (i64, i64)> = HashMap::new();
    for category in results.iter().flat_map(|r| &r.category_scores) {
        let entry = totals.entry(category.category.clone()).or_insert_with(|| {
            order.push(category.category.clone());
            (0, 0)
        });
        entry.0 += i64::from(category.percentage);
        entry.1 += 1;
    }

    let category_performance = order
        .into_iter()
        .map(|category| {
            let (sum, count) = totals[&category];
            CategoryPerformance {
                average_score: mean(sum, count),
                category,
            }
        })
        .collect();

    StudentStatistics {
        total_tests: total,
        average_score: mean(percentage_sum, total),
        passed_tests: passed,
        failed_tests: failed,
        pass_rate: mean(passed * 100, total),
        category_performance,
        latest_results: results.into_iter().take(LATEST_RESULTS_COUNT).collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::result::CategoryScore;

    fn result(id: i64, percentage: i32, status: ResultStatus, categories: &[(&str, i32)]) -> TestResult {
        let now = Utc::now();
        TestResult {
            id,
            test_id: 1,
            student_id: 1,
            answers: Vec::new(),
            total_score: percentage,
            max_score: 100,
            percentage,
            status,
            category_scores: categories
                .iter()
                .map(|(name, pct)| CategoryScore {
                    category: name.to_string(),
                    score: *pct,
                    max_score: 100,
                    percentage: *pct,
                })
                .collect(),
            recommendations: Vec::new(),
            start_time: now,
            end_time: now,
            time_spent: 60,
            attempt_number: 1,
            created_at: now,
        }
    }

    #[test]
    fn test_empty_history_is_zeroed() {
        let stats = summarize(Vec::new());
        assert_eq!(stats.total_tests, 0);
        assert_eq!(stats.average_score, 0);
        assert_eq!(stats.pass_rate, 0);
        assert!(stats.category_performance.is_empty());
        assert!(stats.latest_results.is_empty());
    }

    #[test]
    fn test_summary_averages() {
        let stats = summarize(vec![
            result(3, 80, ResultStatus::Passed, &[("Math", 90), ("Verbal", 70)]),
            result(2, 45, ResultStatus::Failed, &[("Math", 40)]),
            result(1, 71, ResultStatus::Passed, &[("Verbal", 75), ("Logic", 100)]),
        ]);

        assert_eq!(stats.total_tests, 3);
        assert_eq!(stats.passed_tests, 2);
        assert_eq!(stats.failed_tests, 1);
        // (80 + 45 + 71) / 3 = 65.33
        assert_eq!(stats.average_score, 65);
        assert_eq!(stats.pass_rate, 67);
        assert_eq!(
            stats.category_performance,
            vec![
                CategoryPerformance {
                    category: "Math".to_string(),
                    average_score: 65,
                },
                CategoryPerformance {
                    category: "Verbal".to_string(),
                    average_score: 73,
                },
                CategoryPerformance {
                    category: "Logic".to_string(),
                    average_score: 100,
                },
            ]
        );
    }

    #[test]
    fn test_latest_results_are_capped() {
        let results = (0..8)
            .map(|i| result(8 - i, 50, ResultStatus::Passed, &[]))
            .collect();
        let stats = summarize(results);

        assert_eq!(stats.latest_results.len(), 5);
        assert_eq!(stats.latest_results[0].id, 8);
    }

    #[test]
    fn test_sums_do_not_overflow_on_extreme_records() {
        let stats = summarize(vec![
            result(2, i32::MAX, ResultStatus::Passed, &[("Math", i32::MAX)]),
            result(1, i32::MAX, ResultStatus::Passed, &[("Math", i32::MAX)]),
        ]);

        assert_eq!(stats.average_score, i32::MAX);
        assert_eq!(stats.category_performance[0].average_score, i32::MAX);
        assert_eq!(stats.pass_rate, 100);
    }
}
