// src/repository/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{ProgramCatalog, RepositoryError, ResultStore, TestCatalog};
use crate::models::{
    program::Program,
    result::{NewResult, ResultFilter, TestResult},
    test::{Test, TestFilter, TestSummary},
};

#[derive(Debug, Default)]
struct ResultTable {
    rows: Vec<TestResult>,
    /// Last attempt number handed out per (student_id, test_id).
    attempts: HashMap<(i64, i64), i32>,
    last_id: i64,
}

/// Process-local store implementing all three storage contracts.
/// Used by the test suite and for running the API without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tests: RwLock<Vec<Test>>,
    programs: RwLock<Vec<Program>>,
    results: RwLock<ResultTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs keep their given order; that order is the catalog order.
    pub fn with_catalog(tests: Vec<Test>, programs: Vec<Program>) -> Self {
        Self {
            tests: RwLock::new(tests),
            programs: RwLock::new(programs),
            results: RwLock::default(),
        }
    }
}

/// Newest first; ids break ties between results created in the same instant.
fn newest_first(rows: &mut [TestResult]) {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

fn page(rows: Vec<TestResult>, skip: i64, limit: i64) -> Vec<TestResult> {
    rows.into_iter()
        .skip(skip.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl TestCatalog for MemoryStore {
    async fn find_test_by_id(&self, id: i64) -> Result<Option<Test>, RepositoryError> {
        Ok(self.tests.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn list_active_tests(
        &self,
        filter: &TestFilter,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<TestSummary>, i64), RepositoryError> {
        let tests = self.tests.read().await;
        let mut matching: Vec<&Test> = tests.iter().filter(|t| filter.matches(t)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let summaries = matching
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(TestSummary::from)
            .collect();

        Ok((summaries, total))
    }
}

#[async_trait]
impl ProgramCatalog for MemoryStore {
    async fn find_active_programs(
        &self,
        fields: &[String],
        limit: usize,
    ) -> Result<Vec<Program>, RepositoryError> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let programs = self.programs.read().await;
        Ok(programs
            .iter()
            .filter(|p| p.is_active && fields.iter().any(|f| p.field_matches(f)))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn insert(&self, result: NewResult) -> Result<TestResult, RepositoryError> {
        // Counter bump and row append share one write guard.
        let mut table = self.results.write().await;

        let counter = table
            .attempts
            .entry((result.student_id, result.test_id))
            .or_insert(0);
        *counter += 1;
        let attempt_number = *counter;

        table.last_id += 1;
        let stored = TestResult {
            id: table.last_id,
            test_id: result.test_id,
            student_id: result.student_id,
            answers: result.answers,
            total_score: result.total_score,
            max_score: result.max_score,
            percentage: result.percentage,
            status: result.status,
            category_scores: result.category_scores,
            recommendations: result.recommendations,
            start_time: result.start_time,
            end_time: result.end_time,
            time_spent: result.time_spent,
            attempt_number,
            created_at: Utc::now(),
        };
        table.rows.push(stored.clone());

        Ok(stored)
    }

    async fn count_by_student_and_test(
        &self,
        student_id: i64,
        test_id: i64,
    ) -> Result<i64, RepositoryError> {
        let table = self.results.read().await;
        Ok(table
            .rows
            .iter()
            .filter(|r| r.student_id == student_id && r.test_id == test_id)
            .count() as i64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TestResult>, RepositoryError> {
        let table = self.results.read().await;
        Ok(table.rows.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_student(
        &self,
        student_id: i64,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TestResult>, RepositoryError> {
        let history = self.history(student_id).await?;
        Ok(page(history, skip, limit))
    }

    async fn count_by_student(&self, student_id: i64) -> Result<i64, RepositoryError> {
        let table = self.results.read().await;
        Ok(table
            .rows
            .iter()
            .filter(|r| r.student_id == student_id)
            .count() as i64)
    }

    async fn history(&self, student_id: i64) -> Result<Vec<TestResult>, RepositoryError> {
        let filter = ResultFilter {
            student_id: Some(student_id),
            ..ResultFilter::default()
        };
        let table = self.results.read().await;
        let mut rows: Vec<TestResult> = table
            .rows
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(rows)
    }

    async fn find_filtered(
        &self,
        filter: &ResultFilter,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TestResult>, RepositoryError> {
        let table = self.results.read().await;
        let mut rows: Vec<TestResult> = table
            .rows
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(page(rows, skip, limit))
    }

    async fn count_filtered(&self, filter: &ResultFilter) -> Result<i64, RepositoryError> {
        let table = self.results.read().await;
        Ok(table.rows.iter().filter(|r| filter.matches(r)).count() as i64)
    }
}
