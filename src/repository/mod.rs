// src/repository/mod.rs

//! Storage contracts for the test catalog, the program catalog and the
//! result collection. Handlers and services only see these traits, so the
//! scoring flow runs the same against PostgreSQL or the in-memory store.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::{
    program::Program,
    result::{NewResult, ResultFilter, TestResult},
    test::{Test, TestFilter, TestSummary},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("conflicting record: {0}")]
    Conflict(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.to_string())
            }
            sqlx::Error::ColumnDecode { index, source } => {
                RepositoryError::Corrupt(format!("column {}: {}", index, source))
            }
            other => RepositoryError::Unavailable(other.to_string()),
        }
    }
}

/// Read-only access to test definitions.
#[async_trait]
pub trait TestCatalog: Send + Sync {
    async fn find_test_by_id(&self, id: i64) -> Result<Option<Test>, RepositoryError>;

    /// Active tests matching `filter`, newest first, plus the total match count.
    async fn list_active_tests(
        &self,
        filter: &TestFilter,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<TestSummary>, i64), RepositoryError>;
}

/// Read-only access to academic programs.
#[async_trait]
pub trait ProgramCatalog: Send + Sync {
    /// Active programs whose field contains any of `fields` (case-insensitive),
    /// in catalog order, at most `limit`.
    async fn find_active_programs(
        &self,
        fields: &[String],
        limit: usize,
    ) -> Result<Vec<Program>, RepositoryError>;
}

/// Append-only result collection.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persists a new attempt. The attempt number is taken from a per
    /// (student, test) counter incremented in the same unit of work, so two
    /// attempts never share a number.
    async fn insert(&self, result: NewResult) -> Result<TestResult, RepositoryError>;

    async fn count_by_student_and_test(
        &self,
        student_id: i64,
        test_id: i64,
    ) -> Result<i64, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<TestResult>, RepositoryError>;

    /// Newest first.
    async fn find_by_student(
        &self,
        student_id: i64,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TestResult>, RepositoryError>;

    async fn count_by_student(&self, student_id: i64) -> Result<i64, RepositoryError>;

    /// Every result of the student, newest first.
    async fn history(&self, student_id: i64) -> Result<Vec<TestResult>, RepositoryError>;

    /// Newest first.
    async fn find_filtered(
        &self,
        filter: &ResultFilter,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TestResult>, RepositoryError>;

    async fn count_filtered(&self, filter: &ResultFilter) -> Result<i64, RepositoryError>;
}
