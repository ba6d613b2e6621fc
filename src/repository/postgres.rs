// src/repository/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use super::{ProgramCatalog, RepositoryError, ResultStore, TestCatalog};
use crate::models::{
    program::Program,
    result::{CategoryScore, NewResult, Recommendation, ResultFilter, ScoredAnswer, TestResult},
    test::{Question, QuestionOption, Test, TestFilter, TestSummary},
};

const TEST_COLUMNS: &str = "t.id, t.title, t.description, t.category, t.subcategories, \
     t.difficulty, t.duration, t.total_points, t.passing_score, t.is_active, t.created_at";

const RESULT_COLUMNS: &str = "id, test_id, student_id, answers, total_score, max_score, \
     percentage, status, category_scores, recommendations, start_time, end_time, time_spent, \
     attempt_number, created_at";

/// Row of the 'tests' table.
#[derive(Debug, FromRow)]
struct TestRow {
    id: i64,
    title: String,
    description: String,
    category: String,
    subcategories: Json<Vec<String>>,
    difficulty: String,
    duration: i32,
    total_points: i32,
    passing_score: i32,
    is_active: bool,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct TestListRow {
    #[sqlx(flatten)]
    test: TestRow,
    question_count: i64,
}

/// Row of the 'test_questions' table.
#[derive(Debug, FromRow)]
struct QuestionRow {
    id: i64,
    text: String,
    question_type: String,
    category: String,
    difficulty: String,
    options: Json<Vec<QuestionOption>>,
    correct_option_index: i32,
    points: i32,
    explanation: Option<String>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = RepositoryError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(Question {
            id: row.id,
            text: row.text,
            question_type: row.question_type.parse().map_err(RepositoryError::Corrupt)?,
            category: row.category,
            difficulty: row.difficulty.parse().map_err(RepositoryError::Corrupt)?,
            options: row.options.0,
            correct_option_index: row.correct_option_index,
            points: row.points,
            explanation: row.explanation,
        })
    }
}

impl TestRow {
    fn into_test(self, questions: Vec<Question>) -> Result<Test, RepositoryError> {
        Ok(Test {
            id: self.id,
            title: self.title,
            description: self.description,
            category: self.category,
            subcategories: self.subcategories.0,
            difficulty: self.difficulty.parse().map_err(RepositoryError::Corrupt)?,
            duration: self.duration,
            total_points: self.total_points,
            passing_score: self.passing_score,
            questions,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<TestListRow> for TestSummary {
    type Error = RepositoryError;

    fn try_from(row: TestListRow) -> Result<Self, Self::Error> {
        let t = row.test;
        Ok(TestSummary {
            id: t.id,
            title: t.title,
            description: t.description,
            category: t.category,
            subcategories: t.subcategories.0,
            difficulty: t.difficulty.parse().map_err(RepositoryError::Corrupt)?,
            duration: t.duration,
            total_points: t.total_points,
            passing_score: t.passing_score,
            question_count: row.question_count.max(0) as usize,
        })
    }
}

/// Row of the 'programs' table.
#[derive(Debug, FromRow)]
struct ProgramRow {
    id: i64,
    name: String,
    description: String,
    abbreviation: String,
    field: String,
    level: String,
    duration: i32,
    required_skills: Json<Vec<String>>,
    career_outlook: String,
    average_salary: Option<i64>,
    is_active: bool,
}

impl From<ProgramRow> for Program {
    fn from(row: ProgramRow) -> Self {
        Program {
            id: row.id,
            name: row.name,
            description: row.description,
            abbreviation: row.abbreviation,
            field: row.field,
            level: row.level,
            duration: row.duration,
            required_skills: row.required_skills.0,
            career_outlook: row.career_outlook,
            average_salary: row.average_salary,
            is_active: row.is_active,
        }
    }
}

/// Row of the 'results' table. Nested collections are stored as JSONB.
#[derive(Debug, FromRow)]
struct ResultRow {
    id: i64,
    test_id: i64,
    student_id: i64,
    answers: Json<Vec<ScoredAnswer>>,
    total_score: i32,
    max_score: i32,
    percentage: i32,
    status: String,
    category_scores: Json<Vec<CategoryScore>>,
    recommendations: Json<Vec<Recommendation>>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    time_spent: i64,
    attempt_number: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ResultRow> for TestResult {
    type Error = RepositoryError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        Ok(TestResult {
            id: row.id,
            test_id: row.test_id,
            student_id: row.student_id,
            answers: row.answers.0,
            total_score: row.total_score,
            max_score: row.max_score,
            percentage: row.percentage,
            status: row.status.parse().map_err(RepositoryError::Corrupt)?,
            category_scores: row.category_scores.0,
            recommendations: row.recommendations.0,
            start_time: row.start_time,
            end_time: row.end_time,
            time_spent: row.time_spent,
            attempt_number: row.attempt_number,
            created_at: row.created_at,
        })
    }
}

fn into_results(rows: Vec<ResultRow>) -> Result<Vec<TestResult>, RepositoryError> {
    rows.into_iter().map(TestResult::try_from).collect()
}

/// Escapes LIKE metacharacters so a category is matched literally.
fn like_pattern(category: &str) -> String {
    let mut escaped = String::with_capacity(category.len() + 2);
    escaped.push('%');
    for c in category.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// PostgreSQL-backed store for tests, programs and results.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TestCatalog for PgStore {
    async fn find_test_by_id(&self, id: i64) -> Result<Option<Test>, RepositoryError> {
        let sql = format!("SELECT {TEST_COLUMNS} FROM tests t WHERE t.id = $1");
        let Some(row) = sqlx::query_as::<_, TestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let questions = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, text, question_type, category, difficulty, options,
                   correct_option_index, points, explanation
            FROM test_questions
            WHERE test_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Question::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        row.into_test(questions).map(Some)
    }

    async fn list_active_tests(
        &self,
        filter: &TestFilter,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<TestSummary>, i64), RepositoryError> {
        const WHERE: &str = "t.is_active = TRUE \
             AND ($1::TEXT IS NULL OR t.category = $1) \
             AND ($2::TEXT IS NULL OR t.difficulty = $2) \
             AND ($3::TEXT IS NULL OR t.subcategories ? $3)";

        let difficulty = filter.difficulty.map(|d| d.as_str());

        let sql = format!(
            "SELECT {TEST_COLUMNS}, \
             (SELECT COUNT(*) FROM test_questions q WHERE q.test_id = t.id) AS question_count \
             FROM tests t WHERE {WHERE} \
             ORDER BY t.created_at DESC, t.id DESC LIMIT $4 OFFSET $5"
        );
        let summaries = sqlx::query_as::<_, TestListRow>(&sql)
            .bind(filter.category.as_deref())
            .bind(difficulty)
            .bind(filter.subcategory.as_deref())
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(TestSummary::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let count_sql = format!("SELECT COUNT(*) FROM tests t WHERE {WHERE}");
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(filter.category.as_deref())
            .bind(difficulty)
            .bind(filter.subcategory.as_deref())
            .fetch_one(&self.pool)
            .await?;

        Ok((summaries, total))
    }
}

#[async_trait]
impl ProgramCatalog for PgStore {
    async fn find_active_programs(
        &self,
        fields: &[String],
        limit: usize,
    ) -> Result<Vec<Program>, RepositoryError> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let patterns: Vec<String> = fields.iter().map(|f| like_pattern(f)).collect();

        let rows = sqlx::query_as::<_, ProgramRow>(
            r#"
            SELECT id, name, description, abbreviation, field, level, duration,
                   required_skills, career_outlook, average_salary, is_active
            FROM programs
            WHERE is_active = TRUE AND field ILIKE ANY($1)
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(&patterns)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Program::from).collect())
    }
}

#[async_trait]
impl ResultStore for PgStore {
    async fn insert(&self, result: NewResult) -> Result<TestResult, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken by the upsert serializes attempts of the same pair.
        let attempt_number = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO attempt_counters (student_id, test_id, last_attempt)
            VALUES ($1, $2, 1)
            ON CONFLICT (student_id, test_id)
            DO UPDATE SET last_attempt = attempt_counters.last_attempt + 1
            RETURNING last_attempt
            "#,
        )
        .bind(result.student_id)
        .bind(result.test_id)
        .fetch_one(&mut *tx)
        .await?;

        let sql = format!(
            "INSERT INTO results \
             (test_id, student_id, answers, total_score, max_score, percentage, status, \
              category_scores, recommendations, start_time, end_time, time_spent, attempt_number) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {RESULT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ResultRow>(&sql)
            .bind(result.test_id)
            .bind(result.student_id)
            .bind(Json(&result.answers))
            .bind(result.total_score)
            .bind(result.max_score)
            .bind(result.percentage)
            .bind(result.status.as_str())
            .bind(Json(&result.category_scores))
            .bind(Json(&result.recommendations))
            .bind(result.start_time)
            .bind(result.end_time)
            .bind(result.time_spent)
            .bind(attempt_number)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        TestResult::try_from(row)
    }

    async fn count_by_student_and_test(
        &self,
        student_id: i64,
        test_id: i64,
    ) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM results WHERE student_id = $1 AND test_id = $2",
        )
        .bind(student_id)
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TestResult>, RepositoryError> {
        let sql = format!("SELECT {RESULT_COLUMNS} FROM results WHERE id = $1");
        sqlx::query_as::<_, ResultRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TestResult::try_from)
            .transpose()
    }

    async fn find_by_student(
        &self,
        student_id: i64,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TestResult>, RepositoryError> {
        let filter = ResultFilter {
            student_id: Some(student_id),
            ..ResultFilter::default()
        };
        self.find_filtered(&filter, skip, limit).await
    }

    async fn count_by_student(&self, student_id: i64) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM results WHERE student_id = $1")
            .bind(student_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn history(&self, student_id: i64) -> Result<Vec<TestResult>, RepositoryError> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM results WHERE student_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ResultRow>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        into_results(rows)
    }

    async fn find_filtered(
        &self,
        filter: &ResultFilter,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TestResult>, RepositoryError> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM results \
             WHERE ($1::BIGINT IS NULL OR student_id = $1) \
               AND ($2::BIGINT IS NULL OR test_id = $2) \
               AND ($3::TEXT IS NULL OR status = $3) \
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query_as::<_, ResultRow>(&sql)
            .bind(filter.student_id)
            .bind(filter.test_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        into_results(rows)
    }

    async fn count_filtered(&self, filter: &ResultFilter) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM results
            WHERE ($1::BIGINT IS NULL OR student_id = $1)
              AND ($2::BIGINT IS NULL OR test_id = $2)
              AND ($3::TEXT IS NULL OR status = $3)
            "#,
        )
        .bind(filter.student_id)
        .bind(filter.test_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("Math"), "%Math%");
        assert_eq!(like_pattern("100%_sure"), "%100\\%\\_sure%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
