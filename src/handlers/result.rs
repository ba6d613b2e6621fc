// src/handlers/result.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::result::{
        AdminResultParams, PageParams, Pagination, RecommendationsView, ResultAnalysis,
        ResultPage, SubmitTestRequest, TestResult,
    },
    services::{statistics, submission},
    state::AppState,
    utils::jwt::Claims,
};

/// Loads a result and checks the caller may see it.
/// Students see their own results; counselors and admins see all.
async fn load_visible_result(
    state: &AppState,
    claims: &Claims,
    id: i64,
) -> Result<TestResult, AppError> {
    let result = state
        .results
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    if !result.is_visible_to(claims.user_id()?, &claims.role) {
        return Err(AppError::Forbidden(
            "You do not have access to this result".to_string(),
        ));
    }

    Ok(result)
}

/// Submits a test attempt.
///
/// * Validates the payload and the start/end window.
/// * Scores the answers, attaches program recommendations and stores the attempt.
/// * Returns 201 with the stored result.
pub async fn submit_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let time_spent = req
        .time_spent()
        .ok_or(AppError::BadRequest("End time must be after start time".to_string()))?;

    let student_id = claims.user_id()?;
    let result = submission::submit_test(state.submission_deps(), student_id, &req, time_spent).await?;

    tracing::info!(
        "Test {} submitted by student {}: {}%",
        result.test_id,
        student_id,
        result.percentage
    );

    Ok((StatusCode::CREATED, Json(result)))
}

/// Lists the caller's results, newest first.
pub async fn list_my_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let (skip, limit) = params.resolve();

    let results = state.results.find_by_student(student_id, skip, limit).await?;
    let total = state.results.count_by_student(student_id).await?;

    Ok(Json(ResultPage {
        results,
        pagination: Pagination::new(total, skip, limit),
    }))
}

pub async fn get_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = load_visible_result(&state, &claims, id).await?;
    Ok(Json(result))
}

pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = load_visible_result(&state, &claims, id).await?;
    Ok(Json(RecommendationsView::from(&result)))
}

pub async fn get_analysis(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = load_visible_result(&state, &claims, id).await?;
    Ok(Json(ResultAnalysis::from(&result)))
}

/// Dashboard statistics over the caller's whole history.
pub async fn get_my_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let stats = statistics::student_statistics(state.results.as_ref(), student_id).await?;
    Ok(Json(stats))
}

/// Lists every result, optionally filtered by student, test and status.
/// Counselor/admin only.
pub async fn list_all_results(
    State(state): State<AppState>,
    Query(params): Query<AdminResultParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.filter();
    let (skip, limit) = params.page().resolve();

    let results = state.results.find_filtered(&filter, skip, limit).await?;
    let total = state.results.count_filtered(&filter).await?;

    Ok(Json(ResultPage {
        results,
        pagination: Pagination::new(total, skip, limit),
    }))
}
