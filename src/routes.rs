// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{result, test},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware, taker_middleware},
};

/// Assembles the main application router.
///
/// * Public test catalog routes.
/// * Result routes behind bearer-token authentication, open to students,
///   counselors and admins; the staff listing requires counselor or admin.
/// * Global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let test_routes = Router::new()
        .route("/", get(test::list_tests))
        .route("/{id}", get(test::get_test))
        .route("/{id}/questions", get(test::get_test_questions));

    let staff_routes = Router::new()
        .route("/admin/all", get(result::list_all_results))
        .layer(middleware::from_fn(staff_middleware));

    let result_routes = Router::new()
        .route("/", get(result::list_my_results))
        .route("/submit", post(result::submit_test))
        .route("/stats/me", get(result::get_my_stats))
        .route("/{id}", get(result::get_result))
        .route("/{id}/recommendations", get(result::get_recommendations))
        .route("/{id}/analysis", get(result::get_analysis))
        .merge(staff_routes)
        // Applied to everything above, staff routes included.
        // Layers run outermost first: auth, then the taker role check.
        .layer(middleware::from_fn(taker_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/tests", test_routes)
        .nest("/api/results", result_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
