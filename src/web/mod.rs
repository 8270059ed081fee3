pub mod middleware;
pub mod routes;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::state::AppState;
use crate::web::middleware::auth;
use crate::web::routes::{activities, dashboard, registrations};

/// The full HTTP surface. Everything except the health probe sits behind
/// caller identification.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/registrations",
            post(registrations::create_registration_handler),
        )
        .route("/api/activities", post(activities::create_activity_handler))
        .route(
            "/api/activities/:activity_id",
            get(activities::activity_detail_handler).put(activities::update_activity_handler),
        )
        .route(
            "/api/activities/:activity_id/capacity",
            get(activities::activity_capacity_handler),
        )
        .route(
            "/api/activities/:activity_id/coverage",
            get(activities::activity_coverage_handler),
        )
        .route("/api/dashboard/staff", get(dashboard::staff_dashboard_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::require_person,
        ));

    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({ "status": "ok" })) }),
        )
        .merge(protected)
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
