use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use serde_json::Value;

use crate::models::PersonRole;
use crate::services::scheduling_service::{check_capacity, check_coverage};
use crate::state::AppState;
use crate::web::middleware::auth::AuthenticatedPerson;
use crate::web::routes::registrations::registration_error_response;

const DASHBOARD_ACTIVITY_LIMIT: i64 = 10;

/// GET /api/dashboard/staff
///
/// Upcoming activities (soonest first) with their capacity and coverage
/// state plus alert flags, and platform-wide totals. Staff only.
pub async fn staff_dashboard_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedPerson>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if auth.role != PersonRole::Staff {
        return Err((
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "Forbidden" })),
        ));
    }

    let store = state.store.as_ref();
    let activities = store
        .list_upcoming_activities(Utc::now(), DASHBOARD_ACTIVITY_LIMIT)
        .await
        .map_err(store_error_response)?;

    let mut items = Vec::with_capacity(activities.len());
    for activity in &activities {
        let capacity = check_capacity(store, &activity.id)
            .await
            .map_err(registration_error_response)?;
        let coverage = check_coverage(store, &activity.id)
            .await
            .map_err(registration_error_response)?;
        let capacity_alert = capacity.percentage >= 80.0;
        let coverage_alert = !coverage.is_sufficient;
        items.push(serde_json::json!({
            "id": activity.id,
            "title": activity.title,
            "location": activity.location,
            "starts_at": activity.starts_at,
            "ends_at": activity.ends_at,
            "capacity": capacity,
            "coverage": coverage,
            "capacity_alert": capacity_alert,
            "coverage_alert": coverage_alert,
        }));
    }

    let totals = serde_json::json!({
        "activities": store.count_activities().await.map_err(store_error_response)?,
        "active_registrations": store
            .count_active_registrations()
            .await
            .map_err(store_error_response)?,
        "active_assignments": store
            .count_active_assignments()
            .await
            .map_err(store_error_response)?,
    });

    Ok(Json(serde_json::json!({
        "totals": totals,
        "activities": items,
    })))
}

fn store_error_response(err: crate::error::StoreError) -> (StatusCode, Json<Value>) {
    tracing::warn!(error = %err, "dashboard store failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Internal server error" })),
    )
}
