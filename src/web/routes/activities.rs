use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ActivityValidationError;
use crate::models::{NewActivity, NewFormField};
use crate::services::activity_service;
use crate::services::scheduling_service::{check_capacity, check_coverage};
use crate::state::AppState;
use crate::web::middleware::auth::AuthenticatedPerson;
use crate::web::routes::registrations::registration_error_response;

#[derive(Debug, Deserialize)]
pub struct ActivityBody {
    #[serde(flatten)]
    activity: NewActivity,
    #[serde(default)]
    form_fields: Vec<NewFormField>,
}

/// POST /api/activities
pub async fn create_activity_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedPerson>,
    Json(body): Json<ActivityBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let activity = activity_service::create_activity(
        state.store.as_ref(),
        &auth.id,
        body.activity,
        body.form_fields,
    )
    .await
    .map_err(validation_error_response)?;
    Ok(Json(serde_json::json!(activity)))
}

/// PUT /api/activities/:activity_id
pub async fn update_activity_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedPerson>,
    Path(activity_id): Path<String>,
    Json(body): Json<ActivityBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let activity = activity_service::update_activity(
        state.store.as_ref(),
        &auth.id,
        &activity_id,
        body.activity,
        body.form_fields,
    )
    .await
    .map_err(validation_error_response)?;
    Ok(Json(serde_json::json!(activity)))
}

/// GET /api/activities/:activity_id
pub async fn activity_detail_handler(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthenticatedPerson>,
    Path(activity_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let detail = activity_service::load_activity_detail(state.store.as_ref(), &activity_id)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "activity detail load failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal server error" })),
            )
        })?;
    match detail {
        Some(detail) => Ok(Json(serde_json::json!(detail))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Activity not found" })),
        )),
    }
}

/// GET /api/activities/:activity_id/capacity
pub async fn activity_capacity_handler(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthenticatedPerson>,
    Path(activity_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let report = check_capacity(state.store.as_ref(), &activity_id)
        .await
        .map_err(registration_error_response)?;
    Ok(Json(serde_json::json!(report)))
}

/// GET /api/activities/:activity_id/coverage
pub async fn activity_coverage_handler(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthenticatedPerson>,
    Path(activity_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let report = check_coverage(state.store.as_ref(), &activity_id)
        .await
        .map_err(registration_error_response)?;
    Ok(Json(serde_json::json!(report)))
}

fn validation_error_response(err: ActivityValidationError) -> (StatusCode, Json<Value>) {
    match err {
        ActivityValidationError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Activity not found" })),
        ),
        ActivityValidationError::Forbidden => (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "Forbidden" })),
        ),
        ActivityValidationError::Store(e) => {
            tracing::warn!(error = %e, "activity write store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal server error" })),
            )
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": other.to_string() })),
        ),
    }
}
