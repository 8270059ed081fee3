use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::error::RegistrationError;
use crate::models::PersonRole;
use crate::services::registration_service::{self, SubmitRequest};
use crate::state::AppState;
use crate::web::middleware::auth::AuthenticatedPerson;

#[derive(Debug, Deserialize)]
pub struct RegistrationBody {
    activity_id: String,
    person_id: String,
    role: String,
    #[serde(default)]
    answers: serde_json::Map<String, Value>,
}

/// POST /api/registrations
pub async fn create_registration_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedPerson>,
    Json(body): Json<RegistrationBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let role = PersonRole::parse(&body.role).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Invalid role" })),
        )
    })?;

    let req = SubmitRequest {
        actor_person_id: auth.id,
        person_id: body.person_id,
        activity_id: body.activity_id,
        role,
        answers: body.answers,
    };

    let record = registration_service::submit(
        state.store.as_ref(),
        state.mailer.as_ref(),
        &state.locks,
        req,
    )
    .await
    .map_err(registration_error_response)?;

    Ok(Json(serde_json::json!({
        "id": record.id,
        "status": record.status,
    })))
}

/// Shared mapping from engine rejections to the JSON error surface. The
/// conflict payload carries the activity the caller is already booked on.
pub(crate) fn registration_error_response(err: RegistrationError) -> (StatusCode, Json<Value>) {
    match err {
        RegistrationError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Activity not found" })),
        ),
        RegistrationError::Forbidden => (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "Forbidden" })),
        ),
        RegistrationError::CapacityExceeded => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Activity is full" })),
        ),
        RegistrationError::ScheduleConflict(conflict) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "Time conflict detected",
                "conflict": conflict,
            })),
        ),
        RegistrationError::AlreadyRegistered => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Already registered for this activity" })),
        ),
        RegistrationError::Validation(message) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": message })),
        ),
        RegistrationError::Store(e) => {
            tracing::warn!(error = %e, "registration store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal server error" })),
            )
        }
    }
}
