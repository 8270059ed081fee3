use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::PersonRole;
use crate::state::AppState;

/// Session handling lives in an upstream gateway; by the time a request
/// reaches this service the caller is asserted through this header.
pub const PERSON_ID_HEADER: &str = "x-person-id";

#[derive(Clone, Debug)]
pub struct AuthenticatedPerson {
    pub id: String,
    pub role: PersonRole,
}

/// Resolve the asserted person id against the directory and inject the
/// caller into request extensions. Missing header or unknown person is a
/// 401; handlers never see such requests.
pub async fn require_person(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let person_id = request
        .headers()
        .get(PERSON_ID_HEADER)
        .and_then(|hv| hv.to_str().ok())
        .map(str::to_string);

    if let Some(person_id) = person_id {
        match state.store.find_person(&person_id).await {
            Ok(Some(person)) => {
                request.extensions_mut().insert(AuthenticatedPerson {
                    id: person.id,
                    role: person.role,
                });
                return next.run(request).await;
            }
            Ok(None) => {
                tracing::warn!(person_id = %person_id, "request asserted an unknown person");
            }
            Err(e) => {
                tracing::warn!(error = %e, "person lookup failed while authenticating");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "Internal server error" })),
                )
                    .into_response();
            }
        }
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "Unauthorized" })),
    )
        .into_response()
}
