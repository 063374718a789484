//! Axum request handlers for all service endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    CreateLinkRequest, CreateLinkResponse, ErrorResponse, PasswordResponse,
};
use common::ServiceError;
use tracing::warn;

use super::state::AppState;
use crate::health;

/// `POST /link`: store a secret and return the link that redeems it.
pub async fn create_link(
    State(state): State<AppState>,
    body: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "rejected create-link body");
            return error_response(&ServiceError::BadInput(rejection.body_text()));
        }
    };

    let cancel = state.shutdown.child_token();
    match state.links.create_link(&req.password, &cancel).await {
        Ok(link) => {
            let body = CreateLinkResponse {
                url: state.link_url(&link),
                link,
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// `GET /pwd/:link`: decrypt and return the secret stored under `link`.
pub async fn get_password(
    State(state): State<AppState>,
    Path(link): Path<String>,
) -> Response {
    let cancel = state.shutdown.child_token();
    match state.links.get_password(&link, &cancel).await {
        Ok(password) => (StatusCode::OK, Json(PasswordResponse { password })).into_response(),
        Err(e) => error_response(&e),
    }
}

/// `GET /health`: readiness check.
///
/// Returns `200 OK` when every dependency answers, `500` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let report = health::run_all(&state.health_checks).await;
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn error_response(e: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(e))).into_response()
}
