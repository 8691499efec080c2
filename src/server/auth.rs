//! Bearer-token check for the CRUD routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::{AppState, ErrorBody};

/// Authentication middleware
///
/// Passes every request through when no token is configured.
pub async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.api_token.as_deref() else {
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(token) => token,
            None => {
                return unauthorized("invalid_auth", "Authorization header must use Bearer scheme")
            }
        },
        None => return unauthorized("missing_auth", "Authorization header required"),
    };

    if token == expected {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid token");
        unauthorized("invalid_token", "Invalid API token")
    }
}

fn unauthorized(error: &'static str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            error,
            message: message.to_string(),
        }),
    )
        .into_response()
}
