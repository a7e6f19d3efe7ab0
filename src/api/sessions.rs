use axum::{Json, extract::State, http::HeaderMap};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AuthState};
use super::{auth, types::*};
use crate::token::TokenError;

/// POST /sessions
/// Verify email and password, mint a session token
pub async fn create_session(
    State(state): State<Arc<AuthState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let session = state.sessions.login(&payload.email, &payload.password).await?;

    tracing::info!("Session issued for user {}", session.user.id);

    Ok(Json(ApiResponse::success(SessionResponse {
        access_token: session.token,
    })))
}

/// GET /sessions
/// Introspect the presented token: pure signature and expiry check, no user
/// lookup
pub async fn get_session(
    State(state): State<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SessionInfoResponse>>, ApiError> {
    let token = auth::extract_bearer(&headers)
        .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

    let claims = state.codec.decode(&token).map_err(|e| match e {
        TokenError::Expired => ApiError::ExpiredToken,
        TokenError::Malformed | TokenError::Signing(_) => {
            ApiError::Unauthorized("Invalid token".to_string())
        }
    })?;

    Ok(Json(ApiResponse::success(SessionInfoResponse {
        user_id: claims.sub,
        expires_at: claims.expires_at().map(|t| t.to_rfc3339()),
    })))
}
