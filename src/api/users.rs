use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AuthState, types::*, validation};
use crate::db::NewUser;
use crate::services::identity::AuthenticatedUser;

/// POST /users
/// Open registration; the caller picks a role
pub async fn create_user(
    State(state): State<Arc<AuthState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    validation::validate_username(&payload.username)?;
    validation::validate_email(&payload.email)?;
    validation::validate_password(&payload.password)?;

    let user = state
        .store
        .create_user(
            NewUser {
                username: payload.username,
                email: payload.email,
                password: payload.password,
                role: payload.role,
            },
            &state.security,
        )
        .await?;

    tracing::info!("User {} registered", user.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(user))),
    ))
}

/// GET /users?skip=&limit=
pub async fn list_users(
    State(state): State<Arc<AuthState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    if !(1..=1000).contains(&query.limit) {
        return Err(ApiError::validation(
            "Limit must be between 1 and 1000",
        ));
    }

    let users = state.store.list_users(query.skip, query.limit).await?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

/// GET /users/me
pub async fn get_me(
    State(state): State<Arc<AuthState>>,
    Extension(identity): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .store
        .get_user(identity.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Could not validate credentials".to_string()))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PUT /users
/// Self-service update of password and/or role
pub async fn update_me(
    State(state): State<Arc<AuthState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if let Some(password) = &payload.password {
        validation::validate_password(password)?;
    }

    let user = state
        .store
        .update_user(identity.id, payload.password, payload.role, &state.security)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Could not validate credentials".to_string()))?;

    tracing::info!("User {} updated their account", user.id);

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// GET /users/{id}
/// Public lookup; also the endpoint the ordering service resolves identities
/// against
pub async fn get_user(
    State(state): State<Arc<AuthState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found_msg("User not found"))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}
