use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, OrderState, types::*, validation};
use crate::db::{DishChanges, NewDish};
use crate::entities::users::Role;
use crate::services::identity::AuthenticatedUser;

fn require_manager(identity: &AuthenticatedUser, action: &str) -> Result<(), ApiError> {
    if identity.role != Role::Manager {
        return Err(ApiError::forbidden(format!("Only managers can {action}")));
    }
    Ok(())
}

/// GET /dishes/menu
/// Public menu: only dishes that are in stock
pub async fn get_menu(
    State(state): State<Arc<OrderState>>,
) -> Result<Json<ApiResponse<DishListResponse>>, ApiError> {
    let dishes = state.store.list_available_dishes().await?;

    Ok(Json(ApiResponse::success(DishListResponse {
        dishes: dishes.into_iter().map(DishDto::from).collect(),
    })))
}

/// GET /dishes
pub async fn list_dishes(
    State(state): State<Arc<OrderState>>,
    Extension(identity): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<DishListResponse>>, ApiError> {
    require_manager(&identity, "get all dishes")?;

    let dishes = state.store.list_all_dishes().await?;

    Ok(Json(ApiResponse::success(DishListResponse {
        dishes: dishes.into_iter().map(DishDto::from).collect(),
    })))
}

/// GET /dishes/{id}
pub async fn get_dish(
    State(state): State<Arc<OrderState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    Path(dish_id): Path<i32>,
) -> Result<Json<ApiResponse<DishDto>>, ApiError> {
    require_manager(&identity, "get a dish")?;

    let dish = state
        .store
        .get_dish(dish_id)
        .await?
        .ok_or_else(|| ApiError::not_found_msg("Dish not found"))?;

    Ok(Json(ApiResponse::success(DishDto::from(dish))))
}

/// POST /dishes
pub async fn create_dish(
    State(state): State<Arc<OrderState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateDishRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DishDto>>), ApiError> {
    require_manager(&identity, "create dishes")?;

    validation::validate_dish_name(&payload.name)?;
    if let Some(description) = &payload.description {
        validation::validate_description(description)?;
    }
    validation::validate_price(payload.price)?;
    validation::validate_stock_quantity(payload.quantity)?;

    let dish = state
        .store
        .create_dish(NewDish {
            name: payload.name,
            description: payload.description,
            price: payload.price,
            quantity: payload.quantity,
        })
        .await?;

    tracing::info!("Dish {} created by manager {}", dish.id, identity.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(DishDto::from(dish))),
    ))
}

/// PUT /dishes/{id}
pub async fn update_dish(
    State(state): State<Arc<OrderState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    Path(dish_id): Path<i32>,
    Json(payload): Json<UpdateDishRequest>,
) -> Result<Json<ApiResponse<DishDto>>, ApiError> {
    require_manager(&identity, "update dishes")?;

    if let Some(name) = &payload.name {
        validation::validate_dish_name(name)?;
    }
    if let Some(Some(description)) = &payload.description {
        validation::validate_description(description)?;
    }
    if let Some(price) = payload.price {
        validation::validate_price(price)?;
    }
    if let Some(quantity) = payload.quantity {
        validation::validate_stock_quantity(quantity)?;
    }

    let dish = state
        .store
        .update_dish(
            dish_id,
            DishChanges {
                name: payload.name,
                description: payload.description,
                price: payload.price,
                quantity: payload.quantity,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(DishDto::from(dish))))
}

/// DELETE /dishes/{id}
pub async fn delete_dish(
    State(state): State<Arc<OrderState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    Path(dish_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    require_manager(&identity, "delete dishes")?;

    let deleted = state.store.delete_dish(dish_id).await?;
    if !deleted {
        return Err(ApiError::not_found_msg("Dish not found"));
    }

    tracing::info!("Dish {} deleted by manager {}", dish_id, identity.id);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Dish deleted".to_string(),
    })))
}
