use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, OrderState, types::*, validation};
use crate::db::OrderItemRequest;
use crate::entities::users::Role;
use crate::services::identity::AuthenticatedUser;

/// POST /orders
/// Any authenticated user may order; stock is reserved atomically per dish
pub async fn create_order(
    State(state): State<Arc<OrderState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderCreatedResponse>>), ApiError> {
    validation::validate_order_lines(&payload.dishes)?;
    validation::validate_description(&payload.special_requests)?;

    let items: Vec<OrderItemRequest> = payload
        .dishes
        .iter()
        .map(|line| OrderItemRequest {
            dish_id: line.dish_id,
            quantity: line.quantity,
        })
        .collect();

    let details = state
        .store
        .create_order(identity.id, payload.special_requests, &items)
        .await?;

    tracing::info!(
        "Order {} created by user {} ({} line(s))",
        details.order.id,
        identity.id,
        details.items.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(OrderCreatedResponse {
            order_id: details.order.id,
        })),
    ))
}

/// GET /orders/{id}
pub async fn get_order(
    State(state): State<Arc<OrderState>>,
    Extension(_identity): Extension<AuthenticatedUser>,
    Path(order_id): Path<i32>,
) -> Result<Json<ApiResponse<OrderDto>>, ApiError> {
    let details = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::not_found_msg("Order not found"))?;

    Ok(Json(ApiResponse::success(OrderDto::from(details))))
}

/// GET /orders
/// Kitchen-wide view, restricted to chefs and managers
pub async fn list_orders(
    State(state): State<Arc<OrderState>>,
    Extension(identity): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ApiError> {
    if !matches!(identity.role, Role::Manager | Role::Chef) {
        return Err(ApiError::forbidden(
            "You are not authorized to get the list of all orders",
        ));
    }

    let orders = state.store.list_orders().await?;
    if orders.is_empty() {
        return Err(ApiError::not_found_msg("No orders found"));
    }

    Ok(Json(ApiResponse::success(OrderListResponse {
        orders: orders.into_iter().map(OrderDto::from).collect(),
    })))
}

/// PUT /orders/{id}/status
pub async fn update_order_status(
    State(state): State<Arc<OrderState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    Path(order_id): Path<i32>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if !matches!(identity.role, Role::Manager | Role::Chef) {
        return Err(ApiError::forbidden(
            "You are not authorized to update the order status",
        ));
    }

    let updated = state
        .store
        .update_order_status(order_id, payload.status)
        .await?;
    if updated.is_none() {
        return Err(ApiError::not_found_msg("Order not found"));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Order status updated".to_string(),
    })))
}

/// DELETE /orders/{id}
pub async fn delete_order(
    State(state): State<Arc<OrderState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    Path(order_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if identity.role != Role::Manager {
        return Err(ApiError::forbidden(
            "You are not authorized to delete orders",
        ));
    }

    let deleted = state.store.delete_order(order_id).await?;
    if !deleted {
        return Err(ApiError::not_found_msg("Order not found"));
    }

    tracing::info!("Order {} deleted by manager {}", order_id, identity.id);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Order deleted".to_string(),
    })))
}
