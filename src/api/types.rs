use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::{OrderDetails, User};
use crate::entities::users::Role;
use crate::entities::{OrderStatus, dishes};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Account service
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfoResponse {
    pub user_id: i32,
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

const fn default_role() -> Role {
    Role::Customer
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_list_limit")]
    pub limit: u64,
}

const fn default_list_limit() -> u64 {
    100
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// ============================================================================
// Ordering service
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DishDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

impl From<dishes::Model> for DishDto {
    fn from(dish: dishes::Model) -> Self {
        Self {
            id: dish.id,
            name: dish.name,
            description: dish.description,
            price: dish.price,
            quantity: dish.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DishListResponse {
    pub dishes: Vec<DishDto>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDishRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDishRequest {
    pub name: Option<String>,
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

/// Distinguishes an absent field from an explicit null so a description can
/// be cleared with `"description": null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Deserialize::deserialize(de).map(Some)
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    pub dish_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub dishes: Vec<OrderLineRequest>,
    #[serde(default)]
    pub special_requests: String,
}

#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: i32,
}

#[derive(Debug, Serialize)]
pub struct OrderLineDto {
    pub dish_id: i32,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderDto {
    pub id: i32,
    pub user_id: i32,
    pub status: OrderStatus,
    pub special_requests: String,
    pub dishes: Vec<OrderLineDto>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<OrderDetails> for OrderDto {
    fn from(details: OrderDetails) -> Self {
        Self {
            id: details.order.id,
            user_id: details.order.user_id,
            status: details.order.status,
            special_requests: details.order.special_requests,
            dishes: details
                .items
                .into_iter()
                .map(|item| OrderLineDto {
                    dish_id: item.dish_id,
                    name: item.name,
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
            created_at: details.order.created_at,
            updated_at: details.order.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderDto>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}
