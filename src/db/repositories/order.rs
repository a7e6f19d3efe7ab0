use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use thiserror::Error;

use crate::entities::{OrderStatus, dishes, order_dishes, orders};

/// One line of an incoming order request.
#[derive(Debug, Clone, Copy)]
pub struct OrderItemRequest {
    pub dish_id: i32,
    pub quantity: i32,
}

/// A stored order line joined with its dish name.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub dish_id: i32,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: orders::Model,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Error)]
pub enum CreateOrderError {
    #[error("Dish with ID {0} is not available")]
    DishUnavailable(i32),

    #[error("Only {available} {name} available")]
    InsufficientStock { name: String, available: i32 },

    #[error(transparent)]
    Db(#[from] DbErr),
}

pub struct OrderRepository {
    conn: DatabaseConnection,
}

impl OrderRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create an order and reserve stock for every line in one transaction.
    ///
    /// Each dish's quantity is decremented with a conditional update that only
    /// matches while enough stock remains, so two concurrent orders can never
    /// both take the last unit. Any failed line rolls the whole order back.
    pub async fn create(
        &self,
        user_id: i32,
        special_requests: String,
        items: &[OrderItemRequest],
    ) -> Result<OrderDetails, CreateOrderError> {
        let txn = self.conn.begin().await?;
        let now = chrono::Utc::now().to_rfc3339();

        let order = orders::ActiveModel {
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending),
            special_requests: Set(special_requests),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let Some(dish) = dishes::Entity::find_by_id(item.dish_id).one(&txn).await? else {
                return Err(CreateOrderError::DishUnavailable(item.dish_id));
            };

            let reserved = dishes::Entity::update_many()
                .col_expr(
                    dishes::Column::Quantity,
                    Expr::col(dishes::Column::Quantity).sub(item.quantity),
                )
                .filter(dishes::Column::Id.eq(item.dish_id))
                .filter(dishes::Column::Quantity.gte(item.quantity))
                .exec(&txn)
                .await?;

            if reserved.rows_affected == 0 {
                // Dropping the transaction rolls back earlier reservations.
                return Err(CreateOrderError::InsufficientStock {
                    name: dish.name,
                    available: dish.quantity,
                });
            }

            order_dishes::ActiveModel {
                order_id: Set(order.id),
                dish_id: Set(item.dish_id),
                quantity: Set(item.quantity),
                price: Set(dish.price),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            lines.push(OrderItem {
                dish_id: item.dish_id,
                name: dish.name,
                quantity: item.quantity,
                price: dish.price,
            });
        }

        txn.commit().await?;

        Ok(OrderDetails { order, items: lines })
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<OrderDetails>> {
        let Some(order) = orders::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query order by ID")?
        else {
            return Ok(None);
        };

        let items = self.load_items(&order).await?;
        Ok(Some(OrderDetails { order, items }))
    }

    pub async fn list_all(&self) -> Result<Vec<OrderDetails>> {
        let orders = orders::Entity::find()
            .order_by_asc(orders::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list orders")?;

        self.with_items(orders).await
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<OrderDetails>> {
        let orders = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_asc(orders::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list orders for user")?;

        self.with_items(orders).await
    }

    pub async fn update_status(
        &self,
        id: i32,
        status: OrderStatus,
    ) -> Result<Option<orders::Model>> {
        let Some(order) = orders::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query order for status update")?
        else {
            return Ok(None);
        };

        let mut active: orders::ActiveModel = order.into();
        active.status = Set(status);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update order status")?;

        Ok(Some(updated))
    }

    /// Delete an order together with its lines; returns false when no row
    /// matched.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await.context("Failed to open transaction")?;

        order_dishes::Entity::delete_many()
            .filter(order_dishes::Column::OrderId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete order lines")?;

        let result = orders::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .context("Failed to delete order")?;

        txn.commit().await.context("Failed to commit delete")?;

        Ok(result.rows_affected > 0)
    }

    /// Advance every order in `from` to `to` in one statement. Returns the
    /// number of orders moved.
    pub async fn sweep_status(&self, from: OrderStatus, to: OrderStatus) -> Result<u64> {
        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(to))
            .col_expr(
                orders::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(orders::Column::Status.eq(from))
            .exec(&self.conn)
            .await
            .context("Failed to sweep order statuses")?;

        Ok(result.rows_affected)
    }

    async fn with_items(&self, orders: Vec<orders::Model>) -> Result<Vec<OrderDetails>> {
        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.load_items(&order).await?;
            details.push(OrderDetails { order, items });
        }
        Ok(details)
    }

    async fn load_items(&self, order: &orders::Model) -> Result<Vec<OrderItem>> {
        let lines = order_dishes::Entity::find()
            .filter(order_dishes::Column::OrderId.eq(order.id))
            .find_also_related(dishes::Entity)
            .all(&self.conn)
            .await
            .context("Failed to load order lines")?;

        Ok(lines
            .into_iter()
            .map(|(line, dish)| OrderItem {
                dish_id: line.dish_id,
                name: dish.map(|d| d.name).unwrap_or_default(),
                quantity: line.quantity,
                price: line.price,
            })
            .collect())
    }
}
