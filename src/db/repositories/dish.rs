use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use thiserror::Error;

use crate::entities::dishes;

#[derive(Debug, Clone)]
pub struct NewDish {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default)]
pub struct DishChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Error)]
pub enum DishError {
    #[error("Dish with the provided name already exists")]
    NameTaken,

    #[error("Dish not found")]
    NotFound,

    #[error(transparent)]
    Db(#[from] DbErr),
}

pub struct DishRepository {
    conn: DatabaseConnection,
}

impl DishRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Menu view: only dishes that are currently in stock.
    pub async fn list_available(&self) -> Result<Vec<dishes::Model>> {
        dishes::Entity::find()
            .filter(dishes::Column::Quantity.gt(0))
            .order_by_asc(dishes::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list available dishes")
    }

    pub async fn list_all(&self) -> Result<Vec<dishes::Model>> {
        dishes::Entity::find()
            .order_by_asc(dishes::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list dishes")
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<dishes::Model>> {
        dishes::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query dish by ID")
    }

    pub async fn create(&self, new_dish: NewDish) -> Result<dishes::Model, DishError> {
        let name_taken = dishes::Entity::find()
            .filter(dishes::Column::Name.eq(&new_dish.name))
            .count(&self.conn)
            .await?;
        if name_taken > 0 {
            return Err(DishError::NameTaken);
        }

        let active = dishes::ActiveModel {
            name: Set(new_dish.name),
            description: Set(new_dish.description),
            price: Set(new_dish.price),
            quantity: Set(new_dish.quantity),
            ..Default::default()
        };

        Ok(active.insert(&self.conn).await?)
    }

    pub async fn update(&self, id: i32, changes: DishChanges) -> Result<dishes::Model, DishError> {
        let dish = dishes::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or(DishError::NotFound)?;

        if let Some(name) = &changes.name
            && *name != dish.name
        {
            let name_taken = dishes::Entity::find()
                .filter(dishes::Column::Name.eq(name))
                .filter(dishes::Column::Id.ne(id))
                .count(&self.conn)
                .await?;
            if name_taken > 0 {
                return Err(DishError::NameTaken);
            }
        }

        let mut active: dishes::ActiveModel = dish.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        if let Some(quantity) = changes.quantity {
            active.quantity = Set(quantity);
        }

        Ok(active.update(&self.conn).await?)
    }

    /// Delete a dish; returns false when no row matched.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = dishes::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete dish")?;

        Ok(result.rows_affected > 0)
    }
}
