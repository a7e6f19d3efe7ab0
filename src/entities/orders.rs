use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning user. Not a foreign key: user rows live in the auth service's
    /// database, not here.
    pub user_id: i32,

    pub status: OrderStatus,

    pub special_requests: String,

    pub created_at: String,

    pub updated_at: String,
}

/// Linear lifecycle pending -> in_progress -> completed, advanced by the
/// background driver. Cancelled is a defined terminal state but the driver
/// never produces it.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,

    #[sea_orm(string_value = "in_progress")]
    InProgress,

    #[sea_orm(string_value = "completed")]
    Completed,

    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_dishes::Entity")]
    OrderDishes,
}

impl Related<super::order_dishes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDishes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
