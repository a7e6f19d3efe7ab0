use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "dishes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    pub description: Option<String>,

    /// Unit price, non-negative.
    pub price: Decimal,

    /// Units in stock. Decremented with a conditional update when an order
    /// is placed; must never go negative.
    pub quantity: i32,
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
