use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::users::Role;
use crate::entities::{OrderStatus, dishes};

pub mod migrator;
pub mod repositories;

pub use repositories::dish::{DishChanges, DishError, NewDish};
pub use repositories::order::{CreateOrderError, OrderDetails, OrderItem, OrderItemRequest};
pub use repositories::user::{CreateUserError, NewUser, User};

async fn connect(
    db_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection> {
    if !db_url.contains(":memory:") {
        let path_str = db_url.trim_start_matches("sqlite:");
        if let Some(parent) = Path::new(path_str).parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        if !Path::new(path_str).exists() {
            std::fs::File::create(path_str)?;
        }
    }

    let mut opt = ConnectOptions::new(db_url.to_string());
    opt.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(600))
        .sqlx_logging(false);

    Ok(Database::connect(opt).await?)
}

/// Storage for the account service: user credentials and profiles.
#[derive(Clone)]
pub struct AuthStore {
    pub conn: DatabaseConnection,
}

impl AuthStore {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        let conn = connect(db_url, max_connections, min_connections).await?;

        migrator::AuthMigrator::up(&conn, None).await?;

        info!(
            "Account database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    pub async fn create_user(
        &self,
        new_user: NewUser,
        security: &SecurityConfig,
    ) -> Result<User, CreateUserError> {
        self.user_repo().create(new_user, security).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_email_with_password(email).await
    }

    pub async fn list_users(&self, skip: u64, limit: u64) -> Result<Vec<User>> {
        self.user_repo().list(skip, limit).await
    }

    pub async fn update_user(
        &self,
        id: i32,
        new_password: Option<String>,
        new_role: Option<Role>,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo()
            .update_self(id, new_password, new_role, security)
            .await
    }
}

/// Storage for the ordering service: dishes, orders and order lines. Holds no
/// user rows; identity comes from the account service.
#[derive(Clone)]
pub struct OrderStore {
    pub conn: DatabaseConnection,
}

impl OrderStore {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        let conn = connect(db_url, max_connections, min_connections).await?;

        migrator::OrderMigrator::up(&conn, None).await?;

        info!(
            "Order database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn dish_repo(&self) -> repositories::dish::DishRepository {
        repositories::dish::DishRepository::new(self.conn.clone())
    }

    fn order_repo(&self) -> repositories::order::OrderRepository {
        repositories::order::OrderRepository::new(self.conn.clone())
    }

    pub async fn list_available_dishes(&self) -> Result<Vec<dishes::Model>> {
        self.dish_repo().list_available().await
    }

    pub async fn list_all_dishes(&self) -> Result<Vec<dishes::Model>> {
        self.dish_repo().list_all().await
    }

    pub async fn get_dish(&self, id: i32) -> Result<Option<dishes::Model>> {
        self.dish_repo().get_by_id(id).await
    }

    pub async fn create_dish(&self, new_dish: NewDish) -> Result<dishes::Model, DishError> {
        self.dish_repo().create(new_dish).await
    }

    pub async fn update_dish(
        &self,
        id: i32,
        changes: DishChanges,
    ) -> Result<dishes::Model, DishError> {
        self.dish_repo().update(id, changes).await
    }

    pub async fn delete_dish(&self, id: i32) -> Result<bool> {
        self.dish_repo().delete(id).await
    }

    pub async fn create_order(
        &self,
        user_id: i32,
        special_requests: String,
        items: &[OrderItemRequest],
    ) -> Result<OrderDetails, CreateOrderError> {
        self.order_repo()
            .create(user_id, special_requests, items)
            .await
    }

    pub async fn get_order(&self, id: i32) -> Result<Option<OrderDetails>> {
        self.order_repo().get_by_id(id).await
    }

    pub async fn list_orders(&self) -> Result<Vec<OrderDetails>> {
        self.order_repo().list_all().await
    }

    pub async fn list_orders_for_user(&self, user_id: i32) -> Result<Vec<OrderDetails>> {
        self.order_repo().list_for_user(user_id).await
    }

    pub async fn update_order_status(
        &self,
        id: i32,
        status: OrderStatus,
    ) -> Result<Option<crate::entities::orders::Model>> {
        self.order_repo().update_status(id, status).await
    }

    pub async fn delete_order(&self, id: i32) -> Result<bool> {
        self.order_repo().delete(id).await
    }

    pub async fn sweep_order_status(&self, from: OrderStatus, to: OrderStatus) -> Result<u64> {
        self.order_repo().sweep_status(from, to).await
    }
}
