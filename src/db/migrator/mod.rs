use sea_orm_migration::prelude::*;

mod m20240101_create_users;
mod m20240102_create_order_tables;

/// Migrations for the auth service's credential store.
pub struct AuthMigrator;

#[async_trait::async_trait]
impl MigratorTrait for AuthMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240101_create_users::Migration)]
    }
}

/// Migrations for the order service's store. Deliberately contains no user
/// table: identity is resolved against the auth service.
pub struct OrderMigrator;

#[async_trait::async_trait]
impl MigratorTrait for OrderMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240102_create_order_tables::Migration)]
    }
}
