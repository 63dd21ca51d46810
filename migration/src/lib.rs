//! Database migrations for the leadbook service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_09_01_000001_create_users;
mod m2025_09_01_000002_create_leads;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_09_01_000001_create_users::Migration),
            Box::new(m2025_09_01_000002_create_leads::Migration),
        ]
    }
}
