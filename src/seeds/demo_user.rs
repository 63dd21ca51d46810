//! Demo user seeding
//!
//! Creates the well-known demo account so a fresh installation can be
//! signed into immediately.

use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::crypto::hash_password;
use crate::models::user;
use crate::repositories::UserRepository;

pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "password123";
pub const DEMO_NAME: &str = "Demo User";

/// Ensures the demo user exists
///
/// An existing account is returned untouched, including its password.
pub async fn seed_demo_user(db: &DatabaseConnection) -> Result<user::Model> {
    let repo = UserRepository::new(Arc::new(db.clone()));

    if let Some(existing) = repo
        .find_by_email(DEMO_EMAIL)
        .await
        .context("looking up demo user")?
    {
        log::info!("Demo user '{}' already exists, skipping", DEMO_EMAIL);
        return Ok(existing);
    }

    let password_hash = hash_password(DEMO_PASSWORD).context("hashing demo password")?;
    let created = repo
        .create(DEMO_EMAIL, Some(DEMO_NAME), &password_hash)
        .await
        .context("creating demo user")?;

    log::info!("Created demo user '{}'", DEMO_EMAIL);
    Ok(created)
}
