//! User repository for database operations

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::user::{self, Entity as User};

/// Repository for user database operations
#[derive(Debug, Clone)]
pub struct UserRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl UserRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>, RepositoryError> {
        User::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Looks a user up by email, ignoring case.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, RepositoryError> {
        User::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Inserts a user with an already-hashed password.
    pub async fn create(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<user::Model, RepositoryError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(RepositoryError::validation_error("email must not be empty"));
        }

        let active = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            name: Set(name.map(str::to_string)),
            password_hash: Set(password_hash.to_string()),
            created_at: Set(Utc::now().into()),
        };

        active
            .insert(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
