//! Test utilities for database and router testing.
//!
//! Every helper works against an in-memory SQLite database with all
//! migrations applied, so tests never need a running Postgres.

#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use leadbook::{
    config::AppConfig,
    crypto::hash_password,
    models::user,
    repositories::UserRepository,
    server::{AppState, create_app},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "correct horse battery";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Inserts a user whose password is [`TEST_PASSWORD`].
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    let repo = UserRepository::new(Arc::new(db.clone()));
    let hash = hash_password(TEST_PASSWORD)?;
    Ok(repo.create(email, Some("Test Agent"), &hash).await?)
}

/// Development config with write limits high enough for bulk fixture creation.
pub fn relaxed_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.rate_limit.write_per_minute = 1_000;
    config.rate_limit.read_per_minute = 1_000;
    config
}

/// Router plus the state behind it, so tests can mint tokens.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Result<Self> {
        let state = AppState::new(config, db)?;
        Ok(Self {
            router: create_app(state.clone()),
            state,
        })
    }

    /// Bearer token for `user`.
    pub fn token_for(&self, user: &user::Model) -> String {
        self.state
            .sessions
            .issue(user.id, &user.email)
            .expect("token issues")
            .token
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Sends a JSON request as `token` and returns status plus parsed body.
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (axum::http::StatusCode, Value) {
        let response = self.send(build_request(method, uri, token, body)).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response is JSON")
        };
        (status, value)
    }
}

pub fn build_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

/// A valid lead submission; override fields with [`with`].
pub fn lead_body(full_name: &str) -> Value {
    json!({
        "fullName": full_name,
        "email": "buyer@example.com",
        "phone": "9876543210",
        "city": "CHANDIGARH",
        "propertyType": "APARTMENT",
        "bhk": "TWO",
        "purpose": "BUY",
        "budgetMin": 5_000_000,
        "budgetMax": 7_500_000,
        "timeline": "ZERO_TO_THREE_MONTHS",
        "source": "WEBSITE",
        "notes": "Prefers a corner unit",
        "tags": "hot,family"
    })
}

/// Returns `body` with each `(key, value)` pair overwritten.
pub fn with(mut body: Value, overrides: &[(&str, Value)]) -> Value {
    if let Some(object) = body.as_object_mut() {
        for (key, value) in overrides {
            object.insert((*key).to_string(), value.clone());
        }
    }
    body
}

/// Returns `body` with `keys` removed.
pub fn without(mut body: Value, keys: &[&str]) -> Value {
    if let Some(object) = body.as_object_mut() {
        for key in keys {
            object.remove(*key);
        }
    }
    body
}
