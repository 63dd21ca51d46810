//! # Authentication
//!
//! Bearer session tokens for protected routes and the email/password
//! sign-in flow that issues them.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use sea_orm::DatabaseConnection;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::crypto::{CryptoError, IssuedToken, SessionKeys, verify_password};
use crate::error::{ApiError, RepositoryError, unauthorized};
use crate::models::user;
use crate::repositories::UserRepository;
use crate::server::AppState;

const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

/// Identity bound to a request by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

impl FromRef<AppState> for Arc<SessionKeys> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.sessions)
    }
}

/// Authentication middleware that validates the bearer session token
pub async fn auth_middleware(
    State(sessions): State<Arc<SessionKeys>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;

    let claims = sessions.verify(token).map_err(|err| {
        tracing::debug!(error = %err, "Rejected session token");
        unauthorized(Some(UNAUTHORIZED_MESSAGE))
    })?;

    tracing::debug!(user_id = %claims.sub, "Authenticated request");
    request.extensions_mut().insert(CurrentUser {
        id: claims.sub,
        email: claims.email,
    });

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized(Some(UNAUTHORIZED_MESSAGE)))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| unauthorized(Some(UNAUTHORIZED_MESSAGE)))
    }
}

/// Sign-in failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => unauthorized(Some(INVALID_CREDENTIALS_MESSAGE)),
            AuthError::Repository(RepositoryError::Database(err)) => ApiError::from(err),
            other => ApiError::from(anyhow::Error::from(other)),
        }
    }
}

/// Result of a successful sign-in
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: user::Model,
    pub token: IssuedToken,
}

/// Checks credentials and issues a session token.
///
/// Unknown emails and wrong passwords fail identically.
pub async fn sign_in(
    db: Arc<DatabaseConnection>,
    sessions: &SessionKeys,
    email: &str,
    password: &str,
) -> Result<SignedIn, AuthError> {
    let users = UserRepository::new(db);
    let Some(user) = users.find_by_email(email).await? else {
        tracing::info!("Sign-in rejected: unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Sign-in rejected: wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = sessions.issue(user.id, &user.email)?;
    tracing::info!(user_id = %user.id, "User signed in");

    Ok(SignedIn { user, token })
}
