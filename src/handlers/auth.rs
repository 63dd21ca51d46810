//! # Auth API Handlers

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};

use crate::auth::sign_in as authenticate;
use crate::error::ApiError;
use crate::handlers::types::{SignInRequest, SignInResponse, UserSummary};
use crate::server::AppState;

/// Exchange email and password for a bearer session token
#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 400, description = "Malformed body", body = ApiError),
        (status = 401, description = "Invalid email or password", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<SignInResponse>, ApiError> {
    let Json(request) = body?;

    let signed_in =
        authenticate(state.db.clone(), &state.sessions, &request.email, &request.password).await?;

    Ok(Json(SignInResponse {
        token: signed_in.token.token,
        token_type: "Bearer".to_string(),
        expires_in: signed_in.token.expires_in,
        user: UserSummary {
            id: signed_in.user.id,
            email: signed_in.user.email,
            name: signed_in.user.name,
        },
    }))
}
