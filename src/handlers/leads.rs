//! # Lead API Handlers
//!
//! CRUD, filtered listing and export for the caller's buyer leads.

use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, LeadError};
use crate::export::{export_filename, render_csv};
use crate::handlers::types::{DeleteResponse, LeadListResponse, LeadRequest, LeadResponse};
use crate::listing::ListQuery;
use crate::rate_limit::{ClientIp, Window, WriteQuota, enforce};
use crate::server::AppState;

fn lead_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    // An id that is not a UUID cannot name an existing lead.
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::from(LeadError::NotFound))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value).map_err(ApiError::from)
}

fn list_query(query: Result<Query<ListQuery>, QueryRejection>) -> Result<ListQuery, ApiError> {
    query.map(|Query(query)| query).map_err(ApiError::from)
}

/// List the caller's leads with optional filters
///
/// `export=true` returns up to 10,000 rows in one response and is not
/// subject to the read rate limit.
#[utoipa::path(
    get,
    path = "/leads",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of leads", body = LeadListResponse),
        (status = 400, description = "Invalid filter", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 429, description = "Read rate limit exceeded", body = ApiError),
        (status = 500, description = "Failed to fetch leads", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn list_leads(
    State(state): State<AppState>,
    user: CurrentUser,
    client: ClientIp,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<LeadListResponse>, ApiError> {
    let query = list_query(query)?;

    // Malformed parameters still count against the read window.
    if !query.is_export() {
        enforce(state.rate_limits.read.as_ref(), Window::Read, &client).await?;
    }

    let (filter, page) = query.parse().map_err(LeadError::from)?;
    let page = state.leads.list(user.id, &filter, page).await?;

    Ok(Json(LeadListResponse {
        leads: page.items.into_iter().map(LeadResponse::from).collect(),
        pagination: page.pagination,
    }))
}

/// Download the caller's matching leads as CSV
#[utoipa::path(
    get,
    path = "/leads/export",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "CSV document", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid filter", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 500, description = "Failed to fetch leads", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn export_leads_csv(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let (filter, _) = list_query(query)?.parse().map_err(LeadError::from)?;

    let leads = state.leads.export(user.id, &filter).await?;
    let body = render_csv(&leads).map_err(|err| ApiError::from(anyhow::Error::from(err)))?;

    tracing::info!(rows = leads.len(), "Exported leads as CSV");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    export_filename(Utc::now().date_naive())
                ),
            ),
        ],
        body,
    )
        .into_response())
}

/// Create a lead owned by the caller
#[utoipa::path(
    post,
    path = "/leads",
    security(("bearer_auth" = [])),
    request_body = LeadRequest,
    responses(
        (status = 201, description = "Lead created", body = LeadResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 429, description = "Write rate limit exceeded", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn create_lead(
    State(state): State<AppState>,
    _quota: WriteQuota,
    user: CurrentUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<LeadResponse>), ApiError> {
    let raw = json_body(body)?;
    let created = state.leads.create(user.id, &raw).await?;
    Ok((StatusCode::CREATED, Json(LeadResponse::from(created))))
}

/// Fetch one of the caller's leads
#[utoipa::path(
    get,
    path = "/leads/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Lead id")),
    responses(
        (status = 200, description = "Lead", body = LeadResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Lead belongs to another user", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn get_lead(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<LeadResponse>, ApiError> {
    let id = lead_id(path)?;
    let lead = state.leads.get(user.id, id).await?;
    Ok(Json(LeadResponse::from(lead)))
}

/// Replace every field of one of the caller's leads
#[utoipa::path(
    put,
    path = "/leads/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Lead id")),
    request_body = LeadRequest,
    responses(
        (status = 200, description = "Lead updated", body = LeadResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Lead belongs to another user", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError),
        (status = 429, description = "Write rate limit exceeded", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn update_lead(
    State(state): State<AppState>,
    _quota: WriteQuota,
    user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<LeadResponse>, ApiError> {
    let id = lead_id(path)?;
    let raw = json_body(body)?;
    let updated = state.leads.update(user.id, id, &raw).await?;
    Ok(Json(LeadResponse::from(updated)))
}

/// Permanently delete one of the caller's leads
#[utoipa::path(
    delete,
    path = "/leads/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Lead id")),
    responses(
        (status = 200, description = "Lead deleted", body = DeleteResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Lead belongs to another user", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError),
        (status = 429, description = "Write rate limit exceeded", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn delete_lead(
    State(state): State<AppState>,
    _quota: WriteQuota,
    user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = lead_id(path)?;
    state.leads.delete(user.id, id).await?;
    Ok(Json(DeleteResponse {
        message: "Lead deleted successfully".to_string(),
    }))
}
