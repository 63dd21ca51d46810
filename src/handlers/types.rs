//! # API Types
//!
//! Request and response bodies shared by the lead and auth handlers.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::listing::Pagination;
use crate::models::{Bhk, City, LeadStatus, PropertyType, Purpose, Source, Timeline, user};
use crate::repositories::lead::LeadWithOwner;

/// Public view of the user who owns a lead
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OwnerSummary {
    pub name: Option<String>,
    pub email: String,
}

impl From<&user::Model> for OwnerSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Buyer lead as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub city: City,
    pub property_type: PropertyType,
    pub bhk: Option<Bhk>,
    pub purpose: Purpose,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub timeline: Timeline,
    pub source: Source,
    pub status: LeadStatus,
    pub notes: Option<String>,
    /// Comma-separated, empty when none
    pub tags: String,
    pub owner_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerSummary>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<LeadWithOwner> for LeadResponse {
    fn from((lead, owner): LeadWithOwner) -> Self {
        Self {
            id: lead.id,
            full_name: lead.full_name,
            email: lead.email,
            phone: lead.phone,
            city: lead.city,
            property_type: lead.property_type,
            bhk: lead.bhk,
            purpose: lead.purpose,
            budget_min: lead.budget_min,
            budget_max: lead.budget_max,
            timeline: lead.timeline,
            source: lead.source,
            status: lead.status,
            notes: lead.notes,
            tags: lead.tags,
            owner_id: lead.owner_id,
            owner: owner.as_ref().map(OwnerSummary::from),
            created_at: lead.created_at,
            updated_at: lead.updated_at,
        }
    }
}

/// Lead submission body, documented for OpenAPI.
///
/// The handlers accept any JSON object and validate it field by field, so
/// budgets may also arrive as numeric strings and empty strings mean absent.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadRequest {
    /// 2 to 80 characters
    pub full_name: String,
    /// Valid address or empty
    pub email: Option<String>,
    /// 10 to 15 characters
    pub phone: String,
    pub city: City,
    pub property_type: PropertyType,
    /// Required for APARTMENT and VILLA
    pub bhk: Option<Bhk>,
    pub purpose: Purpose,
    pub budget_min: Option<i64>,
    /// Must be at least `budgetMin` when both are given
    pub budget_max: Option<i64>,
    pub timeline: Timeline,
    pub source: Source,
    /// Defaults to NEW
    pub status: Option<LeadStatus>,
    /// At most 1000 characters
    pub notes: Option<String>,
    pub tags: Option<String>,
}

/// One page (or an export) of the caller's leads
#[derive(Debug, Serialize, ToSchema)]
pub struct LeadListResponse {
    pub leads: Vec<LeadResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
}

/// Sign-in credentials
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

/// Issued session token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignInResponse {
    pub token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
