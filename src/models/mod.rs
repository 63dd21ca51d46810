//! # Data Models
//!
//! This module contains all the data models used throughout the leadbook API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod lead;
pub mod user;

pub use lead::Entity as Lead;
pub use lead::{Bhk, City, LeadStatus, PropertyType, Purpose, Source, Timeline};
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "leadbook".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
