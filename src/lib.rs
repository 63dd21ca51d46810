//! # Leadbook API Library
//!
//! Buyer-lead management for real-estate agents: validated lead records,
//! owner-scoped filtered listing, CSV export, session authentication and
//! per-client rate limiting.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod export;
pub mod handlers;
pub mod leads;
pub mod listing;
pub mod models;
pub mod rate_limit;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub mod validation;
pub use migration;
