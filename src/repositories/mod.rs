//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for users
//! and leads. Failures surface as [`RepositoryError`](crate::error::RepositoryError).

pub mod lead;
pub mod user;

pub use lead::LeadRepository;
pub use user::UserRepository;
