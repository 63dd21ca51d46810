//! Database seeding functionality
//!
//! Seeds data a fresh installation needs to be usable. Every seeder is
//! idempotent and safe to run at each startup.

pub mod demo_user;

pub use demo_user::{DEMO_EMAIL, DEMO_NAME, DEMO_PASSWORD, seed_demo_user};
