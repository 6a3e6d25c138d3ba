//! Account Service Library
//!
//! User registration, login, profile, password change, and account deletion
//! behind JWT bearer authentication. The binary in `main.rs` wires these
//! modules together; integration tests drive `routes::build_router` directly.

pub mod auth;
pub mod config;
pub mod middleware;
pub mod routes;
