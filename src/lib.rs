//! Turnstile - identity provisioning and session token service
//!
//! Creates accounts with default claims (rolling back partial state on
//! failure), verifies credentials against an Argon2-hashed store with
//! lockout, and mints HS256-signed session tokens carrying the
//! identity's claims. Accounts live in MongoDB, or in memory in dev
//! mode.

pub mod auth;
pub mod config;
pub mod identity;
pub mod routes;
pub mod server;
pub mod store;
pub mod token;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Error, Result};
