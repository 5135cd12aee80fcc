//! Password hashing for Turnstile
//!
//! The hashing primitive lives behind the account store boundary; no
//! other component reads or writes password material.

pub mod password;

pub use password::{hash_password, verify_password};
