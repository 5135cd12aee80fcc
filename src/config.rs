//! Configuration for Turnstile
//!
//! CLI arguments and environment variable handling using clap. Loaded
//! once at startup; the signing configuration is immutable thereafter.

use clap::Parser;
use std::net::SocketAddr;

use crate::token::MIN_SECRET_BYTES;

/// Turnstile - identity and session token service
#[derive(Parser, Debug, Clone)]
#[command(name = "turnstile")]
#[command(about = "Identity provisioning and session token service")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "turnstile")]
    pub mongodb_db: String,

    /// Secret for session token signing (required in production)
    #[arg(long, env = "TOKEN_SECRET")]
    pub token_secret: Option<String>,

    /// Issuer asserted in session tokens
    #[arg(long, env = "TOKEN_ISSUER", default_value = "turnstile")]
    pub token_issuer: String,

    /// Audience asserted in session tokens
    #[arg(long, env = "TOKEN_AUDIENCE", default_value = "services")]
    pub token_audience: String,

    /// Session token lifetime in minutes
    #[arg(long, env = "TOKEN_LIFETIME_MINUTES", default_value = "5")]
    pub token_lifetime_minutes: i64,

    /// Enable development mode (in-memory account store, insecure default secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get the effective signing secret. Dev mode falls back to a fixed
    /// insecure value; production with no secret is an error.
    pub fn token_secret(&self) -> Result<String, String> {
        match (&self.token_secret, self.dev_mode) {
            (Some(secret), _) => Ok(secret.clone()),
            (None, true) => Ok("dev-only-insecure-secret-0123456789abcdef".to_string()),
            (None, false) => Err("TOKEN_SECRET is required in production mode".to_string()),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.token_secret {
                None => return Err("TOKEN_SECRET is required in production mode".to_string()),
                Some(secret) if secret.len() < MIN_SECRET_BYTES => {
                    return Err(format!(
                        "TOKEN_SECRET must be at least {MIN_SECRET_BYTES} characters"
                    ))
                }
                _ => {}
            }
        }

        if self.token_lifetime_minutes <= 0 {
            return Err("TOKEN_LIFETIME_MINUTES must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            listen: "127.0.0.1:8080".parse().unwrap(),
            mongodb_uri: "mongodb://localhost:27017".into(),
            mongodb_db: "turnstile".into(),
            token_secret: Some("test-secret-that-is-at-least-32-characters-long".into()),
            token_issuer: "Issuer".into(),
            token_audience: "Audience".into(),
            token_lifetime_minutes: 5,
            dev_mode: false,
            log_level: "info".into(),
        }
    }

    #[test]
    fn test_valid_production_config() {
        assert!(base_args().validate().is_ok());
    }

    #[test]
    fn test_missing_secret_rejected_in_production() {
        let mut args = base_args();
        args.token_secret = None;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut args = base_args();
        args.token_secret = Some("short".into());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_dev_mode_allows_missing_secret() {
        let mut args = base_args();
        args.token_secret = None;
        args.dev_mode = true;
        assert!(args.validate().is_ok());
        assert!(args.token_secret().unwrap().len() >= MIN_SECRET_BYTES);
    }

    #[test]
    fn test_missing_secret_is_an_error_not_a_panic() {
        let mut args = base_args();
        args.token_secret = None;
        assert!(args.token_secret().is_err());
    }

    #[test]
    fn test_configured_secret_wins_over_dev_fallback() {
        let mut args = base_args();
        args.dev_mode = true;
        assert_eq!(
            args.token_secret().unwrap(),
            "test-secret-that-is-at-least-32-characters-long"
        );
    }

    #[test]
    fn test_non_positive_lifetime_rejected() {
        let mut args = base_args();
        args.token_lifetime_minutes = 0;
        assert!(args.validate().is_err());
    }
}
