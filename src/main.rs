//! Turnstile - identity provisioning and session token service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use turnstile::{
    config::Args,
    server,
    store::{AccountStore, MemoryAccountStore, MongoAccountStore, MongoClient},
    token::TokenOptions,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("turnstile={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Turnstile - Identity Service");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("Token issuer: {}", args.token_issuer);
    info!("Token audience: {}", args.token_audience);
    info!("Token lifetime: {} minute(s)", args.token_lifetime_minutes);
    if !args.dev_mode {
        info!("MongoDB: {}", args.mongodb_uri);
    }
    info!("======================================");

    // Choose the account store: MongoDB in production, memory in dev mode
    let (store, mongo): (Arc<dyn AccountStore>, Option<MongoClient>) = if args.dev_mode {
        warn!("Development mode enabled - using in-memory account store");
        (Arc::new(MemoryAccountStore::new()), None)
    } else {
        let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(client) => client,
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        };

        let store = match MongoAccountStore::new(&mongo).await {
            Ok(store) => store,
            Err(e) => {
                error!("Failed to initialize account collection: {}", e);
                std::process::exit(1);
            }
        };

        (Arc::new(store), Some(mongo))
    };

    let secret = match args.token_secret() {
        Ok(secret) => secret,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let options = match TokenOptions::new(
        secret,
        args.token_issuer.clone(),
        args.token_audience.clone(),
        args.token_lifetime_minutes,
    ) {
        Ok(options) => options,
        Err(e) => {
            error!("Token configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(server::AppState::new(args, store, options, mongo));

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
