//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection. Routing is a
//! plain path-prefix dispatch; each route module owns everything under
//! its prefix.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::identity::IdentityManager;
use crate::routes::{self, BoxBody, ErrorResponse};
use crate::store::{AccountStore, MongoClient};
use crate::token::{TokenIssuer, TokenOptions};
use crate::types::Error;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Present when backed by MongoDB; `None` for the in-memory store
    pub mongo: Option<MongoClient>,
    pub identities: IdentityManager,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(
        args: Args,
        store: Arc<dyn AccountStore>,
        options: TokenOptions,
        mongo: Option<MongoClient>,
    ) -> Self {
        Self {
            args,
            mongo,
            identities: IdentityManager::new(store.clone()),
            tokens: TokenIssuer::new(store, options),
        }
    }
}

/// Run the HTTP server until the process is stopped
pub async fn run(state: Arc<AppState>) -> Result<(), Error> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Turnstile listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - accounts are held in memory only");
    }

    serve(state, listener).await
}

/// Serve connections on an already-bound listener
pub async fn serve(state: Arc<AppState>, listener: TcpListener) -> Result<(), Error> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(routes::cors_preflight());
    }

    if path == "/health" || path == "/healthz" {
        return Ok(routes::health_check(&state));
    }

    if path == "/ready" || path == "/readyz" {
        return Ok(routes::readiness_check(state).await);
    }

    if path.starts_with("/identities") {
        if let Some(response) = routes::handle_identities_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found(&path));
    }

    if path.starts_with("/sessions") {
        if let Some(response) = routes::handle_sessions_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found(&path));
    }

    Ok(not_found(&path))
}

fn not_found(path: &str) -> Response<BoxBody> {
    routes::json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("Not found: {path}"),
        },
    )
}
