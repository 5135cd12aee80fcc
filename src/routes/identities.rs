//! Identity endpoints
//!
//! - POST /identities          - create a new identity
//! - GET  /identities/{userId} - fetch the public projection

use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::routes::{
    cors_preflight, error_response, json_response, parse_json_body, BoxBody, ErrorResponse,
};
use crate::server::AppState;
use crate::types::Error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdentityRequest {
    pub username: String,
    pub password: String,
    #[serde(default = "default_created_by")]
    pub created_by: String,
}

fn default_created_by() -> String {
    "SYSTEM".to_string()
}

/// Dispatch /identities requests; `None` for other prefixes.
pub async fn handle_identities_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    if !path.starts_with("/identities") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path).to_string();

    let response = match (req.method().clone(), path.as_str()) {
        (Method::POST, "/identities") => handle_create(req, state).await,
        (Method::GET, p) if p.starts_with("/identities/") => {
            let user_id = p.trim_start_matches("/identities/").to_string();
            handle_get(state, &user_id).await
        }
        (_, "/identities") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
            },
        ),
        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Identity endpoint not found".into(),
            },
        ),
    };

    Some(response)
}

async fn handle_create(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: CreateIdentityRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    match state
        .identities
        .create(&body.username, &body.password, &body.created_by)
        .await
    {
        Ok(view) => json_response(StatusCode::CREATED, &view),
        Err(e) => error_response(e),
    }
}

async fn handle_get(state: Arc<AppState>, user_id: &str) -> Response<BoxBody> {
    let user_id = match Uuid::parse_str(user_id) {
        Ok(id) => id,
        Err(_) => return error_response(Error::Validation("Invalid userId".into())),
    };

    match state.identities.get_by_user_id(user_id).await {
        Ok(view) => json_response(StatusCode::OK, &view),
        Err(e) => error_response(e),
    }
}
