//! Session endpoint
//!
//! POST /sessions - authorize a credential pair and mint a session token

use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::routes::{
    cors_preflight, error_response, json_response, parse_json_body, BoxBody, ErrorResponse,
};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub username: String,
    pub access_token: String,
}

/// Dispatch /sessions requests; `None` for other prefixes.
pub async fn handle_sessions_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    if !path.starts_with("/sessions") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path).to_string();

    let response = match (req.method().clone(), path.as_str()) {
        (Method::POST, "/sessions") => handle_create(req, state).await,
        (_, "/sessions") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
            },
        ),
        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Session endpoint not found".into(),
            },
        ),
    };

    Some(response)
}

async fn handle_create(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: CreateSessionRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let identity = match state
        .identities
        .authorize(&body.username, &body.password)
        .await
    {
        Ok(identity) => identity,
        Err(e) => return error_response(e),
    };

    let access_token = match state.tokens.create(&identity).await {
        Ok(token) => token,
        Err(e) => return error_response(e),
    };

    json_response(
        StatusCode::OK,
        &SessionResponse {
            user_id: identity.user_id,
            username: identity.username,
            access_token,
        },
    )
}
