//! API key gate for the task routes.
//!
//! Runs on every request. Paths outside the protected task prefixes pass
//! through without touching the credential store. For protected paths the
//! key comes from the `X-API-Key` header or, for POST requests without that
//! header, from the `api_key` field of a JSON body. A valid key attaches an
//! [`ApiKeyContext`] to the request and counts one use.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use hub_core::credentials::{CredentialError, CredentialStore};
use hub_core::models::credentials::KeyOwner;
use hub_core::tasks::registry::TASKS;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::AppState;
use crate::SERVICES_PREFIX;
use crate::error::AppError;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Body field carrying the API key.
pub const API_KEY_FIELD: &str = "api_key";

/// Characters of a key that may appear in logs.
const KEY_LOG_PREFIX_LEN: usize = 8;

/// Largest task request body the gate will buffer.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// How the gate resolved one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Path is not a task route.
    NotProtected,
    /// No key presented.
    Missing,
    /// Key is unknown, rotated away, or deactivated.
    Invalid,
    /// Key is valid and active.
    Authorized(KeyOwner),
}

/// Identity attached to an authorized task request.
#[derive(Debug, Clone)]
pub struct ApiKeyContext {
    pub owner: KeyOwner,
    /// Key as presented.
    pub token: String,
}

impl ApiKeyContext {
    /// Leading characters of the key, safe to log.
    pub fn key_prefix(&self) -> &str {
        let end = self
            .token
            .char_indices()
            .nth(KEY_LOG_PREFIX_LEN)
            .map_or(self.token.len(), |(i, _)| i);
        &self.token[..end]
    }
}

/// Whether `path` is under a task prefix, with or without the services alias.
pub fn is_protected(path: &str) -> bool {
    let path = path
        .strip_prefix(SERVICES_PREFIX)
        .filter(|rest| rest.starts_with('/'))
        .unwrap_or(path);
    TASKS.iter().any(|task| {
        path.strip_prefix('/')
            .and_then(|p| p.strip_prefix(task.kind.slug()))
            .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Resolve a request to an outcome. The store is consulted only when the
/// path is protected and a token is present.
pub async fn evaluate(
    store: &dyn CredentialStore,
    path: &str,
    token: Option<&str>,
) -> Result<GateOutcome, CredentialError> {
    if !is_protected(path) {
        return Ok(GateOutcome::NotProtected);
    }
    let Some(token) = token else {
        return Ok(GateOutcome::Missing);
    };
    match store.validate(token).await {
        Ok(owner) => Ok(GateOutcome::Authorized(owner)),
        Err(CredentialError::InvalidOrInactive) => Ok(GateOutcome::Invalid),
        Err(e) => Err(e),
    }
}

/// Axum middleware enforcing API keys on task routes.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();
    if !is_protected(&path) {
        return Ok(next.run(request).await);
    }

    let header = header_token(request.headers());
    let (token, mut request) = match header {
        Some(token) => (Some(token), request),
        None if request.method() == Method::POST => body_token(request).await?,
        None => (None, request),
    };

    let outcome = evaluate(state.credentials.as_ref(), &path, token.as_deref())
        .await
        .map_err(|e| {
            error!(path = %path, error = %e, "API key lookup failed");
            AppError::DbUnavailable(e.to_string())
        })?;

    match outcome {
        GateOutcome::NotProtected => Ok(next.run(request).await),
        GateOutcome::Missing => {
            debug!(path = %path, "API key missing");
            Err(AppError::MissingApiKey)
        }
        GateOutcome::Invalid => {
            debug!(path = %path, "API key rejected");
            Err(AppError::InvalidApiKey)
        }
        GateOutcome::Authorized(owner) => {
            record_usage(&state.credentials, &owner).await;
            debug!(path = %path, user_id = %owner.user_id, "API key accepted");
            request.extensions_mut().insert(ApiKeyContext {
                owner,
                token: token.unwrap_or_default(),
            });
            Ok(next.run(request).await)
        }
    }
}

/// Usage failures are logged; the request still proceeds.
async fn record_usage(store: &Arc<dyn CredentialStore>, owner: &KeyOwner) {
    if let Err(e) = store.record_usage(owner.credential_id).await {
        warn!(
            user_id = %owner.user_id,
            credential_id = %owner.credential_id,
            error = %e,
            "failed to record API key usage"
        );
    }
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Buffer the body, read `api_key` from it, and rebuild the request.
/// A body that is not a JSON object yields no token.
async fn body_token(request: Request) -> Result<(Option<String>, Request), AppError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::PayloadTooLarge)?;
    let token = token_from_json(&bytes);
    Ok((token, Request::from_parts(parts, Body::from(bytes))))
}

fn token_from_json(bytes: &Bytes) -> Option<String> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    presented_token(value.get(API_KEY_FIELD)?)
}

/// Empty values count as no key. Any other non-string value is passed on
/// in its JSON form so the store rejects it as invalid.
fn presented_token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string),
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(fields) if fields.is_empty() => None,
        other => Some(other.to_string()),
    }
}
