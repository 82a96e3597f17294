//! API key lifecycle handlers for the signed-in account.

use axum::Json;
use axum::extract::State;
use hub_core::credentials::CredentialError;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AccountInfo, ApiKeyInfo, DashboardResponse, RegenerateResponse};
use crate::services::auth::ensure_api_key;

/// `GET /dashboard/`: the account and its API key, created on first view.
pub async fn dashboard_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<DashboardResponse>> {
    let account = hub_core::auth::queries::get_user_by_id(&state.pool, &user.0.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    let (api_key, warning) = ensure_api_key(state.credentials.as_ref(), &account.id).await;
    Ok(Json(DashboardResponse {
        user: AccountInfo {
            id: account.id,
            username: account.username,
            email: account.email,
        },
        api_key: api_key.map(ApiKeyInfo::from),
        warning,
    }))
}

/// `POST /regenerate-api-key/`: rotate the key, or create one if absent.
pub async fn regenerate_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<RegenerateResponse>> {
    let user_id = user.0.sub.as_str();
    let (credential, message) = match state.credentials.rotate(user_id).await {
        Ok(credential) => (credential, "API key regenerated successfully!"),
        Err(CredentialError::NotFound) => {
            let (credential, _) = state.credentials.get_or_create(user_id).await?;
            (credential, "API key created successfully!")
        }
        Err(e) => return Err(e.into()),
    };
    info!(user_id, "API key regenerated");
    Ok(Json(RegenerateResponse {
        success: true,
        new_key: credential.key,
        message: message.to_string(),
    }))
}

/// `POST /api-key/deactivate/`: stop the key from authorizing requests.
pub async fn deactivate_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiKeyInfo>> {
    let credential = state.credentials.set_active(&user.0.sub, false).await?;
    Ok(Json(credential.into()))
}

/// `POST /api-key/activate/`: allow a deactivated key again.
pub async fn activate_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiKeyInfo>> {
    let credential = state.credentials.set_active(&user.0.sub, true).await?;
    Ok(Json(credential.into()))
}
