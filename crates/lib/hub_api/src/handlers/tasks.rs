//! Task endpoints. One handler serves every task through its descriptor.

use axum::body::Bytes;
use axum::extract::State;
use axum::{Extension, Json};
use hub_core::tasks::dispatch;
use hub_core::tasks::registry::TaskDescriptor;
use serde_json::Value;
use tracing::debug;

use super::parse_json_body;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::api_key::ApiKeyContext;

/// `POST /{task}/` and `POST /api/services/{task}/`.
pub async fn task_handler(
    task: &'static TaskDescriptor,
    State(state): State<AppState>,
    Extension(caller): Extension<ApiKeyContext>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let payload = parse_json_body(&body)?;
    debug!(
        task = %task.kind,
        user_id = %caller.owner.user_id,
        key = caller.key_prefix(),
        "dispatching task"
    );
    let result = dispatch(
        state.generator.as_ref(),
        task,
        &payload,
        state.config.task_timeout(),
    )
    .await?;
    Ok(Json(result))
}
