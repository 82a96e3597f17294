//! Task dispatch: validate, render, complete, shape.
//!
//! Every task goes through [`dispatch`] with its [`TaskDescriptor`]. The
//! generator is called at most once per request, and only after the payload
//! validates.

pub mod registry;
pub mod schema;
pub mod template;

use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{LlmError, TextGenerator};

pub use registry::{FailureResponse, TaskDescriptor, TaskKind, by_slug, descriptor};
pub use schema::FieldErrors;

/// Failure of one task request.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("invalid task payload")]
    Invalid(FieldErrors),

    #[error("{message}")]
    Upstream {
        message: &'static str,
        #[source]
        source: LlmError,
    },

    #[error("{message}")]
    ModelUnavailable {
        message: &'static str,
        #[source]
        source: LlmError,
    },
}

/// Run one task against `generator`.
///
/// The completion is bounded by `timeout` in addition to any limit the
/// generator applies itself.
pub async fn dispatch(
    generator: &dyn TextGenerator,
    task: &TaskDescriptor,
    payload: &Value,
    timeout: Duration,
) -> Result<Value, TaskError> {
    let input = schema::validate(task.fields, payload).map_err(TaskError::Invalid)?;
    let prompt = (task.render)(&input);

    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, generator.complete(&prompt.text, &prompt.params))
        .await
        .unwrap_or(Err(LlmError::Timeout(timeout)));

    let reply = match outcome {
        Ok(reply) => reply,
        Err(source) => {
            warn!(
                task = %task.kind,
                model = generator.model(),
                error = %source,
                "text generation failed"
            );
            return Err(match task.map_failure(&source) {
                FailureResponse::Upstream(message) => TaskError::Upstream { message, source },
                FailureResponse::Unavailable(message) => {
                    TaskError::ModelUnavailable { message, source }
                }
            });
        }
    };

    info!(
        task = %task.kind,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "task completed"
    );
    Ok((task.shape)(&input, reply.trim()))
}
