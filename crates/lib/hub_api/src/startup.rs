//! One-time startup checks.
//!
//! Migrations and the model-client check run once before the server accepts
//! requests. Failures are logged and recorded rather than aborting startup,
//! so `GET /ready/` can report them.

use hub_core::llm::TextGenerator;
use sqlx::PgPool;
use tracing::{error, info, warn};

/// Outcome of the startup checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// Embedded migrations applied successfully.
    pub migrations: bool,
    /// The model client has the settings it needs.
    pub model: bool,
}

impl Readiness {
    /// Every check passed.
    pub fn is_ready(&self) -> bool {
        self.migrations && self.model
    }
}

/// Run migrations and check the model client.
pub async fn run(pool: &PgPool, generator: &dyn TextGenerator) -> Readiness {
    let migrations = match crate::migrate(pool).await {
        Ok(()) => {
            info!("database migrations applied");
            true
        }
        Err(e) => {
            error!(error = %e, "database migrations failed");
            false
        }
    };

    let model = generator.is_configured();
    if model {
        info!(model = generator.model(), "language model client configured");
    } else {
        warn!(
            model = generator.model(),
            "language model client is not configured, task requests will fail"
        );
    }

    Readiness { migrations, model }
}
