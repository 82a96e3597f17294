//! Database health probing.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;

use crate::migrate;

/// Tables the service cannot run without.
const REQUIRED_TABLES: [&str; 3] = ["users", "refresh_tokens", "api_keys"];

/// Outcome of one health probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbHealth {
    pub connected: bool,
    pub tables_exist: bool,
    pub migrations_applied: bool,
    pub error: Option<String>,
}

impl DbHealth {
    /// Connected, with schema and migrations in place.
    pub fn is_healthy(&self) -> bool {
        self.connected && self.tables_exist && self.migrations_applied
    }
}

/// Probe connectivity, required tables, and migration state.
///
/// Never fails: problems are reported in the returned [`DbHealth`].
pub async fn check_health(pool: &PgPool) -> DbHealth {
    let mut health = DbHealth::default();

    if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
        warn!(error = %e, "database health check: connection failed");
        health.error = Some(hint(&e).to_string());
        return health;
    }
    health.connected = true;

    match tables_exist(pool).await {
        Ok(exists) => health.tables_exist = exists,
        Err(e) => {
            warn!(error = %e, "database health check: table lookup failed");
            health.error = Some(hint(&e).to_string());
            return health;
        }
    }

    match applied_migrations(pool).await {
        Ok(applied) => health.migrations_applied = applied >= migrate::embedded_count(),
        Err(e) => {
            warn!(error = %e, "database health check: migration lookup failed");
            health.error = Some(hint(&e).to_string());
        }
    }

    health
}

/// Short category for a failure; the raw error is only logged.
fn hint(e: &sqlx::Error) -> &'static str {
    let raw = e.to_string().to_lowercase();
    match e {
        sqlx::Error::PoolTimedOut => "Connection timeout - check firewall/network settings",
        _ if raw.contains("timeout") || raw.contains("timed out") => {
            "Connection timeout - check firewall/network settings"
        }
        _ if raw.contains("authentication failed") => "Check database credentials",
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
            "Database unreachable - check host and network settings"
        }
        sqlx::Error::Database(_) => "Database query failed",
        _ => "Database error",
    }
}

async fn tables_exist(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let names: Vec<String> = REQUIRED_TABLES.iter().map(|t| t.to_string()).collect();
    let (found,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = ANY($1)",
    )
    .bind(&names)
    .fetch_one(pool)
    .await?;
    Ok(found as usize == REQUIRED_TABLES.len())
}

/// Count of successfully applied migrations; zero when the ledger table is absent.
async fn applied_migrations(pool: &PgPool) -> Result<usize, sqlx::Error> {
    let (ledger,): (bool,) =
        sqlx::query_as("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await?;
    if !ledger {
        return Ok(0);
    }
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await?;
    Ok(count as usize)
}
