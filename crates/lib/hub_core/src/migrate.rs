//! Database migration support.
//!
//! Embeds and runs SQL migrations from `hub_core/migrations/`.

use sqlx::PgPool;
use sqlx::migrate::Migrator;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run all embedded database migrations against the given pool.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Number of migrations embedded in this build.
pub fn embedded_count() -> usize {
    MIGRATOR.iter().count()
}
