//! # Database Migrations
//!
//! Embedded SQL migrations for the CRM schema.
//!
//! ```text
//! migrations/sqlite/
//! ├── 001_initial_schema.sql   parties, catalog, commercial flow, support tables
//! ├── 002_classifier_seed.sql  one classifier row per enum variant
//! └── 003_indexes.sql          foreign-key and filter column indexes
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create `migrations/sqlite/NNN_description.sql` with the next number
//! 2. Write idempotent SQL (`IF NOT EXISTS`, `INSERT OR IGNORE`)
//! 3. **NEVER** modify an applied migration; add a new one
//! 4. A new classifier enum variant needs its classifier row in a migration

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the `migrations/sqlite` directory.
///
/// `sqlx::migrate!()` embeds the files at compile time; nothing is read from
/// disk at runtime.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent; each migration runs in its own transaction, in filename order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)` for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let tracked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    if tracked == 0 {
        return Ok((total, 0));
    }

    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    Ok((total, applied as usize))
}
