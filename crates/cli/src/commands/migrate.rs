//! Database migration command.
//!
//! Runs the embedded storefront migrations (`crates/storefront/migrations/`)
//! and then the session store's own table migration.

use tracing::info;

use lumen_storefront::db::MIGRATOR;
use lumen_storefront::middleware::postgres_session_store;

/// Run all storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    info!("Running storefront migrations...");
    MIGRATOR.run(&pool).await?;

    info!("Running session store migrations...");
    postgres_session_store(&pool).migrate().await?;

    info!("Storefront migrations complete!");
    Ok(())
}
