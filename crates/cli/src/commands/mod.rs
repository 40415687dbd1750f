//! CLI subcommands.

pub mod migrate;
pub mod order;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

use lumen_storefront::db;

/// Pool ceiling for one-shot commands.
const CLI_MAX_CONNECTIONS: u32 = 2;

/// Errors raised by the CLI itself rather than the storefront library.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("{0} validation errors found")]
    InvalidSeed(usize),
}

/// Connect to the storefront database.
///
/// Reads `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&database_url, CLI_MAX_CONNECTIONS).await?)
}
