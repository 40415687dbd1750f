//! Lumen CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront and session-store migrations
//! lumen-cli migrate
//!
//! # Load categories, brands, tags and products from YAML
//! lumen-cli seed catalog.yaml
//!
//! # Move an order along the status machine
//! lumen-cli order status 42 shipped
//!
//! # List orders, optionally filtered
//! lumen-cli order list --status processing --search smith
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use lumen_core::OrderStatus;

mod commands;

#[derive(Parser)]
#[command(name = "lumen-cli")]
#[command(author, version, about = "Lumen CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the catalog YAML file
        file: String,

        /// Parse and validate the file without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Change an order's status
    Status {
        /// Order id
        id: i32,

        /// New status (`processing`, `shipped`, `out_for_delivery`, `delivered`, `cancelled`)
        status: String,
    },
    /// List orders, newest first
    List {
        /// Only orders in this status
        #[arg(short, long)]
        status: Option<OrderStatus>,

        /// Match order id, recipient name or phone
        #[arg(long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, dry_run } => commands::seed::catalog(&file, dry_run).await?,
        Commands::Order { action } => match action {
            OrderAction::Status { id, status } => {
                commands::order::set_status(id, &status).await?;
            }
            OrderAction::List { status, search } => {
                commands::order::list(status, search).await?;
            }
        },
    }
    Ok(())
}
