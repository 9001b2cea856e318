//! Jabuticaba CLI - fulfillment operations tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! jab-cli migrate
//!
//! # Create the carrier shipment for a paid order (idempotent)
//! jab-cli provision --order-id 42
//!
//! # Update an order's status and queue the customer notification
//! jab-cli set-status --order-id 42 --status shipped
//!
//! # Drain one batch of pending notifications
//! jab-cli dispatch --batch-size 100
//!
//! # Inspect last-mile zone configuration
//! jab-cli zones list
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "jab-cli")]
#[command(author, version, about = "Jabuticaba fulfillment CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Create the carrier shipment for a paid order (idempotent)
    Provision {
        /// Order to provision
        #[arg(long)]
        order_id: i64,
    },
    /// Update an order's status and queue the customer notification
    SetStatus {
        /// Order to update
        #[arg(long)]
        order_id: i64,

        /// New status (pending, processing, confirmed, shipped, delivered, cancelled)
        #[arg(long)]
        status: String,
    },
    /// Drain one batch of pending notifications
    Dispatch {
        /// Records to process in this run
        #[arg(long)]
        batch_size: Option<u32>,
    },
    /// Inspect delivery zones
    Zones {
        #[command(subcommand)]
        action: ZonesAction,
    },
}

#[derive(Subcommand)]
enum ZonesAction {
    /// List active zones and settings
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Provision { order_id } => commands::provision::run(order_id).await,
        Commands::SetStatus { order_id, status } => {
            commands::status::run(order_id, &status).await
        }
        Commands::Dispatch { batch_size } => commands::dispatch::run(batch_size).await,
        Commands::Zones { action } => match action {
            ZonesAction::List => commands::zones::list().await,
        },
    }
}
