//! Stock Take server
//!
//! Serves the scan/update API used by the stock take UI on top of a SQLite file.

use clap::Parser;
use stock_take::web::{serve, AppState};
use stock_take::{database, open_database, NewItemPolicy};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Stock take server - counts inventory from barcode scans into SQLite
#[derive(Parser, Debug)]
#[command(name = "stock_take")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Address to bind the HTTP API to
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Port for the HTTP API
    #[arg(short, long, default_value_t = 4000)]
    port: u16,

    /// Require a name and part number when a barcode is scanned for the first time
    #[arg(long, default_value_t = false)]
    require_details: bool,

    /// How long a write waits for a lock held by another connection, in milliseconds
    #[arg(long, default_value_t = 5000)]
    busy_timeout_ms: u64,
}

/// Returns the default database path: ~/.local/share/stock_take/stock.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stock_take")
        .join("stock.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting stock_take...");
    log::info!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let conn = match open_database(&db_path, Duration::from_millis(args.busy_timeout_ms)) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    match database::item_count(&conn) {
        Ok(count) => log::info!("Opened database with {} item(s)", count),
        Err(e) => log::warn!("Could not count items: {}", e),
    }

    let policy = if args.require_details {
        log::info!("New items require a name and part number");
        NewItemPolicy::RequireDetails
    } else {
        NewItemPolicy::Optional
    };

    let state = AppState::new(Arc::new(Mutex::new(conn)), policy);
    let addr = SocketAddr::new(args.bind, args.port);

    if let Err(e) = serve(state, addr).await {
        log::error!("Web server error: {}", e);
        std::process::exit(1);
    }
}
