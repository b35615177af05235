//! # Backup Command Line
//!
//! Drives export and restore against the configured database.
//!
//! ## Usage
//! ```bash
//! # Write a snapshot (default: ./tally-backup-<timestamp>.json)
//! cargo run -p tally-db --bin tally-backup -- export [PATH]
//!
//! # Replace the whole store with a snapshot
//! cargo run -p tally-db --bin tally-backup -- restore PATH
//!
//! # Print the cashbox balance
//! cargo run -p tally-db --bin tally-backup -- balance
//! ```
//!
//! The database is `$TALLY_DB_PATH`, or `--db PATH`, or the platform data
//! directory.

use chrono::Utc;
use std::env;
use std::process::ExitCode;
use tally_db::{init_tracing, Database, DbConfig};

fn print_usage() {
    println!("Tally Backup Tool");
    println!();
    println!("Usage: tally-backup [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  export [PATH]      Write a JSON snapshot of the whole store");
    println!("  restore <PATH>     Replace the store with a snapshot");
    println!("  balance            Print the cashbox balance");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>    Database file path (default: $TALLY_DB_PATH or data dir)");
    println!("  -h, --help         Show this help message");
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();

    let mut db_path: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    match run(db_path, &positional).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(db_path: Option<String>, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let config = match db_path {
        Some(path) => DbConfig::new(path),
        None => DbConfig::from_env()?,
    };

    match args.first().map(String::as_str) {
        Some("export") => {
            let path = args
                .get(1)
                .cloned()
                .unwrap_or_else(|| format!("tally-backup-{}.json", Utc::now().format("%Y%m%d-%H%M%S")));

            let db = Database::new(config).await?;
            let bytes = db.backup().export_to_file(&path).await?;
            db.close().await;

            println!("✓ Exported {} bytes to {}", bytes, path);
        }
        Some("restore") => {
            let path = args.get(1).ok_or("restore needs a snapshot path")?;

            let db = Database::new(config).await?;
            let report = db.backup().restore_from_file(path).await?;
            db.close().await;

            println!("✓ Restored {} records from {}", report.total(), path);
            println!("  Products:             {}", report.products);
            println!("  Categories:           {}", report.categories);
            println!("  Customers:            {}", report.customers);
            println!("  Suppliers:            {}", report.suppliers);
            println!("  Sales:                {}", report.sales);
            println!("  Cashbox transactions: {}", report.cashbox_transactions);
            println!("  Settings:             {}", report.settings);
            println!("  Users:                {}", report.users);
            println!("  Purchases:            {}", report.purchases);
            println!("  Expenses:             {}", report.expenses);
        }
        Some("balance") => {
            let db = Database::new(config).await?;
            let settings = db.settings().get().await?;
            let balance = db.ledger().compute_cashbox_balance().await?;
            db.close().await;

            println!("{}", settings.format_amount(balance));
        }
        Some(other) => {
            print_usage();
            return Err(format!("unknown command `{}`", other).into());
        }
        None => {
            print_usage();
            return Err("missing command".into());
        }
    }

    Ok(())
}
