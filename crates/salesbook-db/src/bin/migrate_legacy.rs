//! # Legacy Snapshot Migration
//!
//! Copies a legacy local snapshot (JSON) into the SQLite store of one owner.
//!
//! ## Usage
//! ```bash
//! cargo run -p salesbook-db --bin migrate-legacy -- --snapshot ./export.json --db ./salesbook.db
//!
//! # Only report whether a migration would run
//! cargo run -p salesbook-db --bin migrate-legacy -- --snapshot ./export.json --check
//!
//! # Migrate even when the owner already has data in SQLite
//! cargo run -p salesbook-db --bin migrate-legacy -- --snapshot ./export.json --force
//! ```
//!
//! Defaults for `--snapshot`, `--db` and `--owner` come from `AppConfig`.
//! Exits with status 1 when the migration is partial or fails.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use salesbook_db::{
    init_tracing, migrate_legacy, migration_needed, AppConfig, Database, DbConfig, LocalStore,
    StaticIdentity,
};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = AppConfig::load(None)?;
    init_tracing(&config.logging);

    let args: Vec<String> = env::args().collect();

    let mut snapshot: Option<PathBuf> = config.legacy.snapshot_path.clone();
    let mut db_path = config.database_path();
    let mut owner = config.identity.owner_id.clone();
    let mut check_only = false;
    let mut force = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--snapshot" | "-s" => {
                if i + 1 < args.len() {
                    snapshot = Some(args[i + 1].clone().into());
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--owner" | "-o" => {
                if i + 1 < args.len() {
                    owner = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--check" => check_only = true,
            "--force" | "-f" => force = true,
            "--help" | "-h" => {
                println!("Salesbook Legacy Migration");
                println!();
                println!("Usage: migrate-legacy [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --snapshot <PATH>  Legacy JSON snapshot (default: from config)");
                println!("  -d, --db <PATH>        Database file path (default: from config)");
                println!("  -o, --owner <ID>       Owner id to migrate into (default: from config)");
                println!("      --check            Only report whether a migration is needed");
                println!("  -f, --force            Migrate even if the owner already has data");
                println!("  -h, --help             Show this help message");
                return Ok(ExitCode::SUCCESS);
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    let Some(snapshot) = snapshot else {
        eprintln!("No snapshot given. Use --snapshot <PATH> or set legacy.snapshot_path.");
        return Ok(ExitCode::FAILURE);
    };

    println!("Salesbook Legacy Migration");
    println!("==========================");
    println!("Snapshot: {}", snapshot.display());
    println!("Database: {}", db_path.display());
    println!("Owner:    {}", owner.as_deref().unwrap_or("(none)"));
    println!();

    let source = LocalStore::load(&snapshot).await?;

    let db_config = DbConfig::new(&db_path).max_connections(config.database.max_connections);
    let db = Database::new(db_config).await?;
    let identity = match owner {
        Some(owner) => StaticIdentity::new(owner),
        None => StaticIdentity::anonymous(),
    };
    let target = db.store(Arc::new(identity));

    let needed = migration_needed(&source, &target).await?;
    if check_only {
        println!(
            "{}",
            if needed {
                "Migration needed"
            } else {
                "No migration needed"
            }
        );
        db.close().await;
        return Ok(ExitCode::SUCCESS);
    }

    if !needed && !force {
        println!("⚠ Nothing to migrate (snapshot empty or owner already has data).");
        println!("  Use --force to migrate anyway.");
        db.close().await;
        return Ok(ExitCode::SUCCESS);
    }

    let report = migrate_legacy(&source, &target).await?;
    db.close().await;

    println!("{}", report.message);
    println!("  statuses:    {}", report.migrated.statuses);
    println!("  products:    {}", report.migrated.products);
    println!("  sales:       {}", report.migrated.sales);
    println!("  sale items:  {}", report.migrated.sale_items);
    println!("  expenses:    {}", report.migrated.expenses);
    println!("  preferences: {}", report.migrated.preferences);
    for error in &report.errors {
        eprintln!("✗ {}", error);
    }

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
