use std::process;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use paper_catalog::{config::AppConfig, db, scanner, storage::LocalStorage};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "scan",
        database_url = %config.database_url,
        storage_path = %config.storage_path.display(),
        "loaded backend configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let storage = LocalStorage::new(config.storage_path.clone());
    let mut conn = pool.get().context("failed to get database connection")?;
    tracing::info!(root = %storage.root().display(), "scanning paper library");

    let result = scanner::scan_library(&storage, &mut conn)
        .await
        .context("scan failed")?;

    println!("Added: {}", result.added);
    println!("Updated: {}", result.updated);
    if !result.errors.is_empty() {
        eprintln!("Errors ({}):", result.errors.len());
        for error in &result.errors {
            eprintln!("  {error}");
        }
    }

    if result.added == 0 && result.updated == 0 && !result.errors.is_empty() {
        process::exit(1);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
