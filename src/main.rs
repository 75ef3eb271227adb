use mini_shop::{
    config::{admins, catalog, database},
    core::user,
    errors::Result,
    storefront::Storefront,
};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenvy::dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 4. Grant configured admins
    for tg_id in admins::get_admin_tg_ids() {
        user::grant_admin(&db, tg_id).await?;
    }

    // 5. Seed the catalog from config.toml when present
    if Path::new("config.toml").exists() {
        let config = catalog::load_default_config()
            .inspect_err(|e| error!("Failed to load config.toml: {}", e))?;
        catalog::seed_catalog(&db, &config).await?;
    } else {
        info!("No config.toml found, skipping catalog seed.");
    }

    let shop = Storefront::new(db);
    let products = shop.list_products().await?;
    info!("Storefront ready with {} products.", products.len());

    Ok(())
}
