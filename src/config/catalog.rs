//! Catalog seed loading from config.toml
//!
//! The `[[products]]` tables in config.toml describe the initial catalog. They
//! are inserted on startup when the products table is still empty.

use crate::{
    core::product::{self, NewProduct},
    entities::Product,
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, TransactionTrait};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Products to seed into an empty catalog
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

/// Configuration for a single catalog product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductConfig {
    /// Display title
    pub title: String,
    /// Catalog category
    pub category: String,
    /// Unit price (string or number, e.g. "19.99")
    pub price: Decimal,
    /// Variant size
    pub size: i32,
    /// Variant color
    pub color: String,
    /// Initial stock
    pub quantity: i32,
    /// Optional image link
    pub image_url: Option<String>,
    /// Minimum reserve, defaults to 0
    #[serde(default)]
    pub min_quantity: i32,
}

/// Loads catalog configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads catalog configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<Config> {
    load_config("config.toml")
}

impl From<ProductConfig> for NewProduct {
    fn from(config: ProductConfig) -> Self {
        Self {
            title: config.title,
            category: config.category,
            price: config.price,
            size: config.size,
            color: config.color,
            quantity: config.quantity,
            image_url: config.image_url,
            min_quantity: config.min_quantity,
        }
    }
}

/// Inserts the configured products if the catalog is empty.
///
/// Returns the number of products inserted. All products are inserted in one
/// transaction, so an invalid entry leaves the catalog empty.
pub async fn seed_catalog(db: &DatabaseConnection, config: &Config) -> Result<usize> {
    if Product::find().count(db).await? > 0 {
        info!("Catalog already populated, skipping seed");
        return Ok(0);
    }

    let txn = db.begin().await?;
    for entry in &config.products {
        product::create_product(&txn, entry.clone().into()).await?;
    }
    txn.commit().await?;

    info!("Seeded {} products from config", config.products.len());
    Ok(config.products.len())
}
