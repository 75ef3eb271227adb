//! Shared test utilities for the storefront.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        order::{NewOrder, OrderLine},
        product::{self, NewProduct},
    },
    entities,
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tempfile::TempDir;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
///
/// An in-memory database lives inside a single connection, so the pool is
/// pinned to exactly one. Concurrent transactions queue for it.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database served by a pool of `connections`.
///
/// Unlike [`setup_test_db`], transactions here really overlap, so lock
/// contention between writers shows up as it does in production. Keep the
/// returned [`TempDir`] alive for as long as the connection is used.
pub async fn setup_pooled_test_db(connections: u32) -> Result<(TempDir, DatabaseConnection)> {
    let dir = TempDir::new()?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("shop.sqlite").display());

    let mut options = ConnectOptions::new(url);
    options
        .max_connections(connections)
        .min_connections(connections)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((dir, db))
}

/// Builds product fields with sensible defaults.
///
/// # Defaults
/// * `category`: "shirts"
/// * `size`: 48
/// * `color`: "white"
/// * `min_quantity`: 0
pub fn new_test_product(title: &str, price: Decimal, quantity: i32) -> NewProduct {
    NewProduct {
        title: title.to_string(),
        category: "shirts".to_string(),
        price,
        size: 48,
        color: "white".to_string(),
        quantity,
        image_url: None,
        min_quantity: 0,
    }
}

/// Creates a test product without a minimum reserve.
pub async fn create_test_product(
    db: &DatabaseConnection,
    title: &str,
    price: Decimal,
    quantity: i32,
) -> Result<entities::product::Model> {
    product::create_product(db, new_test_product(title, price, quantity)).await
}

/// Creates a test product with a custom minimum reserve.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    title: &str,
    price: Decimal,
    quantity: i32,
    min_quantity: i32,
) -> Result<entities::product::Model> {
    let mut new_product = new_test_product(title, price, quantity);
    new_product.min_quantity = min_quantity;
    product::create_product(db, new_product).await
}

/// Shorthand for an order line.
pub const fn line(product_id: i64, quantity: i32) -> OrderLine {
    OrderLine {
        product_id,
        quantity,
    }
}

/// Builds an order request with sensible defaults.
///
/// # Defaults
/// * `shipping_address`: "1 Test Street"
/// * `city`: "Testville"
/// * `payment_method`: "card"
/// * no notes, date, email or phone
pub fn new_test_order(tg_id: i64, items: Vec<OrderLine>) -> NewOrder {
    NewOrder {
        tg_id,
        items,
        shipping_address: "1 Test Street".to_string(),
        city: "Testville".to_string(),
        payment_method: "card".to_string(),
        notes: None,
        timestamp: None,
        email: None,
        phone: None,
    }
}
