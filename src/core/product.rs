//! Product catalog - Handles listing, creating and editing catalog products.
//!
//! Stock levels are not edited here. New products get their initial stock on
//! insert; every later change to `quantity` or `min_quantity` goes through
//! [`crate::core::inventory`].

use crate::{
    entities::{Product, product},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Fields for a new catalog product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    /// Display title
    pub title: String,
    /// Catalog category
    pub category: String,
    /// Unit price
    pub price: Decimal,
    /// Variant size
    pub size: i32,
    /// Variant color
    pub color: String,
    /// Initial stock
    pub quantity: i32,
    /// Optional image link
    pub image_url: Option<String>,
    /// Minimum reserve
    #[serde(default)]
    pub min_quantity: i32,
}

/// Descriptive fields an admin may edit. Stock is intentionally absent.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDetails {
    /// Display title
    pub title: String,
    /// Catalog category
    pub category: String,
    /// Unit price
    pub price: Decimal,
    /// Variant size
    pub size: i32,
    /// Variant color
    pub color: String,
    /// New image link; `None` keeps the current one
    pub image_url: Option<String>,
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Config {
            message: "Product title cannot be empty".to_string(),
        });
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<()> {
    if price < Decimal::ZERO {
        return Err(Error::InvalidPrice { price });
    }
    Ok(())
}

/// Retrieves the whole catalog ordered by title.
pub async fn get_all_products<C>(db: &C) -> Result<Vec<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find()
        .order_by_asc(product::Column::Title)
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific product by its unique ID.
pub async fn get_product_by_id<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads several products in one query, keyed by id.
///
/// Ids without a product are simply absent from the map.
pub async fn get_products_by_ids<C>(db: &C, ids: &[i64]) -> Result<HashMap<i64, product::Model>>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let products = Product::find()
        .filter(product::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

/// Creates a new product after validating its fields.
///
/// # Errors
/// Returns an error if:
/// - The title is empty or whitespace-only
/// - The price is negative
/// - The quantity or minimum reserve is negative, or the stock starts below the reserve
/// - The database insert operation fails
#[instrument(skip(db, new_product), fields(title = %new_product.title))]
pub async fn create_product<C>(db: &C, new_product: NewProduct) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    validate_title(&new_product.title)?;
    validate_price(new_product.price)?;

    if new_product.min_quantity < 0 {
        return Err(Error::InvalidQuantity {
            product_id: 0,
            quantity: new_product.min_quantity.into(),
        });
    }
    if new_product.quantity < new_product.min_quantity {
        return Err(Error::InvalidQuantity {
            product_id: 0,
            quantity: new_product.quantity.into(),
        });
    }

    let product = product::ActiveModel {
        title: Set(new_product.title.trim().to_string()),
        category: Set(new_product.category.trim().to_string()),
        price: Set(new_product.price.round_dp(2)),
        size: Set(new_product.size),
        color: Set(new_product.color.trim().to_string()),
        quantity: Set(new_product.quantity),
        image_url: Set(new_product.image_url),
        min_quantity: Set(new_product.min_quantity),
        ..Default::default()
    };
    let created = product.insert(db).await?;
    info!(product_id = created.id, "Created product");
    Ok(created)
}

/// Updates the descriptive fields of an existing product.
///
/// # Errors
/// Returns an error if validation fails, the product does not exist, or the
/// database update operation fails.
#[instrument(skip(db, details))]
pub async fn update_product_details<C>(
    db: &C,
    product_id: i64,
    details: ProductDetails,
) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    validate_title(&details.title)?;
    validate_price(details.price)?;

    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?
        .into();

    product.title = Set(details.title.trim().to_string());
    product.category = Set(details.category.trim().to_string());
    product.price = Set(details.price.round_dp(2));
    product.size = Set(details.size);
    product.color = Set(details.color.trim().to_string());
    if let Some(image_url) = details.image_url {
        product.image_url = Set(Some(image_url));
    }

    product.update(db).await.map_err(Into::into)
}
