//! Inventory ledger - The only code path that writes product stock.
//!
//! Customer reservations must leave at least `min_quantity` units behind.
//! The check and the decrement happen in one guarded SQL statement:
//! `UPDATE products SET quantity = quantity - q WHERE id = ? AND quantity >= min_quantity + q`
//! so two concurrent reservations can never jointly breach the floor, even
//! when each read the same starting quantity. Administrative changes
//! (`set_quantity`, `adjust_quantity`) only guard against negative stock.
//!
//! Every function takes any `ConnectionTrait`, so callers can run it inside
//! their own transaction. No error path changes a quantity.

use crate::{
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument, warn};

async fn load_product<C>(db: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })
}

fn ensure_positive(product_id: i64, quantity: i32) -> Result<()> {
    if quantity <= 0 {
        return Err(Error::InvalidQuantity {
            product_id,
            quantity: quantity.into(),
        });
    }
    Ok(())
}

/// Checks a reservation against a stock snapshot.
///
/// Asking for more than is on hand is `InsufficientStock`; asking for an
/// amount that is on hand but would cut into the reserve is
/// `ReserveFloorViolation`. Both report `quantity - min_quantity` (at least 0)
/// as the most that could be reserved.
pub fn check_reservation(product: &product::Model, quantity: i32) -> Result<()> {
    let max_available = product.reservable();

    if quantity > product.quantity {
        return Err(Error::InsufficientStock {
            product_id: product.id,
            requested: quantity,
            max_available,
        });
    }
    if product.quantity - quantity < product.min_quantity {
        return Err(Error::ReserveFloorViolation {
            product_id: product.id,
            requested: quantity,
            max_available,
        });
    }
    Ok(())
}

/// Reserves `quantity` units of a product for a customer order.
///
/// Returns the product with its decremented stock.
///
/// # Errors
/// - `InvalidQuantity` if `quantity` is not positive
/// - `ProductNotFound` if the product does not exist
/// - `InsufficientStock` / `ReserveFloorViolation` if the request does not fit
/// - `Storage` on database failure, or if stock was added between the guarded
///   update and the re-read (retryable)
#[instrument(skip(db))]
pub async fn reserve<C>(db: &C, product_id: i64, quantity: i32) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    ensure_positive(product_id, quantity)?;

    let result = Product::update_many()
        .col_expr(
            product::Column::Quantity,
            Expr::col(product::Column::Quantity).sub(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .filter(
            Expr::col(product::Column::Quantity)
                .gte(Expr::col(product::Column::MinQuantity).add(quantity)),
        )
        .exec(db)
        .await?;

    let current = load_product(db, product_id).await?;
    if result.rows_affected == 1 {
        debug!(remaining = current.quantity, "Reserved stock");
        return Ok(current);
    }

    // The guard refused the decrement; report why from the stock it saw
    check_reservation(&current, quantity)?;
    warn!(
        quantity = current.quantity,
        "Stock grew between the guarded update and the re-read"
    );
    Err(Error::Storage(DbErr::Custom(format!(
        "reservation of product {product_id} raced with a concurrent stock change"
    ))))
}

/// Returns `quantity` previously reserved units to stock.
///
/// Used to compensate a reservation, e.g. when an order is cancelled.
#[instrument(skip(db))]
pub async fn release<C>(db: &C, product_id: i64, quantity: i32) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    ensure_positive(product_id, quantity)?;

    let current = load_product(db, product_id).await?;
    if current.quantity.checked_add(quantity).is_none() {
        return Err(Error::InvalidQuantity {
            product_id,
            quantity: i64::from(current.quantity) + i64::from(quantity),
        });
    }

    Product::update_many()
        .col_expr(
            product::Column::Quantity,
            Expr::col(product::Column::Quantity).add(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;

    let updated = load_product(db, product_id).await?;
    debug!(remaining = updated.quantity, "Released stock");
    Ok(updated)
}

/// Administrative absolute stock set. May land below the minimum reserve.
#[instrument(skip(db))]
pub async fn set_quantity<C>(db: &C, product_id: i64, new_quantity: i32) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    if new_quantity < 0 {
        return Err(Error::InvalidQuantity {
            product_id,
            quantity: new_quantity.into(),
        });
    }

    let result = Product::update_many()
        .col_expr(product::Column::Quantity, Expr::value(new_quantity))
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::ProductNotFound { id: product_id });
    }

    info!(quantity = new_quantity, "Set stock");
    load_product(db, product_id).await
}

/// Administrative relative stock change (the +1/-1 stepper).
///
/// Decreases may go below the minimum reserve but never below zero.
#[instrument(skip(db))]
pub async fn adjust_quantity<C>(db: &C, product_id: i64, delta: i32) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    if delta == 0 {
        return load_product(db, product_id).await;
    }

    let current = load_product(db, product_id).await?;
    let target = i64::from(current.quantity) + i64::from(delta);
    if target < 0 || i32::try_from(target).is_err() {
        return Err(Error::InvalidQuantity {
            product_id,
            quantity: target,
        });
    }

    let result = Product::update_many()
        .col_expr(
            product::Column::Quantity,
            Expr::col(product::Column::Quantity).add(delta),
        )
        .filter(product::Column::Id.eq(product_id))
        .filter(Expr::col(product::Column::Quantity).gte(-i64::from(delta)))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // Someone else drained the stock between our read and the update
        let latest = load_product(db, product_id).await?;
        return Err(Error::InvalidQuantity {
            product_id,
            quantity: i64::from(latest.quantity) + i64::from(delta),
        });
    }

    let updated = load_product(db, product_id).await?;
    if updated.quantity < updated.min_quantity {
        warn!(
            quantity = updated.quantity,
            min_quantity = updated.min_quantity,
            "Stock adjusted below minimum reserve"
        );
    }
    Ok(updated)
}

/// Administrative change of the minimum reserve.
#[instrument(skip(db))]
pub async fn set_min_quantity<C>(
    db: &C,
    product_id: i64,
    min_quantity: i32,
) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    if min_quantity < 0 {
        return Err(Error::InvalidQuantity {
            product_id,
            quantity: min_quantity.into(),
        });
    }

    let result = Product::update_many()
        .col_expr(product::Column::MinQuantity, Expr::value(min_quantity))
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::ProductNotFound { id: product_id });
    }

    info!(min_quantity, "Set minimum reserve");
    load_product(db, product_id).await
}
