//! Order orchestration - Places multi-item orders and marks them completed.
//!
//! Placing an order is one unit of work: resolve the buyer, load the products,
//! reserve stock for every line through the inventory ledger, compute the
//! totals and write the header plus its lines. Any failure drops the
//! transaction before commit, which rolls back every write made so far,
//! including reservations of earlier lines.

use crate::{
    core::{inventory, product, user},
    entities::{Order, OrderItem, order, order_item, product::Model as ProductModel},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};
use tracing::{debug, info, instrument, warn};

/// Times a unit of work is started when `SQLite` reports lock contention.
const MAX_ORDER_ATTEMPTS: u32 = 5;

/// Base pause between attempts, multiplied by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(20);

/// One (product, quantity) pair of an order request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Product to buy
    pub product_id: i64,
    /// Units to buy
    pub quantity: i32,
}

/// A purchase request from the mini-app.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    /// Telegram id of the buyer
    pub tg_id: i64,
    /// Lines to order
    pub items: Vec<OrderLine>,
    /// Delivery street address
    pub shipping_address: String,
    /// Delivery city
    pub city: String,
    /// Payment method
    pub payment_method: String,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
    /// Order date; today (UTC) when absent
    #[serde(default)]
    pub timestamp: Option<Date>,
    /// Buyer email; falls back to the user's stored email
    #[serde(default)]
    pub email: Option<String>,
    /// Buyer phone; falls back to the user's stored phone
    #[serde(default)]
    pub phone: Option<String>,
}

/// An order header together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    /// The order header with its snapshot totals
    pub order: order::Model,
    /// The order's lines in insertion order
    pub items: Vec<order_item::Model>,
}

/// Rejects empty orders and non-positive line quantities before any storage access.
pub fn validate_lines(items: &[OrderLine]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::EmptyOrder);
    }
    if let Some(line) = items.iter().find(|line| line.quantity <= 0) {
        return Err(Error::InvalidQuantity {
            product_id: line.product_id,
            quantity: line.quantity.into(),
        });
    }
    Ok(())
}

/// Computes `(order_sum, total_quantity)` from unit prices in `products`.
///
/// The sum is exact decimal arithmetic rounded to cents.
pub fn order_totals(
    items: &[OrderLine],
    products: &HashMap<i64, ProductModel>,
) -> Result<(Decimal, i32)> {
    let mut order_sum = Decimal::ZERO;
    let mut total_quantity: i32 = 0;

    for line in items {
        let product = products
            .get(&line.product_id)
            .ok_or(Error::ProductNotFound {
                id: line.product_id,
            })?;
        order_sum += product.price * Decimal::from(line.quantity);
        total_quantity =
            total_quantity
                .checked_add(line.quantity)
                .ok_or(Error::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity.into(),
                })?;
    }

    Ok((order_sum.round_dp(2), total_quantity))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Places an order and reserves its stock in a single transaction.
///
/// If `db` is itself a transaction the work runs in a savepoint. When another
/// writer holds the database lock the whole unit of work is rolled back and
/// started again, so a competing order is judged against the stock it left.
///
/// # Errors
/// - `EmptyOrder` if there are no lines
/// - `InvalidQuantity` if a line quantity is not positive
/// - `ProductNotFound` for the first line whose product does not exist
/// - `InsufficientStock` / `ReserveFloorViolation` for the first line that does not fit
/// - `Storage` on database failure, or if the lock stayed contended
///
/// Nothing is written when an error is returned.
#[instrument(skip(db, new_order), fields(tg_id = new_order.tg_id, lines = new_order.items.len()))]
pub async fn create_order<C>(db: &C, new_order: NewOrder) -> Result<PlacedOrder>
where
    C: TransactionTrait,
{
    validate_lines(&new_order.items)?;

    let mut attempt = 1;
    loop {
        match create_order_once(db, &new_order).await {
            Err(err) if err.is_contention() && attempt < MAX_ORDER_ATTEMPTS => {
                warn!(attempt, error = %err, "Database busy, restarting order");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}

/// One attempt at the order unit of work. Dropping the transaction on any
/// error rolls back every write of this attempt.
async fn create_order_once<C>(db: &C, new_order: &NewOrder) -> Result<PlacedOrder>
where
    C: TransactionTrait,
{
    let txn = db.begin().await?;

    let buyer = user::get_or_create_user(&txn, new_order.tg_id).await?;

    let ids: Vec<i64> = new_order.items.iter().map(|line| line.product_id).collect();
    let products = product::get_products_by_ids(&txn, &ids).await?;
    if let Some(missing) = ids.iter().find(|id| !products.contains_key(*id)) {
        return Err(Error::ProductNotFound { id: *missing });
    }

    for line in &new_order.items {
        inventory::reserve(&txn, line.product_id, line.quantity).await?;
    }

    let (order_sum, quantity) = order_totals(&new_order.items, &products)?;
    let timestamp = new_order
        .timestamp
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let email = non_empty(new_order.email.as_deref())
        .or(buyer.email)
        .unwrap_or_default();
    let phone = non_empty(new_order.phone.as_deref())
        .or(buyer.phone)
        .unwrap_or_default();

    let header = order::ActiveModel {
        user_id: Set(buyer.id),
        timestamp: Set(timestamp),
        order_sum: Set(order_sum),
        quantity: Set(quantity),
        completed: Set(false),
        shipping_address: Set(new_order.shipping_address.trim().to_string()),
        city: Set(new_order.city.trim().to_string()),
        payment_method: Set(new_order.payment_method.trim().to_string()),
        notes: Set(non_empty(new_order.notes.as_deref())),
        email: Set(email),
        phone: Set(phone),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(new_order.items.len());
    for line in &new_order.items {
        let item = order_item::ActiveModel {
            order_id: Set(header.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(item);
    }

    txn.commit().await?;

    info!(
        order_id = header.id,
        user_id = buyer.id,
        %order_sum,
        quantity,
        "Order placed"
    );
    Ok(PlacedOrder {
        order: header,
        items,
    })
}

/// Marks an order as completed.
///
/// Completion is one-way and idempotent: an already completed order and an
/// unknown id are both successful no-ops. Returns whether this call changed
/// the order.
#[instrument(skip(db))]
pub async fn complete_order<C>(db: &C, order_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Order::update_many()
        .col_expr(order::Column::Completed, Expr::value(true))
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Completed.eq(false))
        .exec(db)
        .await?;

    let changed = result.rows_affected > 0;
    if changed {
        info!("Order completed");
    } else {
        debug!("Order missing or already completed, nothing to do");
    }
    Ok(changed)
}

/// Retrieves an order header by id.
pub async fn get_order_by_id<C>(db: &C, order_id: i64) -> Result<Option<order::Model>>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the lines of an order in insertion order.
pub async fn get_order_items<C>(db: &C, order_id: i64) -> Result<Vec<order_item::Model>>
where
    C: ConnectionTrait,
{
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves an order together with its lines.
pub async fn get_placed_order<C>(db: &C, order_id: i64) -> Result<Option<PlacedOrder>>
where
    C: ConnectionTrait,
{
    let Some(order) = get_order_by_id(db, order_id).await? else {
        return Ok(None);
    };
    let items = get_order_items(db, order_id).await?;
    Ok(Some(PlacedOrder { order, items }))
}

/// Retrieves a user's orders with the given completion state, newest first.
///
/// `user_id` is the internal user id, not the Telegram id.
pub async fn get_orders_for_user<C>(
    db: &C,
    user_id: i64,
    completed: bool,
) -> Result<Vec<order::Model>>
where
    C: ConnectionTrait,
{
    Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::Completed.eq(completed))
        .order_by_desc(order::Column::Timestamp)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a user's orders that are not completed yet.
pub async fn get_open_orders<C>(db: &C, user_id: i64) -> Result<Vec<order::Model>>
where
    C: ConnectionTrait,
{
    get_orders_for_user(db, user_id, false).await
}
