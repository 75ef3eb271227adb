//! Request layer - the operations the mini-app's HTTP routes call.
//!
//! [`Storefront`] is shared state for request handlers, much like a bot
//! context: it holds the database connection and applies the admin role check
//! in front of catalog and stock management. Routing and serialization of
//! responses belong to whichever web framework hosts it.

use crate::{
    core::{
        inventory,
        order::{self, NewOrder, PlacedOrder},
        product::{self, NewProduct, ProductDetails},
        user,
    },
    entities::{product::Model as ProductModel, user::Model as UserModel},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// Body of the admin "update product" request.
///
/// `quantity`, when present, is applied through the inventory ledger as an
/// absolute set.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProductRequest {
    /// Product to edit
    pub id: i64,
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
    /// New absolute stock
    #[serde(default)]
    pub quantity: Option<i32>,
    /// New image link
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Result of a role lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    /// Whether the caller is an admin
    pub is_admin: bool,
}

/// Shared state for request handlers.
///
/// Handlers share one instance behind an `Arc`; the connection pool inside
/// is safe to use from many tasks at once.
#[derive(Debug)]
pub struct Storefront {
    /// Database connection for all operations
    pub database: DatabaseConnection,
}

impl Storefront {
    /// Creates a new `Storefront` over the given connection.
    #[must_use]
    pub const fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    async fn require_admin(&self, tg_id: i64) -> Result<UserModel> {
        let caller = user::get_or_create_user(&self.database, tg_id).await?;
        if !caller.role.is_admin() {
            warn!(tg_id, "Rejected admin-only request");
            return Err(Error::Forbidden { tg_id });
        }
        Ok(caller)
    }

    /// Gets or creates the user behind a Telegram id.
    pub async fn register_user(&self, tg_id: i64) -> Result<UserModel> {
        user::get_or_create_user(&self.database, tg_id).await
    }

    /// Reports whether the Telegram id belongs to an admin.
    pub async fn admin_status(&self, tg_id: i64) -> Result<AdminStatus> {
        Ok(AdminStatus {
            is_admin: user::is_admin(&self.database, tg_id).await?,
        })
    }

    /// Lists the whole catalog.
    pub async fn list_products(&self) -> Result<Vec<ProductModel>> {
        product::get_all_products(&self.database).await
    }

    /// Gets one product.
    pub async fn get_product(&self, product_id: i64) -> Result<ProductModel> {
        product::get_product_by_id(&self.database, product_id)
            .await?
            .ok_or(Error::ProductNotFound { id: product_id })
    }

    /// Adds a product to the catalog. Admins only.
    #[instrument(skip(self, new_product))]
    pub async fn create_product(&self, tg_id: i64, new_product: NewProduct) -> Result<ProductModel> {
        self.require_admin(tg_id).await?;
        product::create_product(&self.database, new_product).await
    }

    /// Edits a product and optionally sets its stock. Admins only.
    ///
    /// Both changes commit together or not at all.
    #[instrument(skip(self, request), fields(product_id = request.id))]
    pub async fn update_product(
        &self,
        tg_id: i64,
        request: UpdateProductRequest,
    ) -> Result<ProductModel> {
        self.require_admin(tg_id).await?;

        let txn = self.database.begin().await?;
        let details = ProductDetails {
            title: request.title,
            category: request.category,
            price: request.price,
            size: request.size,
            color: request.color,
            image_url: request.image_url,
        };
        let mut updated = product::update_product_details(&txn, request.id, details).await?;
        if let Some(quantity) = request.quantity {
            updated = inventory::set_quantity(&txn, request.id, quantity).await?;
        }
        txn.commit().await?;
        Ok(updated)
    }

    /// Moves stock up or down by `delta` (the admin stepper). Admins only.
    pub async fn step_quantity(&self, tg_id: i64, product_id: i64, delta: i32) -> Result<ProductModel> {
        self.require_admin(tg_id).await?;
        inventory::adjust_quantity(&self.database, product_id, delta).await
    }

    /// Changes a product's minimum reserve. Admins only.
    pub async fn set_min_quantity(
        &self,
        tg_id: i64,
        product_id: i64,
        min_quantity: i32,
    ) -> Result<ProductModel> {
        self.require_admin(tg_id).await?;
        inventory::set_min_quantity(&self.database, product_id, min_quantity).await
    }

    /// Places an order for the buyer named in the request.
    pub async fn place_order(&self, request: NewOrder) -> Result<PlacedOrder> {
        order::create_order(&self.database, request).await
    }

    /// Lists the caller's orders that are not completed yet, with their lines.
    pub async fn open_orders(&self, tg_id: i64) -> Result<Vec<PlacedOrder>> {
        let buyer = user::get_or_create_user(&self.database, tg_id).await?;
        let headers = order::get_open_orders(&self.database, buyer.id).await?;

        let mut placed = Vec::with_capacity(headers.len());
        for header in headers {
            let items = order::get_order_items(&self.database, header.id).await?;
            placed.push(PlacedOrder {
                order: header,
                items,
            });
        }
        Ok(placed)
    }

    /// Marks an order completed. Unknown or completed orders are a no-op.
    pub async fn complete_order(&self, order_id: i64) -> Result<()> {
        order::complete_order(&self.database, order_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const ADMIN: i64 = 1;
    const BUYER: i64 = 2;

    async fn setup_storefront() -> Result<Storefront> {
        let db = setup_test_db().await?;
        user::grant_admin(&db, ADMIN).await?;
        Ok(Storefront::new(db))
    }

    fn update_request(id: i64, quantity: Option<i32>) -> UpdateProductRequest {
        UpdateProductRequest {
            id,
            title: "Shirt".to_string(),
            category: "shirts".to_string(),
            price: dec!(11.00),
            size: 48,
            color: "white".to_string(),
            quantity,
            image_url: Some("https://example.com/shirt.png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_admin_only_operations_reject_regular_users() -> Result<()> {
        let shop = setup_storefront().await?;

        let result = shop
            .create_product(BUYER, new_test_product("Shirt", dec!(10.00), 5))
            .await;
        assert!(matches!(result, Err(Error::Forbidden { tg_id: BUYER })));

        let product = shop
            .create_product(ADMIN, new_test_product("Shirt", dec!(10.00), 5))
            .await?;
        assert!(matches!(
            shop.step_quantity(BUYER, product.id, 1).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            shop.set_min_quantity(BUYER, product.id, 1).await,
            Err(Error::Forbidden { .. })
        ));
        assert_eq!(shop.get_product(product.id).await?.quantity, 5);

        assert!(shop.admin_status(ADMIN).await?.is_admin);
        assert!(!shop.admin_status(BUYER).await?.is_admin);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_sets_stock_through_ledger() -> Result<()> {
        let shop = setup_storefront().await?;
        let product = create_test_product(&shop.database, "Shirt", dec!(10.00), 5).await?;

        let updated = shop
            .update_product(ADMIN, update_request(product.id, Some(9)))
            .await?;
        assert_eq!(updated.price, dec!(11.00));
        assert_eq!(updated.quantity, 9);

        // A rejected stock value rolls back the detail edit too
        let result = shop
            .update_product(ADMIN, UpdateProductRequest {
                price: dec!(99.00),
                ..update_request(product.id, Some(-1))
            })
            .await;
        assert!(matches!(result, Err(Error::InvalidQuantity { .. })));
        let current = shop.get_product(product.id).await?;
        assert_eq!(current.price, dec!(11.00));
        assert_eq!(current.quantity, 9);

        Ok(())
    }

    #[tokio::test]
    async fn test_place_and_complete_order_flow() -> Result<()> {
        let shop = setup_storefront().await?;
        let product = create_test_product(&shop.database, "Shirt", dec!(10.00), 5).await?;

        let request = order_request_from_toml(product.id);
        let placed = shop.place_order(request).await?;
        assert_eq!(placed.order.order_sum, dec!(20.00));

        let open = shop.open_orders(BUYER).await?;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].items.len(), 1);

        shop.complete_order(placed.order.id).await?;
        shop.complete_order(placed.order.id).await?;
        assert!(shop.open_orders(BUYER).await?.is_empty());

        assert!(matches!(
            shop.get_product(999).await,
            Err(Error::ProductNotFound { id: 999 })
        ));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_storefront_shared_between_handler_tasks() -> Result<()> {
        let (_dir, db) = setup_pooled_test_db(2).await?;
        user::grant_admin(&db, ADMIN).await?;
        let shop = Arc::new(Storefront::new(db));

        let lister = tokio::spawn({
            let shop = Arc::clone(&shop);
            async move { shop.list_products().await }
        });
        let creator = tokio::spawn({
            let shop = Arc::clone(&shop);
            async move {
                shop.create_product(ADMIN, new_test_product("Shirt", dec!(10.00), 5))
                    .await
            }
        });

        assert!(lister.await.unwrap()?.len() <= 1);
        let created = creator.await.unwrap()?;
        assert_eq!(shop.get_product(created.id).await?.quantity, 5);

        Ok(())
    }

    fn order_request_from_toml(product_id: i64) -> NewOrder {
        let toml_body = format!(
            r#"
            tg_id = {BUYER}
            shipping_address = "5 Market Square"
            city = "Riga"
            payment_method = "cash"
            items = [{{ product_id = {product_id}, quantity = 2 }}]
            "#
        );
        toml::from_str(&toml_body).unwrap()
    }
}
