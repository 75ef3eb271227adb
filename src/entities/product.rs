//! Product entity - Catalog items with price, variant attributes and stock.
//!
//! `quantity` and `min_quantity` are inventory state. Only
//! [`crate::core::inventory`] writes them after a product is created.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display title (e.g., "Linen Shirt")
    pub title: String,
    /// Catalog category (e.g., "shirts")
    pub category: String,
    /// Unit price with two fractional digits
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    /// Size of this variant
    pub size: i32,
    /// Color of this variant
    pub color: String,
    /// Units currently available
    pub quantity: i32,
    /// Optional image link shown in the mini-app
    pub image_url: Option<String>,
    /// Units a customer reservation must leave in stock
    #[sea_orm(default_value = 0)]
    pub min_quantity: i32,
}

impl Model {
    /// Largest quantity a single reservation could take right now.
    #[must_use]
    pub fn reservable(&self) -> i32 {
        (self.quantity - self.min_quantity).max(0)
    }
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A product appears in many order lines
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
