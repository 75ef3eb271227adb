//! Order entity - The header of a placed order.
//!
//! `order_sum` and `quantity` are a snapshot taken when the order was placed
//! and are never recomputed from current product state. The only later
//! change is `completed` going from false to true.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user (`users.id`, not the Telegram id)
    pub user_id: i64,
    /// Day the order was placed
    pub timestamp: Date,
    /// Total price of all lines at the time of ordering
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub order_sum: Decimal,
    /// Total number of units across all lines
    pub quantity: i32,
    /// Whether the order has been fulfilled
    #[sea_orm(default_value = false)]
    pub completed: bool,
    /// Delivery street address
    pub shipping_address: String,
    /// Delivery city
    pub city: String,
    /// Payment method chosen by the buyer
    pub payment_method: String,
    /// Free-text notes from the buyer
    pub notes: Option<String>,
    /// Buyer email
    pub email: String,
    /// Buyer phone
    pub phone: String,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
