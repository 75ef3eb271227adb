//! User entity - A mini-app customer identified by their Telegram id.
//!
//! Users are created lazily on first contact. The role is a plain column
//! rather than a separate admin table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access role of a user, stored as `"user"` or `"admin"`
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer
    #[default]
    #[sea_orm(string_value = "user")]
    User,
    /// Catalog administrator
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    /// Returns true for [`Role::Admin`].
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Telegram chat id (external identifier)
    #[sea_orm(unique)]
    pub tg_id: i64,
    /// Access role
    pub role: Role,
    /// Contact email copied onto orders when the request has none
    pub email: Option<String>,
    /// Contact phone copied onto orders when the request has none
    pub phone: Option<String>,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
