/// Database configuration and connection management
pub mod database;

/// Catalog seed loading from config.toml
pub mod catalog;

/// Admin id configuration from environment variables
pub mod admins;
