//! Database initialization and persisted models

pub mod init;
pub mod models;

pub use init::init_database;
pub use models::CatalogEntry;
