//! Shared foundation for the aura workspace
//!
//! Provides the error taxonomy, configuration loading, and SQLite
//! database initialization used by the sync service.

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
