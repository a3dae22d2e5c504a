//! Dink Core Library
//!
//! Shared functionality for Dink components:
//! - Configuration resolution and hierarchy
//! - `SQLite` pool helpers and timestamp utilities
//! - Common error types
//! - Tracing initialization

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use db::StorageError;
pub use error::{Error, Result};
