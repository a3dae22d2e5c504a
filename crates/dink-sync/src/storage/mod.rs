//! Local persistent storage: `SQLite` database, generic entity cache,
//! and the device identity link.

pub mod cache;
pub mod db;
pub mod device_link;

pub use cache::EntityCache;
pub use db::Database;
pub use device_link::DeviceLinkStore;
