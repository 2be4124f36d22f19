//! SQLite backend for the ParkQuest challenge store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Engine operations run through
//! [`repo::TxRepo`] inside one `IMMEDIATE` transaction each.

mod encode;
mod repo;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
