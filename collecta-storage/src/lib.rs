//! Storage layer for Collecta.
//!
//! Entities are written through a [`StorageTransaction`] obtained from
//! [`Storage::begin`]. Writes are staged until `commit`; a transaction that
//! is rolled back or simply dropped leaves the store untouched. Reads inside
//! a transaction see committed data plus the transaction's own writes.
//!
//! # Backends
//!
//! - [`MemoryStorage`] keeps everything in process behind a `tokio` lock

mod error;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use store::{Storage, StorageTransaction};

/// Current time in milliseconds since the Unix epoch, used for `created_at`.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
