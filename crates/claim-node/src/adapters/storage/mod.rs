//! # Production Storage Adapters
//!
//! Durable record store backends.
//!
//! ## Usage
//!
//! Enable the `rocksdb` feature to use the RocksDB backend:
//!
//! ```toml
//! claim-node = { path = "...", features = ["rocksdb"] }
//! ```
//!
//! Without it only the in-memory store from `claim-workflow` is available.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbRecordStore, CF_CLAIMS, COLUMN_FAMILIES};

// Re-export the in-memory store for tests and ephemeral runs
pub use claim_workflow::InMemoryStore;
