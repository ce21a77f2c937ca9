//! # Claim Service Test Suite
//!
//! Cross-crate tests for the claim workflow and its production adapters.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs     # Mock chain node and IPFS endpoint
//!     ├── scenarios.rs   # Claim outcomes over in-memory backends
//!     ├── concurrency.rs # Racing claims and token ordering
//!     ├── recovery.rs    # Restarts with interrupted claims
//!     └── node_e2e.rs    # HTTP API over real adapters and mock services
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p claim-tests
//!
//! # Include RocksDB restart tests
//! cargo test -p claim-tests --features rocksdb
//! ```

#![allow(dead_code)]

pub mod integration;
