//! # Claim Node
//!
//! Production wiring for the claim workflow.
//!
//! ## Modular Structure
//!
//! - `adapters/` - RocksDB store, IPFS publisher, JSON-RPC submitter, local signer
//! - `container/` - Configuration and dependency injection
//! - `http/` - Axum routes over [`claim_workflow::ClaimApi`]
//! - `provisioning` - Bulk creation of redeem codes
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then environment)
//! 2. Build the container (store, signer, clients, controller)
//! 3. Reconcile records left `Pending` or `Failed` with evidence
//! 4. Serve HTTP until interrupted

#![warn(missing_docs)]

pub mod adapters;
pub mod container;
pub mod http;
pub mod provisioning;

pub use container::{build_store, ClaimContainer, ContainerError, NodeConfig};
pub use provisioning::{provision_codes, provision_random, ProvisionError, ProvisionReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
