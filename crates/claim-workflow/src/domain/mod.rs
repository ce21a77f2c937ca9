//! # Domain Module
//!
//! Core domain types for the claim workflow.

pub mod config;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod value_objects;
pub mod wallet;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use value_objects::*;
pub use wallet::{to_checksum, WalletAddress};
