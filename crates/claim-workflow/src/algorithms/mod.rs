//! # Algorithms Module
//!
//! Pure and near-pure logic used by the controller.

pub mod metadata;
pub mod reconciliation;
pub mod response;
pub mod sequencer;
pub mod steps;

pub use metadata::{build_metadata, encode_metadata};
pub use reconciliation::{decide, ReconcileDecision};
pub use response::{format_receipt, network_info, status_view, ClaimReceipt, ClaimStatusView, NetworkInfo};
pub use sequencer::MintSequencer;
pub use steps::bounded;
