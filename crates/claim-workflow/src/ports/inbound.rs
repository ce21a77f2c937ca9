//! # Inbound Ports
//!
//! API trait defining what the claim controller can do.

use crate::algorithms::response::{ClaimReceipt, ClaimStatusView};
use crate::domain::ClaimError;
use async_trait::async_trait;

/// Claim API - inbound port.
#[async_trait]
pub trait ClaimApi: Send + Sync {
    /// Redeem `code` for a token minted to `wallet`.
    ///
    /// Returns the replay payload when the code is already minted.
    async fn claim(&self, code: &str, wallet: &str) -> Result<ClaimReceipt, ClaimError>;

    /// Look up a code without side effects.
    async fn check(&self, code: &str) -> Result<ClaimStatusView, ClaimError>;

    /// Reconcile records left behind by an earlier process.
    async fn recover_pending(&self) -> Result<RecoveryReport, ClaimError>;
}

/// Outcome of a startup recovery pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records inspected.
    pub scanned: usize,
    /// Records adopted as minted.
    pub minted: usize,
    /// Records moved to (or kept in) `Failed`.
    pub failed: usize,
    /// Pending records skipped because their lease was still live.
    pub skipped: usize,
    /// Records that could not be reconciled now.
    pub errors: usize,
}
