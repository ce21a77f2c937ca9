//! Reconciliation of a persisted submission against the chain.
//!
//! A record may be left `Pending` by a crashed process, or `Failed` after a
//! broadcast whose outcome was never observed. Either way the chain is the
//! source of truth: a transaction that landed is adopted, one that provably
//! cannot land is abandoned, and one that may still land is rebroadcast with
//! the identical signed bytes. A second transaction is never created here.

use crate::domain::TxStatus;

/// What to do with a persisted submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileDecision {
    /// The transaction is on chain or in the mempool; record it as minted.
    Adopt,
    /// The transaction can never produce the token; clear the evidence.
    Abandon(String),
    /// The node never saw it and its nonce is still free; resend it.
    Rebroadcast,
}

/// Decide from the transaction status and the account's pending nonce.
pub fn decide(status: TxStatus, evidence_nonce: u64, pending_nonce: u64) -> ReconcileDecision {
    match status {
        TxStatus::Included | TxStatus::InMempool => ReconcileDecision::Adopt,
        TxStatus::Reverted => ReconcileDecision::Abandon("transaction reverted".to_string()),
        TxStatus::Unknown if pending_nonce > evidence_nonce => ReconcileDecision::Abandon(format!(
            "nonce {} consumed by another transaction",
            evidence_nonce
        )),
        TxStatus::Unknown => ReconcileDecision::Rebroadcast,
    }
}
