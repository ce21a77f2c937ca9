//! # Domain Value Objects
//!
//! Immutable value types for the claim workflow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Claim state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimState {
    /// Provisioned, never attempted.
    #[default]
    Unclaimed,
    /// An execution owns the code and may be talking to external systems.
    Pending,
    /// Token minted; terminal.
    Minted,
    /// Last attempt failed; retryable with the recorded wallet.
    Failed,
}

impl ClaimState {
    /// Check if transition is valid.
    ///
    /// `Pending -> Pending` covers lease renewal, takeover and evidence
    /// writes. Reconciliation always starts from `Pending` under a lease.
    pub fn can_transition_to(&self, next: ClaimState) -> bool {
        match (self, next) {
            (Self::Unclaimed, Self::Pending) => true,
            (Self::Pending, Self::Pending) => true,
            (Self::Pending, Self::Minted) => true,
            (Self::Pending, Self::Failed) => true,
            (Self::Failed, Self::Pending) => true,
            _ => false,
        }
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Minted)
    }

    /// Whether a new attempt may start from this state.
    pub fn accepts_attempt(&self) -> bool {
        matches!(self, Self::Unclaimed | Self::Failed)
    }

    /// Lowercase label used in logs and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unclaimed => "unclaimed",
            Self::Pending => "pending",
            Self::Minted => "minted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ClaimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Steps of one mint attempt, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStep {
    /// Read or write of the record store.
    Store,
    /// Allocation of nonce and token id.
    Sequence,
    /// Provenance metadata construction.
    BuildMetadata,
    /// Upload to the metadata publisher.
    Publish,
    /// Network identity query.
    NetworkId,
    /// Local signing of the mint intent.
    Sign,
    /// Durable write of submission evidence.
    PersistEvidence,
    /// Broadcast to the chain.
    Submit,
    /// Durable write of the minted state.
    PersistMinted,
    /// Status query during reconciliation.
    QueryStatus,
}

impl WorkflowStep {
    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Sequence => "sequence",
            Self::BuildMetadata => "build_metadata",
            Self::Publish => "publish",
            Self::NetworkId => "network_id",
            Self::Sign => "sign",
            Self::PersistEvidence => "persist_evidence",
            Self::Submit => "submit",
            Self::PersistMinted => "persist_minted",
            Self::QueryStatus => "query_status",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-bounded ownership of a code's workflow execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Execution that owns the code.
    pub owner: Uuid,
    /// Unix milliseconds after which the lease may be taken over.
    pub expires_at_ms: u64,
}

impl Lease {
    /// Create a lease for `owner` lasting `duration_ms` from `now_ms`.
    pub fn new(owner: Uuid, now_ms: u64, duration_ms: u64) -> Self {
        Self {
            owner,
            expires_at_ms: now_ms.saturating_add(duration_ms),
        }
    }

    /// Check if the lease is expired.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// Content reference returned by the metadata publisher.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(pub String);

impl ContentRef {
    /// Token URI argument of `safeMint`: the bare hash. The collection
    /// contract prepends its own `ipfs://` base URI.
    pub fn token_uri(&self) -> String {
        self.0.clone()
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHandle(pub String);

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a transaction as seen by the chain node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Included in a block and executed successfully.
    Included,
    /// Known to the node but not yet included.
    InMempool,
    /// Included but execution reverted.
    Reverted,
    /// The node has never seen the transaction.
    Unknown,
}

/// Current unix time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
