//! # Claim Workflow
//!
//! Turns a one-time redeem code into exactly one minted token.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A claim touches three systems that cannot share a transaction: the
//! record store, the metadata publisher and the chain node. The controller
//! keeps the outcome at-most-once anyway:
//!
//! | Concern | Mechanism |
//! |---------|-----------|
//! | Concurrent claims | Compare-and-set on `(state, revision)` into `Pending` |
//! | Slow or dead executions | Lease with heartbeat, taken over once expired |
//! | Crash after broadcast | Signed transaction persisted first, then reconciled |
//! | Caller disconnects | Workflow runs in a detached task |
//! | Stuck dependencies | Every external call has its own timeout |
//!
//! ## Module Structure
//!
//! ```text
//! claim-workflow/
//! ├── domain/          # ClaimRecord, state machine, wallet, errors, config
//! ├── algorithms/      # Metadata, sequencer, reconciliation, receipts
//! ├── ports/           # ClaimApi, RecordStore, MetadataPublisher, ...
//! ├── adapters/        # In-memory backends with fault hooks
//! └── service.rs       # ClaimWorkflowController
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{InMemoryChain, InMemoryPublisher, InMemoryStore, StaticSigner};
pub use algorithms::{
    build_metadata, decide, encode_metadata, format_receipt, network_info, status_view,
    ClaimReceipt, ClaimStatusView, MintSequencer, NetworkInfo, ReconcileDecision,
};
pub use domain::{
    check_record_update, now_ms, to_checksum, ClaimError, ClaimRecord, ClaimState, ContentRef,
    ErrorKind, GasParams, Lease, MetadataAttribute, MetadataTemplate, MintIntent, MintSlot,
    PublishError, SignError, SignedIntent, StateGuard, StepFailure, StoreError,
    SubmissionEvidence, SubmitError, TokenMetadata, TxHandle, TxStatus, WalletAddress,
    WalletError, WorkflowConfig, WorkflowStep,
};
pub use ports::{
    ClaimApi, IntentSigner, MetadataPublisher, RecordStore, RecoveryReport, TransactionSubmitter,
};
pub use service::{validate_code, ClaimPorts, ClaimWorkflowController, MAX_CODE_LEN};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
