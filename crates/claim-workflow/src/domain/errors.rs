//! # Domain Errors
//!
//! Error types for the claim workflow and for each outbound port.

use super::value_objects::WorkflowStep;
use thiserror::Error;

/// Broad error classes used by callers to pick a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before any side effect.
    Input,
    /// The code does not exist.
    NotFound,
    /// Another execution owns the code, or the code is bound to another wallet.
    Conflict,
    /// An external system failed; the record is safe to retry.
    Transient,
    /// An external call did not answer in time; the record is safe to retry.
    Timeout,
}

/// Claim workflow errors.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Unknown redeem code.
    #[error("Redeem code {0} not found")]
    NotFound(String),

    /// Wallet failed format or checksum validation.
    #[error("Invalid wallet address: {0}")]
    InvalidWallet(#[from] WalletError),

    /// Redeem code failed format validation.
    #[error("Invalid redeem code: {0}")]
    InvalidCode(String),

    /// Another workflow execution holds the lease for this code.
    #[error("Claim already in progress for code {0}")]
    ClaimInProgress(String),

    /// The code is durably bound to a different wallet.
    #[error("Redeem code {code} is already bound to wallet {recorded}")]
    WalletMismatch {
        /// Redeem code
        code: String,
        /// Wallet recorded on the first attempt
        recorded: String,
    },

    /// A state transition not allowed by the claim state machine.
    #[error("Invalid claim transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Attempted state
        to: String,
    },

    /// The lease was taken over while this execution was running.
    #[error("Lease lost for code {0}")]
    LeaseLost(String),

    /// A workflow step failed.
    #[error("Mint failed during {step}: {cause}")]
    StepFailed {
        /// Failing step
        step: WorkflowStep,
        /// Failure cause
        cause: String,
    },

    /// A workflow step exceeded its time budget.
    #[error("Timed out after {timeout_ms}ms during {step}")]
    Timeout {
        /// Step that timed out
        step: WorkflowStep,
        /// Budget in milliseconds
        timeout_ms: u64,
    },

    /// Record store failure outside a workflow step.
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// The detached workflow task panicked or was cancelled by the runtime.
    #[error("Workflow task aborted: {0}")]
    Aborted(String),
}

impl ClaimError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidWallet(_) | Self::InvalidCode(_) => ErrorKind::Input,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ClaimInProgress(_) | Self::WalletMismatch { .. } | Self::LeaseLost(_) => {
                ErrorKind::Conflict
            }
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::InvalidTransition { .. }
            | Self::StepFailed { .. }
            | Self::Store(_)
            | Self::Aborted(_) => ErrorKind::Transient,
        }
    }

    /// Whether the same request may be retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transient | ErrorKind::Timeout | ErrorKind::Conflict
        ) && !matches!(self, Self::WalletMismatch { .. })
    }
}

/// A failure captured while executing one workflow step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepFailure {
    /// Step that failed.
    pub step: WorkflowStep,
    /// Human readable cause, persisted as `last_error`.
    pub cause: String,
    /// Set when the step exceeded its budget.
    pub timeout_ms: Option<u64>,
}

impl StepFailure {
    /// Failure with a cause.
    pub fn new(step: WorkflowStep, cause: impl ToString) -> Self {
        Self {
            step,
            cause: cause.to_string(),
            timeout_ms: None,
        }
    }

    /// Failure caused by an elapsed timeout.
    pub fn timed_out(step: WorkflowStep, timeout_ms: u64) -> Self {
        Self {
            step,
            cause: format!("timed out after {}ms", timeout_ms),
            timeout_ms: Some(timeout_ms),
        }
    }

    /// Text stored in the record.
    pub fn describe(&self) -> String {
        format!("{}: {}", self.step, self.cause)
    }
}

impl From<StepFailure> for ClaimError {
    fn from(failure: StepFailure) -> Self {
        match failure.timeout_ms {
            Some(timeout_ms) => ClaimError::Timeout {
                step: failure.step,
                timeout_ms,
            },
            None => ClaimError::StepFailed {
                step: failure.step,
                cause: failure.cause,
            },
        }
    }
}

/// Wallet validation errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    /// Missing `0x` prefix.
    #[error("missing 0x prefix")]
    MissingPrefix,

    /// Wrong number of hex digits.
    #[error("expected 40 hex digits, got {0}")]
    InvalidLength(usize),

    /// Non-hex character.
    #[error("invalid hex character {0:?}")]
    InvalidCharacter(char),

    /// Mixed-case address whose casing does not match EIP-55.
    #[error("checksum mismatch")]
    ChecksumMismatch,
}

/// Record store errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or refusing requests.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded.
    #[error("Corrupted record {code}: {reason}")]
    Corrupted {
        /// Redeem code
        code: String,
        /// Decode failure
        reason: String,
    },

    /// Local I/O failure.
    #[error("Store I/O error: {0}")]
    Io(String),
}

/// Metadata publisher errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PublishError {
    /// Publisher answered with a non-success status.
    #[error("Publisher rejected upload ({status}): {body}")]
    Rejected {
        /// HTTP-like status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Transport failure.
    #[error("Publisher unreachable: {0}")]
    Network(String),

    /// Response could not be understood.
    #[error("Malformed publisher response: {0}")]
    Malformed(String),
}

/// Transaction submitter errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The node refused the transaction.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// The nonce was already used.
    #[error("Nonce too low: used {used}, expected at least {expected}")]
    NonceTooLow {
        /// Nonce carried by the transaction
        used: u64,
        /// Next nonce known to the node
        expected: u64,
    },

    /// Gas price below the node's floor.
    #[error("Transaction underpriced")]
    Underpriced,

    /// JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// Transport failure.
    #[error("Chain node unreachable: {0}")]
    Network(String),

    /// Response could not be understood.
    #[error("Malformed node response: {0}")]
    Malformed(String),
}

/// Intent signer errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignError {
    /// Key material could not be parsed.
    #[error("Invalid signing key")]
    InvalidKey,

    /// Destination or contract address is not 20 bytes of hex.
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    /// Signing primitive failed.
    #[error("Signing failed: {0}")]
    Signing(String),
}
