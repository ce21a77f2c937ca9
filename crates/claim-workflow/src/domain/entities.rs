//! # Domain Entities
//!
//! The claim record and the values that flow through one mint attempt.

use super::errors::ClaimError;
use super::value_objects::{ClaimState, ContentRef, Lease, TxHandle};
use super::wallet::WalletAddress;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One record per redeem code. Never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Redeem code, immutable.
    pub code: String,
    /// Current state.
    pub state: ClaimState,
    /// Destination wallet, set on the first attempt and never changed.
    pub wallet: Option<WalletAddress>,
    /// Handle of the submitted transaction.
    pub tx_ref: Option<TxHandle>,
    /// Minted token id, set iff `state == Minted`.
    pub token_ref: Option<String>,
    /// Write counter guarding compare-and-set.
    pub revision: u64,
    /// Lease of the owning execution, only while `Pending`.
    pub lease: Option<Lease>,
    /// Signed transaction persisted before broadcast.
    pub submission: Option<SubmissionEvidence>,
    /// Cause of the last failure.
    pub last_error: Option<String>,
    /// Attempts started so far.
    pub attempts: u32,
    /// Provisioning time (unix ms).
    pub created_at_ms: u64,
    /// Last write time (unix ms).
    pub updated_at_ms: u64,
}

/// Expected `(state, revision)` for a compare-and-set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateGuard {
    /// Expected state.
    pub state: ClaimState,
    /// Expected revision.
    pub revision: u64,
}

impl StateGuard {
    /// Check a stored record against this guard.
    pub fn matches(&self, record: &ClaimRecord) -> bool {
        record.state == self.state && record.revision == self.revision
    }
}

impl ClaimRecord {
    /// A freshly provisioned record.
    pub fn unclaimed(code: impl Into<String>, now_ms: u64) -> Self {
        Self {
            code: code.into(),
            state: ClaimState::Unclaimed,
            wallet: None,
            tx_ref: None,
            token_ref: None,
            revision: 0,
            lease: None,
            submission: None,
            last_error: None,
            attempts: 0,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    /// Guard describing this exact version of the record.
    pub fn guard(&self) -> StateGuard {
        StateGuard {
            state: self.state,
            revision: self.revision,
        }
    }

    /// Whether a live lease is held on this record.
    pub fn has_live_lease(&self, now_ms: u64) -> bool {
        self.state == ClaimState::Pending
            && self.lease.as_ref().is_some_and(|l| !l.is_expired(now_ms))
    }

    /// Owner of the current lease.
    pub fn lease_owner(&self) -> Option<Uuid> {
        self.lease.as_ref().map(|l| l.owner)
    }

    /// Network the submission evidence was signed for.
    pub fn network_id(&self) -> Option<u64> {
        self.submission.as_ref().map(|s| s.network_id)
    }

    /// Transition to new state.
    pub fn transition_to(&mut self, next: ClaimState, now_ms: u64) -> Result<(), ClaimError> {
        if !self.state.can_transition_to(next) {
            return Err(ClaimError::InvalidTransition {
                from: format!("{:?}", self.state),
                to: format!("{:?}", next),
            });
        }
        self.state = next;
        self.touch(now_ms);
        Ok(())
    }

    /// `Unclaimed | Failed -> Pending`: bind the wallet and take the lease.
    pub fn begin_attempt(
        &mut self,
        wallet: WalletAddress,
        lease: Lease,
        now_ms: u64,
    ) -> Result<(), ClaimError> {
        if let Some(recorded) = &self.wallet {
            if *recorded != wallet {
                return Err(ClaimError::WalletMismatch {
                    code: self.code.clone(),
                    recorded: recorded.to_string(),
                });
            }
        }
        // An unsettled broadcast could still land; a new nonce would mint twice.
        if self.submission.is_some() {
            return Err(ClaimError::InvalidTransition {
                from: format!("{:?} with unsettled submission", self.state),
                to: format!("{:?}", ClaimState::Pending),
            });
        }
        self.transition_to(ClaimState::Pending, now_ms)?;
        self.wallet = Some(wallet);
        self.lease = Some(lease);
        self.attempts = self.attempts.saturating_add(1);
        Ok(())
    }

    /// `Failed | Pending -> Pending` under a fresh lease, keeping the wallet
    /// and any submission evidence. The caller then reconciles.
    ///
    /// A `Failed` record only qualifies while it still carries evidence.
    pub fn take_over(&mut self, lease: Lease, now_ms: u64) -> Result<(), ClaimError> {
        let eligible = match self.state {
            ClaimState::Pending => true,
            ClaimState::Failed => self.submission.is_some(),
            _ => false,
        };
        if !eligible {
            return Err(ClaimError::InvalidTransition {
                from: format!("{:?}", self.state),
                to: format!("{:?} (takeover)", ClaimState::Pending),
            });
        }
        self.transition_to(ClaimState::Pending, now_ms)?;
        self.lease = Some(lease);
        Ok(())
    }

    /// Extend the lease held by `owner`.
    pub fn renew_lease(
        &mut self,
        owner: Uuid,
        now_ms: u64,
        duration_ms: u64,
    ) -> Result<(), ClaimError> {
        if self.lease_owner() != Some(owner) {
            return Err(ClaimError::LeaseLost(self.code.clone()));
        }
        self.transition_to(ClaimState::Pending, now_ms)?;
        self.lease = Some(Lease::new(owner, now_ms, duration_ms));
        Ok(())
    }

    /// Persist the signed transaction before it is broadcast.
    pub fn record_submission(
        &mut self,
        evidence: SubmissionEvidence,
        now_ms: u64,
    ) -> Result<(), ClaimError> {
        self.transition_to(ClaimState::Pending, now_ms)?;
        self.submission = Some(evidence);
        Ok(())
    }

    /// `-> Minted`: record transaction and token references.
    pub fn mint(&mut self, tx_ref: TxHandle, token_ref: String, now_ms: u64) -> Result<(), ClaimError> {
        self.transition_to(ClaimState::Minted, now_ms)?;
        self.tx_ref = Some(tx_ref);
        self.token_ref = Some(token_ref);
        self.lease = None;
        Ok(())
    }

    /// `-> Minted` from the persisted submission evidence.
    pub fn adopt_submission(&mut self, now_ms: u64) -> Result<(), ClaimError> {
        let evidence = self.submission.clone().ok_or_else(|| ClaimError::InvalidTransition {
            from: format!("{:?} without submission", self.state),
            to: format!("{:?}", ClaimState::Minted),
        })?;
        self.mint(evidence.tx_ref, evidence.token_id.to_string(), now_ms)
    }

    /// `-> Failed`: record the cause and release the lease.
    ///
    /// Submission evidence is kept; a later attempt reconciles it first.
    pub fn fail(&mut self, cause: impl Into<String>, now_ms: u64) -> Result<(), ClaimError> {
        self.transition_to(ClaimState::Failed, now_ms)?;
        self.last_error = Some(cause.into());
        self.lease = None;
        Ok(())
    }

    /// `-> Failed` for a submission that provably can never land.
    pub fn abandon_submission(
        &mut self,
        cause: impl Into<String>,
        now_ms: u64,
    ) -> Result<(), ClaimError> {
        self.fail(cause, now_ms)?;
        self.submission = None;
        Ok(())
    }

    fn touch(&mut self, now_ms: u64) {
        self.revision = self.revision.wrapping_add(1);
        self.updated_at_ms = now_ms;
    }
}

/// Durable evidence of a signed transaction, written before broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionEvidence {
    /// Transaction hash, known before broadcast.
    pub tx_ref: TxHandle,
    /// Account nonce used.
    pub nonce: u64,
    /// Token id the mint is expected to produce.
    pub token_id: u64,
    /// Metadata content reference embedded in the transaction.
    pub content_ref: ContentRef,
    /// Network the transaction was signed for.
    pub network_id: u64,
    /// Signed transaction bytes, hex encoded.
    pub raw_hex: String,
}

impl SubmissionEvidence {
    /// Build evidence from a signed intent.
    pub fn new(signed: &SignedIntent, slot: MintSlot, content_ref: ContentRef, network_id: u64) -> Self {
        Self {
            tx_ref: signed.tx_ref.clone(),
            nonce: slot.nonce,
            token_id: slot.token_id,
            content_ref,
            network_id,
            raw_hex: hex::encode(&signed.raw),
        }
    }

    /// Recreate the identical signed transaction for rebroadcast.
    pub fn to_signed(&self) -> Option<SignedIntent> {
        let raw = hex::decode(&self.raw_hex).ok()?;
        Some(SignedIntent {
            tx_ref: self.tx_ref.clone(),
            nonce: self.nonce,
            raw,
        })
    }
}

/// Nonce and token id reserved for one attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MintSlot {
    /// Account nonce.
    pub nonce: u64,
    /// Expected token id.
    pub token_id: u64,
}

/// Gas parameters supplied by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasParams {
    /// Gas limit in units.
    pub gas_limit: u64,
    /// Gas price in wei.
    pub gas_price_wei: u64,
}

impl Default for GasParams {
    fn default() -> Self {
        Self {
            gas_limit: 3_000_000,
            gas_price_wei: 30_000_000_000, // 30 gwei
        }
    }
}

/// Unsigned mint transaction intent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintIntent {
    /// Destination wallet.
    pub recipient: WalletAddress,
    /// Token URI pointing at published metadata.
    pub token_uri: String,
    /// Account nonce.
    pub nonce: u64,
    /// Gas parameters.
    pub gas: GasParams,
}

/// Signed transaction ready for broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedIntent {
    /// Transaction hash.
    pub tx_ref: TxHandle,
    /// Account nonce.
    pub nonce: u64,
    /// Encoded signed transaction.
    pub raw: Vec<u8>,
}

/// ERC-721 metadata document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Token name.
    pub name: String,
    /// Token description.
    pub description: String,
    /// Image URI.
    pub image: String,
    /// Provenance attributes.
    pub attributes: Vec<MetadataAttribute>,
}

/// One metadata attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    /// Attribute name.
    pub trait_type: String,
    /// Optional display hint (e.g. `date`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
    /// Attribute value.
    pub value: String,
}
