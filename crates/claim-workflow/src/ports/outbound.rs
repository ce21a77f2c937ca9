//! # Outbound Ports
//!
//! Narrow capability traits for the external systems a claim touches.

use crate::domain::{
    ClaimRecord, ClaimState, ContentRef, MintIntent, PublishError, SignError, SignedIntent,
    StateGuard, StoreError, SubmitError, TxHandle, TxStatus,
};
use async_trait::async_trait;

/// Durable code -> record mapping - outbound port.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load a record.
    async fn get(&self, code: &str) -> Result<Option<ClaimRecord>, StoreError>;

    /// Replace the record iff its current `(state, revision)` matches `expected`.
    ///
    /// Returns `false` when the guard did not match (or the code is unknown).
    async fn compare_and_set(
        &self,
        code: &str,
        expected: StateGuard,
        new: ClaimRecord,
    ) -> Result<bool, StoreError>;

    /// Insert a fresh record; `false` if the code already exists.
    async fn insert_if_absent(&self, record: ClaimRecord) -> Result<bool, StoreError>;

    /// All records currently in `state`.
    async fn list_by_state(&self, state: ClaimState) -> Result<Vec<ClaimRecord>, StoreError>;
}

/// Content-addressed metadata storage - outbound port.
#[async_trait]
pub trait MetadataPublisher: Send + Sync {
    /// Upload opaque bytes and return their content reference.
    async fn publish(&self, bytes: Vec<u8>) -> Result<ContentRef, PublishError>;
}

/// Chain node - outbound port.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Next nonce for `account`, counting transactions in the mempool.
    async fn pending_nonce(&self, account: &str) -> Result<u64, SubmitError>;

    /// Next nonce for `account` in the latest block, mined transactions only.
    async fn latest_nonce(&self, account: &str) -> Result<u64, SubmitError>;

    /// Network identity.
    async fn network_id(&self) -> Result<u64, SubmitError>;

    /// Tokens minted so far by the collection contract, as of the latest block.
    async fn token_count(&self) -> Result<u64, SubmitError>;

    /// Broadcast a signed transaction.
    async fn submit(&self, signed: &SignedIntent) -> Result<TxHandle, SubmitError>;

    /// Current status of a transaction.
    async fn query_status(&self, handle: &TxHandle) -> Result<TxStatus, SubmitError>;
}

/// Local signing of mint intents - outbound port.
pub trait IntentSigner: Send + Sync {
    /// Checksummed address of the signing account.
    fn account(&self) -> String;

    /// Checksummed address of the collection contract.
    fn contract(&self) -> String;

    /// Sign `intent` for `network_id`.
    fn sign(&self, intent: &MintIntent, network_id: u64) -> Result<SignedIntent, SignError>;
}
