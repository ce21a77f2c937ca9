//! In-memory chain node.
//!
//! Models what the controller relies on: one signing account whose nonce
//! orders inclusion, a contract counter advanced by every included mint,
//! and idempotent acceptance of an already known transaction.
//!
//! Blocks are mined on every broadcast by default. With auto-mining off,
//! transactions wait in the mempool until [`InMemoryChain::mine`]; the
//! pending nonce counts them while the contract counter does not, as on a
//! real node.

use crate::domain::{SignedIntent, SubmitError, TxHandle, TxStatus};
use crate::ports::TransactionSubmitter;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Default)]
struct ChainState {
    account_nonce: u64,
    token_count: u64,
    statuses: HashMap<String, TxStatus>,
    queued: BTreeMap<u64, String>,
    included: Vec<(TxHandle, u64)>,
    broadcasts: usize,
    should_fail: bool,
    fail_submits: usize,
    drop_responses: usize,
    submit_delay: Option<Duration>,
    manual_mining: bool,
}

impl ChainState {
    /// Next nonce after the mined nonce and the contiguous mempool run.
    fn pending_nonce(&self) -> u64 {
        let mut nonce = self.account_nonce;
        while self.queued.contains_key(&nonce) {
            nonce += 1;
        }
        nonce
    }

    fn include_ready(&mut self) {
        while let Some(hash) = self.queued.remove(&self.account_nonce) {
            self.statuses.insert(hash.clone(), TxStatus::Included);
            self.included.push((TxHandle(hash), self.token_count));
            self.token_count += 1;
            self.account_nonce += 1;
        }
    }
}

/// Chain node fake with fault hooks.
#[derive(Debug)]
pub struct InMemoryChain {
    network_id: u64,
    state: Mutex<ChainState>,
}

impl InMemoryChain {
    /// Create a chain with the given network id.
    pub fn new(network_id: u64) -> Self {
        Self {
            network_id,
            state: Mutex::new(ChainState::default()),
        }
    }

    /// Fail every call.
    pub fn set_should_fail(&self, fail: bool) {
        self.state.lock().should_fail = fail;
    }

    /// Reject the next `n` broadcasts before the node sees them.
    pub fn fail_next_submits(&self, n: usize) {
        self.state.lock().fail_submits = n;
    }

    /// Accept the next `n` broadcasts but report a transport error.
    pub fn drop_next_responses(&self, n: usize) {
        self.state.lock().drop_responses = n;
    }

    /// Delay every broadcast.
    pub fn set_submit_delay(&self, delay: Option<Duration>) {
        self.state.lock().submit_delay = delay;
    }

    /// Mine on every broadcast (the default) or only on [`Self::mine`].
    pub fn set_auto_mine(&self, auto: bool) {
        let mut state = self.state.lock();
        state.manual_mining = !auto;
        if auto {
            state.include_ready();
        }
    }

    /// Mine every transaction whose nonce is next in line.
    pub fn mine(&self) {
        self.state.lock().include_ready();
    }

    /// Advance the account nonce as if another transaction used it.
    pub fn set_account_nonce(&self, nonce: u64) {
        let mut state = self.state.lock();
        state.account_nonce = nonce;
        if !state.manual_mining {
            state.include_ready();
        }
    }

    /// Set the contract counter.
    pub fn set_token_count(&self, count: u64) {
        self.state.lock().token_count = count;
    }

    /// Mark an included transaction as reverted.
    pub fn mark_reverted(&self, handle: &TxHandle) {
        let mut state = self.state.lock();
        if let Some(status) = state.statuses.get_mut(&handle.0) {
            *status = TxStatus::Reverted;
        }
    }

    /// Included mints as `(tx, token id)`, in inclusion order.
    pub fn included(&self) -> Vec<(TxHandle, u64)> {
        self.state.lock().included.clone()
    }

    /// Broadcast calls that reached the node, duplicates included.
    pub fn broadcast_count(&self) -> usize {
        self.state.lock().broadcasts
    }

    fn check_available(&self) -> Result<(), SubmitError> {
        if self.state.lock().should_fail {
            return Err(SubmitError::Network("Mock failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionSubmitter for InMemoryChain {
    async fn pending_nonce(&self, _account: &str) -> Result<u64, SubmitError> {
        self.check_available()?;
        Ok(self.state.lock().pending_nonce())
    }

    async fn latest_nonce(&self, _account: &str) -> Result<u64, SubmitError> {
        self.check_available()?;
        Ok(self.state.lock().account_nonce)
    }

    async fn network_id(&self) -> Result<u64, SubmitError> {
        self.check_available()?;
        Ok(self.network_id)
    }

    async fn token_count(&self) -> Result<u64, SubmitError> {
        self.check_available()?;
        Ok(self.state.lock().token_count)
    }

    async fn submit(&self, signed: &SignedIntent) -> Result<TxHandle, SubmitError> {
        let delay = self.state.lock().submit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;

        let mut state = self.state.lock();
        if state.fail_submits > 0 {
            state.fail_submits -= 1;
            return Err(SubmitError::Network("Mock submit failure".to_string()));
        }
        state.broadcasts += 1;

        let hash = signed.tx_ref.0.clone();
        if !state.statuses.contains_key(&hash) {
            if signed.nonce < state.account_nonce {
                return Err(SubmitError::NonceTooLow {
                    used: signed.nonce,
                    expected: state.account_nonce,
                });
            }
            if state.queued.contains_key(&signed.nonce) {
                return Err(SubmitError::Underpriced);
            }
            state.statuses.insert(hash.clone(), TxStatus::InMempool);
            state.queued.insert(signed.nonce, hash.clone());
            if !state.manual_mining {
                state.include_ready();
            }
        }

        if state.drop_responses > 0 {
            state.drop_responses -= 1;
            return Err(SubmitError::Network("Mock connection reset".to_string()));
        }
        Ok(TxHandle(hash))
    }

    async fn query_status(&self, handle: &TxHandle) -> Result<TxStatus, SubmitError> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .statuses
            .get(&handle.0)
            .copied()
            .unwrap_or(TxStatus::Unknown))
    }
}
