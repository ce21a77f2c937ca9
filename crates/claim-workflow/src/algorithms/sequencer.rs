//! # Mint Sequencer
//!
//! Allocates the signing account's nonce together with the token id the
//! mint is expected to produce. Between syncs both advance in lockstep, so
//! concurrent workflows never sign two transactions with the same nonce.
//!
//! ## Sync
//!
//! The contract counter is only readable at the latest block, while the
//! next nonce has to count the mempool. The cursor therefore anchors at
//! `count(latest) + (nonce(pending) - nonce(latest))`: every transaction of
//! this account still in the mempool is assumed to be a mint.
//!
//! ## Slot lifecycle
//!
//! Each allocated slot is settled exactly once:
//! - [`MintSequencer::complete`] after a broadcast that went through;
//! - [`MintSequencer::release`] when the attempt stopped before broadcasting,
//!   so the slot is handed out again before the cursor advances;
//! - [`MintSequencer::invalidate`] when the broadcast may or may not have
//!   landed, which marks the cursor stale.
//!
//! A stale cursor is only resynced once no slot is outstanding and no
//! released slot is waiting; resyncing earlier would hand out a nonce that a
//! running attempt already holds.
//!
//! The token id is a prediction: the contract assigns ids in mint order, so
//! it holds as long as this account is the only minter.

use crate::algorithms::steps::bounded;
use crate::domain::{MintSlot, StepFailure, WorkflowStep};
use crate::ports::TransactionSubmitter;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Clone, Copy, Debug)]
struct Cursor {
    base_nonce: u64,
    base_token: u64,
    next_nonce: u64,
}

#[derive(Debug, Default)]
struct SequencerState {
    cursor: Option<Cursor>,
    stale: bool,
    outstanding: usize,
    /// Slots given back before broadcast, by nonce.
    released: BTreeMap<u64, u64>,
}

impl SequencerState {
    fn needs_sync(&self) -> bool {
        match self.cursor {
            None => true,
            Some(_) => self.stale && self.outstanding == 0 && self.released.is_empty(),
        }
    }
}

/// Nonce/token-id allocator shared by all workflows of one signer.
#[derive(Debug, Default)]
pub struct MintSequencer {
    state: Mutex<SequencerState>,
}

impl MintSequencer {
    /// Create an unsynced sequencer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next slot, syncing from the chain when needed.
    pub async fn allocate(
        &self,
        submitter: &dyn TransactionSubmitter,
        account: &str,
        timeout: Duration,
    ) -> Result<MintSlot, StepFailure> {
        let mut state = self.state.lock().await;

        if let Some((nonce, token_id)) = state.released.pop_first() {
            state.outstanding += 1;
            debug!(nonce, token_id, "[claim] reusing released mint slot");
            return Ok(MintSlot { nonce, token_id });
        }

        if state.needs_sync() {
            let cursor = sync(submitter, account, timeout).await?;
            state.cursor = Some(cursor);
            state.stale = false;
        }
        let Some(cursor) = state.cursor else {
            return Err(StepFailure::new(WorkflowStep::Sequence, "cursor not synced"));
        };

        let slot = MintSlot {
            nonce: cursor.next_nonce,
            token_id: cursor.base_token + (cursor.next_nonce - cursor.base_nonce),
        };
        state.cursor = Some(Cursor {
            next_nonce: cursor.next_nonce + 1,
            ..cursor
        });
        state.outstanding += 1;
        Ok(slot)
    }

    /// Settle a slot whose transaction was broadcast.
    pub async fn complete(&self) {
        let mut state = self.state.lock().await;
        state.outstanding = state.outstanding.saturating_sub(1);
    }

    /// Give back a slot that was never broadcast.
    pub async fn release(&self, slot: MintSlot) {
        let mut state = self.state.lock().await;
        state.outstanding = state.outstanding.saturating_sub(1);
        state.released.insert(slot.nonce, slot.token_id);
    }

    /// Settle a slot whose broadcast outcome is unknown; resync once idle.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.outstanding = state.outstanding.saturating_sub(1);
        state.stale = true;
    }

    /// Slots allocated and not yet settled.
    pub async fn outstanding(&self) -> usize {
        self.state.lock().await.outstanding
    }
}

async fn sync(
    submitter: &dyn TransactionSubmitter,
    account: &str,
    timeout: Duration,
) -> Result<Cursor, StepFailure> {
    let pending = bounded(
        WorkflowStep::Sequence,
        timeout,
        submitter.pending_nonce(account),
    )
    .await?;
    let latest = bounded(
        WorkflowStep::Sequence,
        timeout,
        submitter.latest_nonce(account),
    )
    .await?;
    let count = bounded(WorkflowStep::Sequence, timeout, submitter.token_count()).await?;

    let in_mempool = pending.saturating_sub(latest);
    debug!(pending, latest, count, "[claim] mint sequencer synced from chain");
    Ok(Cursor {
        base_nonce: pending,
        base_token: count + in_mempool,
        next_nonce: pending,
    })
}
