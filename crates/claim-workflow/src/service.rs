//! # Claim Workflow Controller
//!
//! Decides, per redeem code, whether a mint attempt may proceed and drives
//! it through publish, sign and submit while holding a renewable lease.
//!
//! ## Exclusivity
//!
//! Entering `Pending` is a compare-and-set on `(state, revision)`; the
//! winner holds a lease renewed every third of its duration. Every later
//! write of the attempt goes through the same compare-and-set, so an
//! execution whose lease was taken over can no longer write or broadcast.
//!
//! ## Durability order
//!
//! The signed transaction is persisted before it is broadcast. A record
//! found `Pending` with an expired lease, or `Failed` with submission
//! evidence, is taken over under a fresh lease and reconciled against the
//! chain before anything else happens.

use crate::algorithms::{
    bounded, build_metadata, decide, encode_metadata, format_receipt, status_view, ClaimReceipt,
    ClaimStatusView, MintSequencer, ReconcileDecision,
};
use crate::domain::{
    check_record_update, now_ms, ClaimError, ClaimRecord, ClaimState, Lease, MetadataTemplate,
    MintIntent, MintSlot, StepFailure, StoreError, SubmissionEvidence, WalletAddress, WorkflowConfig,
    WorkflowStep,
};
use crate::ports::{
    ClaimApi, IntentSigner, MetadataPublisher, RecordStore, RecoveryReport, TransactionSubmitter,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Longest accepted redeem code.
pub const MAX_CODE_LEN: usize = 64;

/// Outbound ports the controller talks to.
#[derive(Clone)]
pub struct ClaimPorts {
    /// Record store.
    pub store: Arc<dyn RecordStore>,
    /// Metadata publisher.
    pub publisher: Arc<dyn MetadataPublisher>,
    /// Chain node.
    pub submitter: Arc<dyn TransactionSubmitter>,
    /// Transaction signer.
    pub signer: Arc<dyn IntentSigner>,
}

/// The claim controller. Cheap to clone.
#[derive(Clone)]
pub struct ClaimWorkflowController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    store: Arc<dyn RecordStore>,
    publisher: Arc<dyn MetadataPublisher>,
    submitter: Arc<dyn TransactionSubmitter>,
    signer: Arc<dyn IntentSigner>,
    sequencer: MintSequencer,
    network_id: OnceCell<u64>,
    config: WorkflowConfig,
    template: MetadataTemplate,
}

enum AttemptError {
    Step(StepFailure),
    LeaseLost,
}

impl From<StepFailure> for AttemptError {
    fn from(failure: StepFailure) -> Self {
        AttemptError::Step(failure)
    }
}

impl ClaimWorkflowController {
    /// Create a controller.
    pub fn new(ports: ClaimPorts, config: WorkflowConfig, template: MetadataTemplate) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                store: ports.store,
                publisher: ports.publisher,
                submitter: ports.submitter,
                signer: ports.signer,
                sequencer: MintSequencer::new(),
                network_id: OnceCell::new(),
                config,
                template,
            }),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &WorkflowConfig {
        &self.inner.config
    }
}

#[async_trait]
impl ClaimApi for ClaimWorkflowController {
    async fn claim(&self, code: &str, wallet: &str) -> Result<ClaimReceipt, ClaimError> {
        let inner = Arc::clone(&self.inner);
        let code = code.to_string();
        let wallet = wallet.to_string();
        // Detached: dropping the caller's future does not stop the workflow.
        let handle = tokio::spawn(async move { inner.claim(&code, &wallet).await });
        handle
            .await
            .map_err(|e| ClaimError::Aborted(e.to_string()))?
    }

    async fn check(&self, code: &str) -> Result<ClaimStatusView, ClaimError> {
        validate_code(code)?;
        let record = self.inner.load(code).await?;
        Ok(status_view(&record))
    }

    async fn recover_pending(&self) -> Result<RecoveryReport, ClaimError> {
        self.inner.recover_pending().await
    }
}

/// Reject codes that cannot have been provisioned.
pub fn validate_code(code: &str) -> Result<(), ClaimError> {
    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return Err(ClaimError::InvalidCode(format!(
            "length must be 1..={}",
            MAX_CODE_LEN
        )));
    }
    if let Some(bad) = code
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(ClaimError::InvalidCode(format!(
            "unexpected character {:?}",
            bad
        )));
    }
    Ok(())
}

impl ControllerInner {
    async fn claim(self: &Arc<Self>, code: &str, wallet: &str) -> Result<ClaimReceipt, ClaimError> {
        validate_code(code)?;
        let mut record = self.load(code).await?;
        let wallet = WalletAddress::parse(wallet).map_err(|e| {
            debug!(code = %code, error = %e, "[claim] rejected wallet");
            ClaimError::from(e)
        })?;

        let mut reconciled = false;
        loop {
            match record.state {
                ClaimState::Minted => return self.replay(&record).await,
                ClaimState::Pending => {
                    if reconciled || record.has_live_lease(now_ms()) {
                        return Err(ClaimError::ClaimInProgress(code.to_string()));
                    }
                    info!(code = %code, "[claim] lease expired, reconciling orphaned attempt");
                }
                ClaimState::Unclaimed | ClaimState::Failed => {
                    if let Some(recorded) = &record.wallet {
                        if *recorded != wallet {
                            return Err(ClaimError::WalletMismatch {
                                code: code.to_string(),
                                recorded: recorded.to_string(),
                            });
                        }
                    }
                    let Some(evidence) = &record.submission else {
                        break;
                    };
                    if reconciled {
                        return Err(ClaimError::StepFailed {
                            step: WorkflowStep::QueryStatus,
                            cause: format!("earlier submission {} is unresolved", evidence.tx_ref),
                        });
                    }
                }
            }

            record = match self.take_over(&record).await? {
                Some(leased) => self.reconcile(leased).await?,
                None => self.load(code).await?,
            };
            reconciled = true;
        }

        let owner = Uuid::new_v4();
        let now = now_ms();
        let mut next = record.clone();
        next.begin_attempt(wallet, Lease::new(owner, now, self.config.lease_ms()), now)?;
        if !self.commit(&record, &next, WorkflowStep::Store).await? {
            return Err(ClaimError::ClaimInProgress(code.to_string()));
        }
        info!(
            code = %code,
            wallet = %next.wallet.as_ref().map(|w| w.as_str()).unwrap_or_default(),
            attempt = next.attempts,
            "[claim] attempt started"
        );

        self.run_attempt(next).await
    }

    async fn run_attempt(self: &Arc<Self>, record: ClaimRecord) -> Result<ClaimReceipt, ClaimError> {
        let code = record.code.clone();
        let keeper = LeaseKeeper::start(Arc::clone(self), record.clone());

        let outcome = match self.execute(&keeper, &record).await {
            Ok(minted) => {
                info!(
                    code = %code,
                    token_ref = minted.token_ref.as_deref().unwrap_or_default(),
                    tx_ref = %minted.tx_ref.as_ref().map(|t| t.0.as_str()).unwrap_or_default(),
                    "[claim] minted"
                );
                let network_id = minted.network_id().unwrap_or_default();
                self.receipt(&minted, network_id, false)
            }
            Err(AttemptError::LeaseLost) => {
                warn!(code = %code, "[claim] lease taken over, abandoning attempt");
                Err(ClaimError::LeaseLost(code.clone()))
            }
            Err(AttemptError::Step(failure)) => {
                let cause = failure.describe();
                warn!(code = %code, step = %failure.step, cause = %failure.cause, "[claim] attempt failed");
                let recorded = keeper
                    .update(self, WorkflowStep::Store, |r| r.fail(cause, now_ms()))
                    .await;
                if recorded.is_err() {
                    error!(code = %code, "[claim] could not record failure; left for reconciliation");
                }
                Err(failure.into())
            }
        };

        keeper.stop().await;
        outcome
    }

    async fn execute(
        &self,
        keeper: &LeaseKeeper,
        record: &ClaimRecord,
    ) -> Result<ClaimRecord, AttemptError> {
        let code = record.code.as_str();
        let wallet = record
            .wallet
            .clone()
            .ok_or_else(|| StepFailure::new(WorkflowStep::Store, "pending record without wallet"))?;

        let slot = self
            .sequencer
            .allocate(
                self.submitter.as_ref(),
                &self.signer.account(),
                self.config.chain_query_timeout,
            )
            .await?;
        debug!(code = %code, nonce = slot.nonce, token_id = slot.token_id, "[claim] slot allocated");

        let mut broadcast = false;
        let outcome = self
            .mint_slot(keeper, code, wallet, slot, &mut broadcast)
            .await;
        match (&outcome, broadcast) {
            (Ok(_), _) => self.sequencer.complete().await,
            (Err(_), false) => self.sequencer.release(slot).await,
            (Err(_), true) => self.sequencer.invalidate().await,
        }
        outcome
    }

    /// Publish, sign, persist and broadcast for one allocated slot.
    ///
    /// `broadcast` is set just before the transaction leaves the process.
    async fn mint_slot(
        &self,
        keeper: &LeaseKeeper,
        code: &str,
        wallet: WalletAddress,
        slot: MintSlot,
        broadcast: &mut bool,
    ) -> Result<ClaimRecord, AttemptError> {
        let metadata = build_metadata(&self.template, slot.token_id);
        let bytes = encode_metadata(&metadata)?;
        let content = bounded(
            WorkflowStep::Publish,
            self.config.publish_timeout,
            self.publisher.publish(bytes),
        )
        .await?;
        debug!(code = %code, content = %content, "[claim] metadata published");

        let network_id = self.network_id().await?;
        let intent = MintIntent {
            recipient: wallet,
            token_uri: content.token_uri(),
            nonce: slot.nonce,
            gas: self.config.gas,
        };
        let signed = self
            .signer
            .sign(&intent, network_id)
            .map_err(|e| StepFailure::new(WorkflowStep::Sign, e))?;

        let evidence = SubmissionEvidence::new(&signed, slot, content, network_id);
        keeper
            .update(self, WorkflowStep::PersistEvidence, move |r| {
                r.record_submission(evidence, now_ms())
            })
            .await?;

        *broadcast = true;
        let handle = bounded(
            WorkflowStep::Submit,
            self.config.submit_timeout,
            self.submitter.submit(&signed),
        )
        .await?;
        debug!(code = %code, tx_ref = %handle, "[claim] transaction submitted");

        let token_ref = slot.token_id.to_string();
        keeper
            .update(self, WorkflowStep::PersistMinted, move |r| {
                r.mint(handle, token_ref, now_ms())
            })
            .await
    }

    /// Take a fresh lease on an orphaned or failed-with-evidence record so
    /// that exactly one execution reconciles it.
    ///
    /// `None` if another execution moved the record first.
    async fn take_over(&self, record: &ClaimRecord) -> Result<Option<ClaimRecord>, ClaimError> {
        let now = now_ms();
        let mut next = record.clone();
        next.take_over(Lease::new(Uuid::new_v4(), now, self.config.lease_ms()), now)?;
        if self.commit(record, &next, WorkflowStep::Store).await? {
            Ok(Some(next))
        } else {
            debug!(code = %record.code, "[claim] record taken over by another execution");
            Ok(None)
        }
    }

    /// Settle a `Pending` record held under this execution's lease.
    async fn reconcile(&self, record: ClaimRecord) -> Result<ClaimRecord, ClaimError> {
        if record.state != ClaimState::Pending {
            return Ok(record);
        }
        match self.settle(&record).await {
            Ok(next) => self.commit_reconciled(&record, next).await,
            Err(e) => {
                // Release the lease; the evidence stays for the next attempt.
                let mut released = record.clone();
                released.fail(e.to_string(), now_ms())?;
                if let Err(failure) = self.commit(&record, &released, WorkflowStep::Store).await {
                    warn!(code = %record.code, cause = %failure.cause, "[claim] could not release reconciliation lease");
                }
                Err(e)
            }
        }
    }

    async fn settle(&self, record: &ClaimRecord) -> Result<ClaimRecord, ClaimError> {
        let now = now_ms();
        let mut next = record.clone();

        let Some(evidence) = record.submission.clone() else {
            next.fail("interrupted before submission", now)?;
            info!(code = %record.code, "[claim] orphaned attempt never submitted");
            return Ok(next);
        };

        let timeout = self.config.chain_query_timeout;
        let status = bounded(
            WorkflowStep::QueryStatus,
            timeout,
            self.submitter.query_status(&evidence.tx_ref),
        )
        .await?;
        let pending_nonce = bounded(
            WorkflowStep::QueryStatus,
            timeout,
            self.submitter.pending_nonce(&self.signer.account()),
        )
        .await?;

        match decide(status, evidence.nonce, pending_nonce) {
            ReconcileDecision::Adopt => {
                next.adopt_submission(now)?;
                info!(code = %record.code, tx_ref = %evidence.tx_ref, ?status, "[claim] adopted earlier submission");
            }
            ReconcileDecision::Abandon(reason) => {
                warn!(code = %record.code, tx_ref = %evidence.tx_ref, reason = %reason, "[claim] earlier submission cannot land");
                next.abandon_submission(reason, now)?;
            }
            ReconcileDecision::Rebroadcast => {
                let signed = evidence.to_signed().ok_or_else(|| {
                    StoreError::Corrupted {
                        code: record.code.clone(),
                        reason: "submission bytes are not valid hex".to_string(),
                    }
                })?;
                match bounded(
                    WorkflowStep::Submit,
                    self.config.submit_timeout,
                    self.submitter.submit(&signed),
                )
                .await
                {
                    Ok(_) => {
                        info!(code = %record.code, tx_ref = %evidence.tx_ref, "[claim] rebroadcast earlier submission");
                        next.adopt_submission(now)?;
                    }
                    Err(failure) => {
                        warn!(code = %record.code, cause = %failure.cause, "[claim] rebroadcast failed");
                        next.fail(failure.describe(), now)?;
                    }
                }
            }
        }
        Ok(next)
    }

    async fn recover_pending(&self) -> Result<RecoveryReport, ClaimError> {
        let timeout = self.config.store_timeout;
        let pending = bounded(
            WorkflowStep::Store,
            timeout,
            self.store.list_by_state(ClaimState::Pending),
        )
        .await?;
        let failed = bounded(
            WorkflowStep::Store,
            timeout,
            self.store.list_by_state(ClaimState::Failed),
        )
        .await?;

        let now = now_ms();
        let mut report = RecoveryReport::default();
        let candidates = pending
            .into_iter()
            .chain(failed.into_iter().filter(|r| r.submission.is_some()));

        for record in candidates {
            report.scanned += 1;
            if !self.config.reconcile_all_on_startup && record.has_live_lease(now) {
                report.skipped += 1;
                continue;
            }
            let code = record.code.clone();
            let leased = match self.take_over(&record).await {
                Ok(Some(leased)) => leased,
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    report.errors += 1;
                    warn!(code = %code, error = %e, "[claim] takeover failed");
                    continue;
                }
            };
            match self.reconcile(leased).await {
                Ok(r) if r.state == ClaimState::Minted => report.minted += 1,
                Ok(r) if r.state == ClaimState::Failed => report.failed += 1,
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    report.errors += 1;
                    warn!(code = %code, error = %e, "[claim] reconciliation deferred");
                }
            }
        }

        info!(
            scanned = report.scanned,
            minted = report.minted,
            failed = report.failed,
            skipped = report.skipped,
            errors = report.errors,
            "[claim] startup recovery complete"
        );
        Ok(report)
    }

    async fn load(&self, code: &str) -> Result<ClaimRecord, ClaimError> {
        bounded(
            WorkflowStep::Store,
            self.config.store_timeout,
            self.store.get(code),
        )
        .await?
        .ok_or_else(|| ClaimError::NotFound(code.to_string()))
    }

    /// Guarded write of `after` over `before`.
    async fn commit(
        &self,
        before: &ClaimRecord,
        after: &ClaimRecord,
        step: WorkflowStep,
    ) -> Result<bool, StepFailure> {
        check_record_update(before, after).map_err(|e| StepFailure::new(step, e))?;
        bounded(
            step,
            self.config.store_timeout,
            self.store
                .compare_and_set(&before.code, before.guard(), after.clone()),
        )
        .await
    }

    async fn commit_reconciled(
        &self,
        before: &ClaimRecord,
        after: ClaimRecord,
    ) -> Result<ClaimRecord, ClaimError> {
        if self.commit(before, &after, WorkflowStep::Store).await? {
            return Ok(after);
        }
        debug!(code = %before.code, "[claim] record moved during reconciliation, reloading");
        self.load(&before.code).await
    }

    async fn replay(&self, record: &ClaimRecord) -> Result<ClaimReceipt, ClaimError> {
        let network_id = match record.network_id() {
            Some(id) => id,
            None => self.network_id().await?,
        };
        debug!(code = %record.code, "[claim] replaying minted claim");
        self.receipt(record, network_id, true)
    }

    fn receipt(
        &self,
        record: &ClaimRecord,
        network_id: u64,
        already_claimed: bool,
    ) -> Result<ClaimReceipt, ClaimError> {
        format_receipt(record, network_id, &self.signer.contract(), already_claimed).ok_or_else(
            || {
                ClaimError::Store(StoreError::Corrupted {
                    code: record.code.clone(),
                    reason: "minted record without wallet or references".to_string(),
                })
            },
        )
    }

    async fn network_id(&self) -> Result<u64, StepFailure> {
        self.network_id
            .get_or_try_init(|| {
                bounded(
                    WorkflowStep::NetworkId,
                    self.config.chain_query_timeout,
                    self.submitter.network_id(),
                )
            })
            .await
            .copied()
    }
}

/// Holds the lease of one running attempt.
///
/// Owns the latest committed version of the record; the heartbeat and the
/// workflow serialize their writes through it.
struct LeaseKeeper {
    record: Arc<Mutex<ClaimRecord>>,
    lost: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    heartbeat: JoinHandle<()>,
}

impl LeaseKeeper {
    fn start(inner: Arc<ControllerInner>, record: ClaimRecord) -> Self {
        let owner = record.lease_owner().unwrap_or_else(Uuid::nil);
        let record = Arc::new(Mutex::new(record));
        let lost = Arc::new(AtomicBool::new(false));
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let heartbeat = tokio::spawn({
            let record = Arc::clone(&record);
            let lost = Arc::clone(&lost);
            async move {
                let interval = inner.config.heartbeat_interval();
                loop {
                    tokio::select! {
                        _ = stop_rx.changed() => break,
                        _ = tokio::time::sleep(interval) => {}
                    }

                    let mut current = record.lock().await;
                    if current.state != ClaimState::Pending || lost.load(Ordering::SeqCst) {
                        break;
                    }
                    let mut next = current.clone();
                    if next
                        .renew_lease(owner, now_ms(), inner.config.lease_ms())
                        .is_err()
                    {
                        lost.store(true, Ordering::SeqCst);
                        break;
                    }
                    match inner.commit(&current, &next, WorkflowStep::Store).await {
                        Ok(true) => {
                            *current = next;
                            debug!(code = %current.code, "[claim] lease renewed");
                        }
                        Ok(false) => {
                            lost.store(true, Ordering::SeqCst);
                            warn!(code = %current.code, "[claim] lease renewal lost the race");
                            break;
                        }
                        Err(failure) => {
                            warn!(code = %current.code, cause = %failure.cause, "[claim] lease renewal failed, retrying");
                        }
                    }
                }
            }
        });

        Self {
            record,
            lost,
            stop_tx,
            heartbeat,
        }
    }

    /// Apply `change` to the current record and commit it.
    async fn update<F>(
        &self,
        inner: &ControllerInner,
        step: WorkflowStep,
        change: F,
    ) -> Result<ClaimRecord, AttemptError>
    where
        F: FnOnce(&mut ClaimRecord) -> Result<(), ClaimError>,
    {
        let mut current = self.record.lock().await;
        if self.lost.load(Ordering::SeqCst) {
            return Err(AttemptError::LeaseLost);
        }
        let mut next = current.clone();
        change(&mut next).map_err(|e| StepFailure::new(step, e))?;
        if !inner.commit(&current, &next, step).await? {
            self.lost.store(true, Ordering::SeqCst);
            return Err(AttemptError::LeaseLost);
        }
        *current = next.clone();
        Ok(next)
    }

    /// Stop renewing. Never interrupts a renewal in flight.
    async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.heartbeat.await {
            warn!(error = %e, "[claim] lease heartbeat ended abnormally");
        }
    }
}
