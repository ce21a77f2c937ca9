//! # Restart Recovery
//!
//! A process that dies mid-claim leaves `Pending` or `Failed` records behind.
//! The next process must reconcile them against the chain before serving,
//! adopting transactions that landed and never submitting a second mint.

#[cfg(test)]
mod tests {
    use super::super::support::{Harness, WALLET_A, WALLET_B};
    use claim_workflow::{now_ms, ClaimApi, ClaimState, Lease, WalletAddress};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_restart_adopts_transaction_whose_response_was_lost() {
        let h = Harness::new(&["LOST01"]);
        h.chain.drop_next_responses(1);
        assert!(h.controller.claim("LOST01", WALLET_A).await.is_err());

        let failed = h.store.snapshot("LOST01").unwrap();
        assert_eq!(failed.state, ClaimState::Failed);
        let evidence = failed.submission.clone().unwrap();

        let restarted = h.restart();
        let report = restarted.recover_pending().await.unwrap();
        assert_eq!(report.minted, 1);

        let record = h.store.snapshot("LOST01").unwrap();
        assert_eq!(record.state, ClaimState::Minted);
        assert_eq!(record.tx_ref, Some(evidence.tx_ref));
        assert_eq!(record.token_ref, Some(evidence.token_id.to_string()));
        assert_eq!(h.chain.included().len(), 1);
        assert_eq!(h.publisher.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_restart_fails_orphan_without_evidence_then_retry_succeeds() {
        let h = Harness::new(&["ORPH01"]);
        let mut orphan = h.store.snapshot("ORPH01").unwrap();
        orphan
            .begin_attempt(
                WalletAddress::parse(WALLET_A).unwrap(),
                Lease::new(Uuid::new_v4(), 0, 1),
                0,
            )
            .unwrap();
        h.store.put(orphan);

        let restarted = h.restart();
        let report = restarted.recover_pending().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(h.store.snapshot("ORPH01").unwrap().state, ClaimState::Failed);

        // the wallet bound before the crash still owns the code
        assert!(restarted.claim("ORPH01", WALLET_B).await.is_err());
        let receipt = restarted.claim("ORPH01", WALLET_A).await.unwrap();
        assert_eq!(receipt.token_ref, "0");
    }

    #[tokio::test]
    async fn test_recovery_is_idempotent() {
        let h = Harness::new(&["IDEM01"]);
        h.chain.drop_next_responses(1);
        let _ = h.controller.claim("IDEM01", WALLET_A).await;

        let restarted = h.restart();
        let first = restarted.recover_pending().await.unwrap();
        let second = restarted.recover_pending().await.unwrap();

        assert_eq!(first.minted, 1);
        assert_eq!(second.minted, 0);
        assert_eq!(second.failed, 0);
        assert_eq!(h.chain.included().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_lease_is_taken_over_by_next_claim() {
        let h = Harness::new(&["STALE1"]);
        let mut stale = h.store.snapshot("STALE1").unwrap();
        let long_ago = now_ms().saturating_sub(60_000);
        stale
            .begin_attempt(
                WalletAddress::parse(WALLET_A).unwrap(),
                Lease::new(Uuid::new_v4(), long_ago, 1_000),
                long_ago,
            )
            .unwrap();
        h.store.put(stale);

        let receipt = h.restart().claim("STALE1", WALLET_A).await.unwrap();
        assert_eq!(receipt.token_ref, "0");
        assert_eq!(h.store.snapshot("STALE1").unwrap().state, ClaimState::Minted);
    }

    #[cfg(feature = "rocksdb")]
    mod rocksdb {
        use super::super::super::support::{controller_over, WALLET_A};
        use claim_node::adapters::storage::{RocksDbConfig, RocksDbRecordStore};
        use claim_node::provisioning::provision_codes;
        use claim_workflow::{
            ClaimApi, ClaimState, InMemoryChain, InMemoryPublisher, RecordStore, StaticSigner,
            WorkflowConfig,
        };
        use std::sync::Arc;
        use std::time::Duration;
        use tempfile::TempDir;

        fn open(dir: &TempDir) -> Arc<dyn RecordStore> {
            let path = dir.path().to_string_lossy().to_string();
            Arc::new(RocksDbRecordStore::open(RocksDbConfig::for_testing(path)).unwrap())
        }

        #[tokio::test]
        async fn test_minted_claim_survives_restart() {
            let dir = TempDir::new().unwrap();
            let publisher = Arc::new(InMemoryPublisher::new());
            let chain = Arc::new(InMemoryChain::new(1337));
            let signer = Arc::new(StaticSigner::default());

            let first = {
                let store = open(&dir);
                provision_codes(store.as_ref(), vec!["DISK01".to_string()])
                    .await
                    .unwrap();
                let controller = controller_over(
                    store,
                    publisher.clone(),
                    chain.clone(),
                    signer.clone(),
                    WorkflowConfig::for_testing(),
                );
                controller.claim("DISK01", WALLET_A).await.unwrap()
            };
            // let the detached workflow task release its store handle
            tokio::time::sleep(Duration::from_millis(100)).await;

            let store = open(&dir);
            let controller = controller_over(
                store.clone(),
                publisher.clone(),
                chain.clone(),
                signer,
                WorkflowConfig::for_testing(),
            );
            let report = controller.recover_pending().await.unwrap();
            assert_eq!(report.scanned, 0);

            let replay = controller.claim("DISK01", WALLET_A).await.unwrap();
            assert!(replay.already_claimed);
            assert_eq!(replay.tx_ref, first.tx_ref);
            assert_eq!(
                store.get("DISK01").await.unwrap().unwrap().state,
                ClaimState::Minted
            );
            assert_eq!(chain.included().len(), 1);
        }

        #[tokio::test]
        async fn test_evidence_on_disk_is_reconciled_after_restart() {
            let dir = TempDir::new().unwrap();
            let publisher = Arc::new(InMemoryPublisher::new());
            let chain = Arc::new(InMemoryChain::new(1337));
            let signer = Arc::new(StaticSigner::default());

            {
                let store = open(&dir);
                provision_codes(store.as_ref(), vec!["DISK02".to_string()])
                    .await
                    .unwrap();
                let controller = controller_over(
                    store,
                    publisher.clone(),
                    chain.clone(),
                    signer.clone(),
                    WorkflowConfig::for_testing(),
                );
                chain.drop_next_responses(1);
                assert!(controller.claim("DISK02", WALLET_A).await.is_err());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;

            let store = open(&dir);
            let controller = controller_over(
                store.clone(),
                publisher,
                chain.clone(),
                signer,
                WorkflowConfig::for_testing(),
            );
            let report = controller.recover_pending().await.unwrap();
            assert_eq!(report.minted, 1);

            let record = store.get("DISK02").await.unwrap().unwrap();
            assert_eq!(record.state, ClaimState::Minted);
            assert_eq!(record.token_ref.as_deref(), Some("0"));
            assert_eq!(chain.included().len(), 1);
        }
    }
}
