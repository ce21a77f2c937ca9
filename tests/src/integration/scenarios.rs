//! # Claim Scenarios
//!
//! The five canonical claim outcomes, plus wallet immutability across
//! failures and retries, exercised through the public `ClaimApi`.

#[cfg(test)]
mod tests {
    use super::super::support::{Harness, WALLET_A, WALLET_B};
    use claim_workflow::{ClaimApi, ClaimError, ClaimState, ErrorKind};

    // =========================================================================
    // CANONICAL OUTCOMES
    // =========================================================================

    #[tokio::test]
    async fn test_scenario_fresh_claim_mints_token_zero() {
        let h = Harness::new(&["ABC123"]);

        let receipt = h.controller.claim("ABC123", WALLET_A).await.unwrap();

        assert!(receipt.success);
        assert_eq!(receipt.token_ref, "0");
        assert_eq!(receipt.wallet, WALLET_A);
        assert!(!receipt.already_claimed);
        assert_eq!(h.chain.included().len(), 1);
    }

    #[tokio::test]
    async fn test_scenario_repeat_claim_is_identical() {
        let h = Harness::new(&["ABC123"]);
        let first = h.controller.claim("ABC123", WALLET_A).await.unwrap();

        let second = h.controller.claim("ABC123", WALLET_A).await.unwrap();

        assert_eq!(second.token_ref, first.token_ref);
        assert_eq!(second.tx_ref, first.tx_ref);
        assert!(second.already_claimed);
        assert_eq!(h.publisher.upload_count(), 1);
        assert_eq!(h.chain.broadcast_count(), 1);
    }

    #[tokio::test]
    async fn test_scenario_other_wallet_never_rebinds() {
        let h = Harness::new(&["ABC123"]);
        h.controller.claim("ABC123", WALLET_A).await.unwrap();
        let before = h.store.snapshot("ABC123").unwrap();

        let replay = h.controller.claim("ABC123", WALLET_B).await.unwrap();

        assert_eq!(replay.wallet, WALLET_A);
        assert_eq!(h.chain.included().len(), 1);
        assert_eq!(h.store.snapshot("ABC123").unwrap(), before);
    }

    #[tokio::test]
    async fn test_scenario_missing_code_is_not_found() {
        let h = Harness::new(&["ABC123"]);

        let err = h.controller.claim("missing-code", WALLET_A).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(h.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_scenario_malformed_wallet_leaves_record_untouched() {
        let h = Harness::new(&["ABC123"]);
        let before = h.store.snapshot("ABC123").unwrap();

        for wallet in ["not-an-address", "0x1234", "5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"] {
            let err = h.controller.claim("ABC123", wallet).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input, "{}", wallet);
        }

        assert_eq!(h.store.snapshot("ABC123").unwrap(), before);
        assert_eq!(h.publisher.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_checksum_is_rejected() {
        let h = Harness::new(&["ABC123"]);
        let flipped = WALLET_A.replacen('a', "A", 1);

        let err = h.controller.claim("ABC123", &flipped).await.unwrap_err();

        assert!(matches!(err, ClaimError::InvalidWallet(_)));
    }

    #[tokio::test]
    async fn test_unchecksummed_wallet_is_rejected() {
        let h = Harness::new(&["ABC123"]);
        let before = h.store.snapshot("ABC123").unwrap();

        let lower = WALLET_A.to_ascii_lowercase();
        let upper = format!("0x{}", WALLET_A[2..].to_ascii_uppercase());
        for wallet in [lower, upper] {
            let err = h.controller.claim("ABC123", &wallet).await.unwrap_err();
            assert!(matches!(err, ClaimError::InvalidWallet(_)), "{}", wallet);
            assert_eq!(err.kind(), ErrorKind::Input);
        }

        assert_eq!(h.store.snapshot("ABC123").unwrap(), before);
        assert!(h.chain.included().is_empty());
    }

    // =========================================================================
    // WALLET IMMUTABILITY ACROSS FAILURES
    // =========================================================================

    #[tokio::test]
    async fn test_failed_claim_keeps_wallet_for_retry() {
        let h = Harness::new(&["ABC123"]);
        h.publisher.set_should_fail(true);
        let err = h.controller.claim("ABC123", WALLET_A).await.unwrap_err();
        assert!(err.is_retryable());

        let failed = h.store.snapshot("ABC123").unwrap();
        assert_eq!(failed.state, ClaimState::Failed);
        assert_eq!(failed.wallet.as_ref().unwrap().as_str(), WALLET_A);

        // another wallet cannot take over the failed code
        h.publisher.set_should_fail(false);
        let err = h.controller.claim("ABC123", WALLET_B).await.unwrap_err();
        assert!(matches!(err, ClaimError::WalletMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // the original wallet can
        let receipt = h.controller.claim("ABC123", WALLET_A).await.unwrap();
        assert_eq!(receipt.wallet, WALLET_A);
        assert_eq!(receipt.token_ref, "0");
    }

    #[tokio::test]
    async fn test_signing_failure_consumes_no_token() {
        let h = Harness::new(&["ABC123", "XYZ789"]);
        h.signer.set_should_fail(true);
        assert!(h.controller.claim("ABC123", WALLET_A).await.is_err());
        assert!(h.chain.included().is_empty());

        h.signer.set_should_fail(false);
        let other = h.controller.claim("XYZ789", WALLET_B).await.unwrap();
        assert_eq!(other.token_ref, "0");
        let retried = h.controller.claim("ABC123", WALLET_A).await.unwrap();
        assert_eq!(retried.token_ref, "1");
    }

    #[tokio::test]
    async fn test_chain_outage_then_recovery() {
        let h = Harness::new(&["ABC123"]);
        h.chain.set_should_fail(true);
        let err = h.controller.claim("ABC123", WALLET_A).await.unwrap_err();
        assert!(err.is_retryable());

        h.chain.set_should_fail(false);
        let receipt = h.controller.claim("ABC123", WALLET_A).await.unwrap();
        assert_eq!(receipt.token_ref, "0");
        assert_eq!(h.chain.included().len(), 1);
    }

    #[tokio::test]
    async fn test_check_tracks_lifecycle() {
        let h = Harness::new(&["ABC123"]);
        assert_eq!(h.controller.check("ABC123").await.unwrap().state, "unclaimed");

        h.publisher.set_should_fail(true);
        let _ = h.controller.claim("ABC123", WALLET_A).await;
        assert_eq!(h.controller.check("ABC123").await.unwrap().state, "failed");

        h.publisher.set_should_fail(false);
        h.controller.claim("ABC123", WALLET_A).await.unwrap();
        let view = h.controller.check("ABC123").await.unwrap();
        assert_eq!(view.state, "minted");
        assert_eq!(view.token_ref.as_deref(), Some("0"));
    }
}
