//! # Concurrency
//!
//! Racing claims on one code mint at most once; claims on distinct codes
//! receive distinct, gap-free token ids.

#[cfg(test)]
mod tests {
    use super::super::support::{Harness, WALLET_A, WALLET_B, WALLET_C};
    use claim_workflow::{ClaimApi, ClaimState, ErrorKind};
    use futures::future::join_all;
    use std::collections::HashSet;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_wallets_mint_once() {
        let h = Harness::new(&["RACE01"]);
        h.publisher.set_delay(Some(Duration::from_millis(20)));
        let wallets = [WALLET_A, WALLET_B, WALLET_C];

        let calls = (0..24).map(|i| {
            let controller = h.controller.clone();
            let wallet = wallets[i % wallets.len()];
            tokio::spawn(async move { controller.claim("RACE01", wallet).await })
        });
        let results = join_all(calls).await;

        let mut fresh = Vec::new();
        for result in results {
            match result.unwrap() {
                Ok(receipt) if !receipt.already_claimed => fresh.push(receipt),
                Ok(_) => {}
                Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict, "{}", e),
            }
        }

        assert_eq!(fresh.len(), 1);
        assert_eq!(h.chain.included().len(), 1);
        assert_eq!(h.publisher.upload_count(), 1);

        let record = h.store.snapshot("RACE01").unwrap();
        assert_eq!(record.state, ClaimState::Minted);
        assert_eq!(record.wallet.unwrap().as_str(), fresh[0].wallet);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_distinct_codes_get_distinct_contiguous_tokens() {
        let codes: Vec<String> = (0..12).map(|i| format!("BATCH{:02}", i)).collect();
        let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
        let h = Harness::new(&refs);

        let calls = codes.iter().cloned().map(|code| {
            let controller = h.controller.clone();
            tokio::spawn(async move { controller.claim(&code, WALLET_A).await })
        });
        let tokens: HashSet<String> = join_all(calls)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap().token_ref)
            .collect();

        let expected: HashSet<String> = (0..12).map(|i| i.to_string()).collect();
        assert_eq!(tokens, expected);

        // each stored token id matches what the chain assigned to its tx
        for (tx, token_id) in h.chain.included() {
            let owner = codes
                .iter()
                .filter_map(|c| h.store.snapshot(c))
                .find(|r| r.tx_ref.as_ref() == Some(&tx))
                .unwrap();
            assert_eq!(owner.token_ref, Some(token_id.to_string()));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_replays_during_mint_never_duplicate() {
        let h = Harness::new(&["SLOW01"]);
        h.chain.set_submit_delay(Some(Duration::from_millis(50)));

        let controller = h.controller.clone();
        let first = tokio::spawn(async move { controller.claim("SLOW01", WALLET_A).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = h.controller.claim("SLOW01", WALLET_A).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let receipt = first.await.unwrap().unwrap();
        let replay = h.controller.claim("SLOW01", WALLET_A).await.unwrap();
        assert_eq!(replay.tx_ref, receipt.tx_ref);
        assert_eq!(h.chain.broadcast_count(), 1);
    }
}
