//! # Node End-to-End
//!
//! The HTTP API over the production adapters: local EIP-155 signer,
//! JSON-RPC submitter and IPFS publisher, pointed at mock services on
//! local sockets.
//!
//! ```text
//! HTTP request ─→ router ─→ controller ─→ IpfsPublisher ─→ MockIpfs
//!                                     └─→ LocalSigner ─→ JsonRpcSubmitter ─→ MockEthNode
//! ```

#[cfg(test)]
mod tests {
    use super::super::support::{MockEthNode, MockIpfs, CONTRACT, PRIVATE_KEY, WALLET_A, WALLET_B};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use claim_node::adapters::abi::selector;
    use claim_node::container::{ClaimContainer, NodeConfig};
    use claim_node::http;
    use claim_workflow::{ClaimState, InMemoryStore, WalletAddress, WorkflowConfig};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct Node {
        eth: MockEthNode,
        ipfs: MockIpfs,
        store: Arc<InMemoryStore>,
        router: Router,
    }

    async fn start_node(codes: &[&str]) -> Node {
        claim_telemetry::register_metrics().unwrap();
        let eth = MockEthNode::start(11155111).await;
        let ipfs = MockIpfs::start().await;

        let mut config = NodeConfig::default();
        config.chain.rpc_url = eth.url.clone();
        config.chain.contract_address = CONTRACT.to_string();
        config.chain.private_key = PRIVATE_KEY.to_string();
        config.chain.request_timeout = Duration::from_secs(2);
        config.chain.gas_price_gwei = Some(3);
        config.ipfs.api_url = ipfs.url.clone();
        config.ipfs.project_id = "id".to_string();
        config.ipfs.project_secret = "secret".to_string();
        config.ipfs.request_timeout = Duration::from_secs(2);
        config.workflow = WorkflowConfig {
            publish_timeout: Duration::from_secs(2),
            submit_timeout: Duration::from_secs(2),
            chain_query_timeout: Duration::from_secs(2),
            lease_duration: Duration::from_secs(10),
            ..WorkflowConfig::for_testing()
        };
        config.validate().unwrap();

        let store = Arc::new(InMemoryStore::with_codes(codes.iter().copied()));
        let container = ClaimContainer::with_store(config, store.clone()).unwrap();
        let router = http::router(Arc::new(container.controller));
        Node {
            eth,
            ipfs,
            store,
            router,
        }
    }

    async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_claim_over_real_adapters() {
        let node = start_node(&["ABC123"]).await;

        let (status, body) = get(&node.router, &format!("/mint/ABC123/{}", WALLET_A)).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["success"], true);
        assert_eq!(body["tokenRef"], "0");
        assert_eq!(body["networkId"], 11155111);

        // the node saw exactly one transaction, to the contract, minting to the wallet
        let accepted = node.eth.accepted();
        assert_eq!(accepted.len(), 1);
        let tx = &accepted[0];
        assert_eq!(tx.nonce, 0);
        assert_eq!(hex::encode(&tx.to), CONTRACT[2..].to_ascii_lowercase());
        assert_eq!(tx.data[..4], selector("safeMint(address,string)"));
        assert_eq!(
            tx.data[16..36],
            WalletAddress::parse(WALLET_A).unwrap().to_bytes()
        );
        // the bare hash; the contract supplies the ipfs:// base URI
        let calldata = String::from_utf8_lossy(&tx.data);
        assert!(calldata.contains("QmMock"));
        assert!(!calldata.contains("ipfs://"));

        // metadata was uploaded once and names the predicted token
        let uploads = node.ipfs.uploads.lock().clone();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0]["name"], "Ma'hai #0");

        let record = node.store.snapshot("ABC123").unwrap();
        assert_eq!(record.state, ClaimState::Minted);
        assert_eq!(record.tx_ref.unwrap().0, body["txRef"].as_str().unwrap());
    }

    #[tokio::test]
    async fn test_replay_and_other_wallet_do_not_touch_chain() {
        let node = start_node(&["ABC123"]).await;
        let (_, first) = get(&node.router, &format!("/mint/ABC123/{}", WALLET_A)).await;

        let (status, replay) = get(&node.router, &format!("/mint/ABC123/{}", WALLET_A)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replay["txRef"], first["txRef"]);
        assert_eq!(replay["alreadyClaimed"], true);

        let (status, other) = get(&node.router, &format!("/mint/ABC123/{}", WALLET_B)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(other["wallet"], WALLET_A);

        assert_eq!(node.eth.state.lock().send_calls, 1);
        assert_eq!(node.ipfs.uploads.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_sequential_codes_use_sequential_nonces() {
        let node = start_node(&["CODE01", "CODE02", "CODE03"]).await;

        for (i, code) in ["CODE01", "CODE02", "CODE03"].iter().enumerate() {
            let (status, body) = get(&node.router, &format!("/mint/{}/{}", code, WALLET_A)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["tokenRef"], i.to_string());
        }

        let nonces: Vec<u64> = node.eth.accepted().iter().map(|tx| tx.nonce).collect();
        assert_eq!(nonces, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_token_refs_match_chain_when_blocks_lag() {
        let node = start_node(&["AAA111", "BBB222", "CCC333"]).await;
        node.eth.hold_blocks(true);

        let (status, a) = get(&node.router, &format!("/mint/AAA111/{}", WALLET_A)).await;
        assert_eq!(status, StatusCode::OK, "{}", a);

        node.ipfs.set_fail(true);
        let (status, _) = get(&node.router, &format!("/mint/BBB222/{}", WALLET_B)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        node.ipfs.set_fail(false);

        let (status, c) = get(&node.router, &format!("/mint/CCC333/{}", WALLET_A)).await;
        assert_eq!(status, StatusCode::OK, "{}", c);

        node.eth.mine();
        let minted: Vec<(u64, Option<u64>)> = node
            .eth
            .accepted()
            .iter()
            .map(|tx| (tx.nonce, tx.token_id))
            .collect();
        assert_eq!(minted, vec![(0, Some(0)), (1, Some(1))]);
        assert_eq!(a["tokenRef"], "0");
        assert_eq!(c["tokenRef"], "1");

        let (status, b) = get(&node.router, &format!("/mint/BBB222/{}", WALLET_B)).await;
        assert_eq!(status, StatusCode::OK, "{}", b);
        assert_eq!(b["tokenRef"], "2");
    }

    #[tokio::test]
    async fn test_ipfs_outage_is_retryable_over_http() {
        let node = start_node(&["ABC123"]).await;
        node.ipfs.set_fail(true);

        let (status, body) = get(&node.router, &format!("/mint/ABC123/{}", WALLET_A)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["retryable"], true);
        assert!(node.eth.accepted().is_empty());

        node.ipfs.set_fail(false);
        let (status, body) = get(&node.router, &format!("/mint/ABC123/{}", WALLET_A)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tokenRef"], "0");
    }

    #[tokio::test]
    async fn test_lost_send_response_is_adopted_not_resent_with_new_nonce() {
        let node = start_node(&["ABC123"]).await;
        node.eth.state.lock().drop_send_responses = 1;

        let (status, _) = get(&node.router, &format!("/mint/ABC123/{}", WALLET_A)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(node.eth.accepted().len(), 1);

        let (status, body) = get(&node.router, &format!("/mint/ABC123/{}", WALLET_A)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tokenRef"], "0");
        assert_eq!(node.eth.accepted().len(), 1);
        assert_eq!(node.ipfs.uploads.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_over_http() {
        let node = start_node(&["ABC123"]).await;

        let (status, _) = get(&node.router, &format!("/mint/missing-code/{}", WALLET_A)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get(&node.router, "/mint/ABC123/not-an-address").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            node.store.snapshot("ABC123").unwrap().state,
            ClaimState::Unclaimed
        );
        assert_eq!(node.eth.state.lock().send_calls, 0);
    }
}
