//! Shared fixtures: in-memory harness, mock chain node, mock IPFS endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};

use claim_workflow::{
    ClaimPorts, ClaimWorkflowController, InMemoryChain, InMemoryPublisher, InMemoryStore,
    MetadataTemplate, RecordStore, StaticSigner, WorkflowConfig,
};

pub const WALLET_A: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const WALLET_B: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
pub const WALLET_C: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";

pub const CONTRACT: &str = "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb";
pub const PRIVATE_KEY: &str = "4646464646464646464646464646464646464646464646464646464646464646";
pub const MINTER: &str = "0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F";

// =============================================================================
// IN-MEMORY HARNESS
// =============================================================================

/// Controller over in-memory backends, with handles to every fake.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub publisher: Arc<InMemoryPublisher>,
    pub chain: Arc<InMemoryChain>,
    pub signer: Arc<StaticSigner>,
    pub controller: ClaimWorkflowController,
}

impl Harness {
    pub fn new(codes: &[&str]) -> Self {
        Self::with_config(codes, WorkflowConfig::for_testing())
    }

    pub fn with_config(codes: &[&str], config: WorkflowConfig) -> Self {
        let store = Arc::new(InMemoryStore::with_codes(codes.iter().copied()));
        let publisher = Arc::new(InMemoryPublisher::new());
        let chain = Arc::new(InMemoryChain::new(1337));
        let signer = Arc::new(StaticSigner::default());
        let controller = controller_over(
            store.clone(),
            publisher.clone(),
            chain.clone(),
            signer.clone(),
            config,
        );
        Self {
            store,
            publisher,
            chain,
            signer,
            controller,
        }
    }

    /// A second controller sharing every backend, as after a process restart.
    pub fn restart(&self) -> ClaimWorkflowController {
        controller_over(
            self.store.clone(),
            self.publisher.clone(),
            self.chain.clone(),
            self.signer.clone(),
            WorkflowConfig::for_testing(),
        )
    }
}

pub fn controller_over(
    store: Arc<dyn RecordStore>,
    publisher: Arc<InMemoryPublisher>,
    chain: Arc<InMemoryChain>,
    signer: Arc<StaticSigner>,
    config: WorkflowConfig,
) -> ClaimWorkflowController {
    let ports = ClaimPorts {
        store,
        publisher,
        submitter: chain,
        signer,
    };
    ClaimWorkflowController::new(ports, config, MetadataTemplate::default())
}

// =============================================================================
// MOCK CHAIN NODE
// =============================================================================

/// A transaction the mock node accepted.
#[derive(Clone, Debug)]
pub struct AcceptedTx {
    pub nonce: u64,
    pub to: Vec<u8>,
    pub data: Vec<u8>,
    /// Token minted by this transaction, once mined.
    pub token_id: Option<u64>,
}

/// State of the mock node.
///
/// Accepted transactions are mined at once unless `hold_blocks` is set; held
/// ones count towards the pending nonce but not towards `count()`.
#[derive(Debug)]
pub struct EthState {
    pub chain_id: u64,
    /// Pending nonce.
    pub nonce: u64,
    /// Nonce as of the latest block.
    pub latest_nonce: u64,
    /// `count()` as of the latest block.
    pub count: u64,
    pub txs: HashMap<String, AcceptedTx>,
    pub mempool: Vec<String>,
    pub hold_blocks: bool,
    pub send_calls: usize,
    /// Accept the next N transactions but answer 502.
    pub drop_send_responses: usize,
}

impl EthState {
    fn accept(&mut self, raw_hex: &str) -> Result<String, String> {
        let raw = hex::decode(raw_hex.trim_start_matches("0x")).map_err(|e| e.to_string())?;
        let hash = format!("0x{}", hex::encode(Keccak256::digest(&raw)));
        if self.txs.contains_key(&hash) {
            return Err("already known".to_string());
        }

        let tx = rlp::Rlp::new(&raw);
        let nonce: u64 = tx.val_at(0).map_err(|e| e.to_string())?;
        if nonce < self.nonce {
            return Err(format!(
                "nonce too low: address {}, tx: {} state: {}",
                MINTER, nonce, self.nonce
            ));
        }
        let to = tx.at(3).and_then(|r| r.data().map(<[u8]>::to_vec));
        let data = tx.at(5).and_then(|r| r.data().map(<[u8]>::to_vec));

        self.txs.insert(
            hash.clone(),
            AcceptedTx {
                nonce,
                to: to.map_err(|e| e.to_string())?,
                data: data.map_err(|e| e.to_string())?,
                token_id: None,
            },
        );
        self.nonce = nonce + 1;
        self.mempool.push(hash.clone());
        if !self.hold_blocks {
            self.mine();
        }
        Ok(hash)
    }

    /// Mine the mempool in nonce order.
    pub fn mine(&mut self) {
        let mut hashes = std::mem::take(&mut self.mempool);
        hashes.sort_by_key(|h| self.txs[h].nonce);
        for hash in hashes {
            if let Some(tx) = self.txs.get_mut(&hash) {
                tx.token_id = Some(self.count);
                self.count += 1;
                self.latest_nonce = tx.nonce + 1;
            }
        }
    }
}

type SharedEth = Arc<Mutex<EthState>>;

/// Ethereum JSON-RPC endpoint over a local socket.
#[derive(Clone)]
pub struct MockEthNode {
    pub url: String,
    pub state: SharedEth,
}

impl MockEthNode {
    pub async fn start(chain_id: u64) -> Self {
        let state = Arc::new(Mutex::new(EthState {
            chain_id,
            nonce: 0,
            latest_nonce: 0,
            count: 0,
            txs: HashMap::new(),
            mempool: Vec::new(),
            hold_blocks: false,
            send_calls: 0,
            drop_send_responses: 0,
        }));
        let app = Router::new()
            .route("/", post(eth_rpc))
            .with_state(state.clone());
        let url = spawn_server(app).await;
        Self { url, state }
    }

    pub fn accepted(&self) -> Vec<AcceptedTx> {
        let mut txs: Vec<_> = self.state.lock().txs.values().cloned().collect();
        txs.sort_by_key(|tx| tx.nonce);
        txs
    }

    pub fn hold_blocks(&self, hold: bool) {
        self.state.lock().hold_blocks = hold;
    }

    pub fn mine(&self) {
        self.state.lock().mine();
    }
}

async fn eth_rpc(State(state): State<SharedEth>, Json(req): Json<Value>) -> Response {
    let method = req["method"].as_str().unwrap_or_default().to_string();
    let params = &req["params"];
    let mut eth = state.lock();

    let mut reply = match method.as_str() {
        "eth_chainId" => json!({ "result": format!("0x{:x}", eth.chain_id) }),
        "eth_getTransactionCount" => {
            let nonce = if params[1] == "latest" { eth.latest_nonce } else { eth.nonce };
            json!({ "result": format!("0x{:x}", nonce) })
        }
        "eth_call" => json!({ "result": format!("0x{:064x}", eth.count) }),
        "eth_sendRawTransaction" => {
            eth.send_calls += 1;
            match eth.accept(params[0].as_str().unwrap_or_default()) {
                Ok(hash) => {
                    if eth.drop_send_responses > 0 {
                        eth.drop_send_responses -= 1;
                        return (StatusCode::BAD_GATEWAY, "upstream reset").into_response();
                    }
                    json!({ "result": hash })
                }
                Err(message) => json!({ "error": { "code": -32000, "message": message } }),
            }
        }
        "eth_getTransactionReceipt" => {
            let hash = params[0].as_str().unwrap_or_default().to_ascii_lowercase();
            match eth.txs.get(&hash) {
                Some(tx) if tx.token_id.is_some() => {
                    json!({ "result": { "transactionHash": hash, "status": "0x1" } })
                }
                _ => json!({ "result": null }),
            }
        }
        "eth_getTransactionByHash" => {
            let hash = params[0].as_str().unwrap_or_default().to_ascii_lowercase();
            if eth.mempool.contains(&hash) {
                json!({ "result": { "hash": hash, "blockNumber": null } })
            } else {
                json!({ "result": null })
            }
        }
        _ => json!({ "error": { "code": -32601, "message": "method not found" } }),
    };
    reply["jsonrpc"] = json!("2.0");
    reply["id"] = req["id"].clone();
    Json(reply).into_response()
}

// =============================================================================
// MOCK IPFS
// =============================================================================

/// IPFS `add` endpoint that stores uploads and answers with a counter hash.
#[derive(Clone)]
pub struct MockIpfs {
    pub url: String,
    pub uploads: Arc<Mutex<Vec<Value>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl MockIpfs {
    pub async fn start() -> Self {
        let uploads = Arc::new(Mutex::new(Vec::new()));
        let fail = Arc::new(Mutex::new(false));
        let app = Router::new()
            .route("/api/v0/add", post(ipfs_add))
            .with_state((uploads.clone(), fail.clone()));
        let url = format!("{}/api/v0/add", spawn_server(app).await);
        Self { url, uploads, fail }
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

type IpfsState = (Arc<Mutex<Vec<Value>>>, Arc<Mutex<bool>>);

async fn ipfs_add(State((uploads, fail)): State<IpfsState>, mut multipart: Multipart) -> Response {
    if *fail.lock() {
        return (StatusCode::SERVICE_UNAVAILABLE, "gateway down").into_response();
    }
    let mut document = Value::Null;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            if let Ok(bytes) = field.bytes().await {
                document = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            }
        }
    }
    let mut uploads = uploads.lock();
    uploads.push(document);
    let hash = format!("QmMock{:040}", uploads.len());
    Json(json!({ "Name": "file", "Hash": hash, "Size": "64" })).into_response()
}

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
