//! # Ethereum JSON-RPC Submitter
//!
//! `TransactionSubmitter` backed by a chain node's JSON-RPC endpoint.
//!
//! | Operation | RPC |
//! |-----------|-----|
//! | `pending_nonce` | `eth_getTransactionCount(account, "pending")` |
//! | `latest_nonce` | `eth_getTransactionCount(account, "latest")` |
//! | `network_id` | `eth_chainId` |
//! | `token_count` | `eth_call(count(), "latest")` |
//! | `submit` | `eth_sendRawTransaction` |
//! | `query_status` | `eth_getTransactionReceipt`, then `eth_getTransactionByHash` |

use super::abi::{decode_u64_word, encode_count};
use async_trait::async_trait;
use claim_workflow::{SignedIntent, SubmitError, TransactionSubmitter, TxHandle, TxStatus};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Receipt {
    #[serde(default)]
    status: Option<String>,
}

/// Chain node client.
pub struct JsonRpcSubmitter {
    url: String,
    contract: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcSubmitter {
    /// Create a client for `url`; `contract` is queried for `count()`.
    pub fn new(
        url: impl Into<String>,
        contract: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmitError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            contract: contract.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, SubmitError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SubmitError::Network(format!("{} {}", status, text)));
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| SubmitError::Malformed(e.to_string()))?;

        if let Some(error) = envelope.error {
            return Err(classify_rpc_error(error.code, &error.message));
        }

        let result = envelope.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| SubmitError::Malformed(format!("{}: {}", method, e)))
    }

    async fn call_quantity(&self, method: &str, params: Value) -> Result<u64, SubmitError> {
        let raw: String = self.call(method, params).await?;
        parse_quantity(&raw)
    }
}

#[async_trait]
impl TransactionSubmitter for JsonRpcSubmitter {
    async fn pending_nonce(&self, account: &str) -> Result<u64, SubmitError> {
        self.call_quantity("eth_getTransactionCount", json!([account, "pending"]))
            .await
    }

    async fn latest_nonce(&self, account: &str) -> Result<u64, SubmitError> {
        self.call_quantity("eth_getTransactionCount", json!([account, "latest"]))
            .await
    }

    async fn network_id(&self) -> Result<u64, SubmitError> {
        self.call_quantity("eth_chainId", json!([])).await
    }

    async fn token_count(&self) -> Result<u64, SubmitError> {
        let data = format!("0x{}", hex::encode(encode_count()));
        let raw: String = self
            .call(
                "eth_call",
                json!([{ "to": self.contract, "data": data }, "latest"]),
            )
            .await?;
        let bytes = decode_hex(&raw)?;
        decode_u64_word(&bytes)
            .ok_or_else(|| SubmitError::Malformed(format!("count() returned {}", raw)))
    }

    async fn submit(&self, signed: &SignedIntent) -> Result<TxHandle, SubmitError> {
        let raw = format!("0x{}", hex::encode(&signed.raw));
        match self
            .call::<String>("eth_sendRawTransaction", json!([raw]))
            .await
        {
            Ok(hash) => {
                if !hash.eq_ignore_ascii_case(&signed.tx_ref.0) {
                    warn!(
                        expected = %signed.tx_ref,
                        returned = %hash,
                        "[claim] node returned a different transaction hash"
                    );
                }
                Ok(signed.tx_ref.clone())
            }
            Err(SubmitError::Rpc { message, .. }) if is_already_known(&message) => {
                debug!(tx_ref = %signed.tx_ref, "[claim] transaction already known to node");
                Ok(signed.tx_ref.clone())
            }
            Err(SubmitError::NonceTooLow { expected, .. }) => Err(SubmitError::NonceTooLow {
                used: signed.nonce,
                expected: expected.max(signed.nonce + 1),
            }),
            Err(e) => Err(e),
        }
    }

    async fn query_status(&self, handle: &TxHandle) -> Result<TxStatus, SubmitError> {
        let receipt: Option<Receipt> = self
            .call("eth_getTransactionReceipt", json!([handle.0]))
            .await?;
        if let Some(receipt) = receipt {
            return Ok(match receipt.status.as_deref() {
                Some("0x1") | Some("0x01") => TxStatus::Included,
                Some("0x0") | Some("0x00") => TxStatus::Reverted,
                // pre-Byzantium receipts carry no status
                _ => TxStatus::Included,
            });
        }

        let tx: Option<Value> = self
            .call("eth_getTransactionByHash", json!([handle.0]))
            .await?;
        Ok(match tx {
            Some(_) => TxStatus::InMempool,
            None => TxStatus::Unknown,
        })
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(raw: &str) -> Result<u64, SubmitError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| SubmitError::Malformed(format!("not a hex quantity: {}", raw)))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| SubmitError::Malformed(format!("{}: {}", raw, e)))
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, SubmitError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|e| SubmitError::Malformed(format!("{}: {}", raw, e)))
}

fn is_already_known(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("already known") || lower.contains("known transaction")
}

/// Map a node's JSON-RPC error onto the submitter taxonomy.
///
/// Geth-style messages are matched by substring; codes are not standardized
/// across clients.
pub fn classify_rpc_error(code: i64, message: &str) -> SubmitError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("nonce too low") {
        let (used, expected) = parse_nonce_pair(&lower);
        return SubmitError::NonceTooLow { used, expected };
    }
    if lower.contains("underpriced") {
        return SubmitError::Underpriced;
    }
    if lower.contains("insufficient funds")
        || lower.contains("exceeds block gas limit")
        || lower.contains("intrinsic gas too low")
    {
        return SubmitError::Rejected(message.to_string());
    }
    SubmitError::Rpc {
        code,
        message: message.to_string(),
    }
}

/// Extract `tx: N state: M` from a geth nonce error; zeros when absent.
fn parse_nonce_pair(lower: &str) -> (u64, u64) {
    let number_after = |label: &str| -> u64 {
        lower
            .find(label)
            .map(|at| &lower[at + label.len()..])
            .and_then(|rest| {
                let digits: String = rest
                    .trim_start()
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                digits.parse().ok()
            })
            .unwrap_or(0)
    };
    (number_after("tx:"), number_after("state:"))
}
