//! Deterministic signer for tests.
//!
//! Produces a stable encoding of the intent and hashes it with Keccak-256,
//! so the same intent always yields the same transaction handle.

use crate::domain::{MintIntent, SignError, SignedIntent, TxHandle};
use crate::ports::IntentSigner;
use sha3::{Digest, Keccak256};
use std::sync::atomic::{AtomicBool, Ordering};

/// Signer with fixed account and contract addresses.
#[derive(Debug)]
pub struct StaticSigner {
    account: String,
    contract: String,
    should_fail: AtomicBool,
}

impl StaticSigner {
    /// Create a signer.
    pub fn new(account: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            contract: contract.into(),
            should_fail: AtomicBool::new(false),
        }
    }

    /// Fail every signature.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }
}

impl Default for StaticSigner {
    fn default() -> Self {
        Self::new(
            "0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        )
    }
}

impl IntentSigner for StaticSigner {
    fn account(&self) -> String {
        self.account.clone()
    }

    fn contract(&self) -> String {
        self.contract.clone()
    }

    fn sign(&self, intent: &MintIntent, network_id: u64) -> Result<SignedIntent, SignError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SignError::Signing("Mock failure".to_string()));
        }
        let raw = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            network_id,
            self.contract,
            intent.nonce,
            intent.gas.gas_limit,
            intent.gas.gas_price_wei,
            intent.recipient,
            intent.token_uri
        )
        .into_bytes();
        let hash = Keccak256::digest(&raw);
        Ok(SignedIntent {
            tx_ref: TxHandle(format!("0x{}", hex::encode(hash))),
            nonce: intent.nonce,
            raw,
        })
    }
}
