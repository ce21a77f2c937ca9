//! # Local Transaction Signer
//!
//! Signs `safeMint` calls as EIP-155 legacy transactions with a secp256k1
//! key held in process memory.
//!
//! ## Encoding
//!
//! ```text
//! signing hash = keccak256(rlp([nonce, gasPrice, gas, to, 0, data, chainId, 0, 0]))
//! raw          = rlp([nonce, gasPrice, gas, to, 0, data, v, r, s])
//! v            = recovery_id + chainId * 2 + 35
//! tx hash      = keccak256(raw)
//! ```

use super::abi::encode_safe_mint;
use claim_workflow::{
    to_checksum, IntentSigner, MintIntent, SignError, SignedIntent, TxHandle, WalletAddress,
};
use k256::ecdsa::{RecoveryId, SigningKey, VerifyingKey};
use primitive_types::U256;
use rlp::RlpStream;
use sha3::{Digest, Keccak256};

/// Keccak-256 hash.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Derive the 20-byte account address from a public key.
pub fn address_from_pubkey(key: &VerifyingKey) -> [u8; 20] {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 prefix
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Signer for the minting account.
pub struct LocalSigner {
    key: SigningKey,
    account: String,
    contract: WalletAddress,
}

impl LocalSigner {
    /// Build from a hex private key (with or without `0x`) and the contract address.
    pub fn new(private_key_hex: &str, contract: &str) -> Result<Self, SignError> {
        let trimmed = private_key_hex.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(hex_part).map_err(|_| SignError::InvalidKey)?;
        let key = SigningKey::from_slice(&bytes).map_err(|_| SignError::InvalidKey)?;

        let contract = WalletAddress::parse(contract)
            .map_err(|e| SignError::InvalidAddress(format!("contract: {}", e)))?;

        let account = to_checksum(&hex::encode(address_from_pubkey(key.verifying_key())));

        Ok(Self {
            key,
            account,
            contract,
        })
    }

    fn append_unsigned(&self, stream: &mut RlpStream, intent: &MintIntent, data: &[u8]) {
        stream.append(&intent.nonce);
        stream.append(&intent.gas.gas_price_wei);
        stream.append(&intent.gas.gas_limit);
        stream.append(&self.contract.to_bytes().as_slice());
        stream.append(&0u8);
        stream.append(&data);
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("account", &self.account)
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

impl IntentSigner for LocalSigner {
    fn account(&self) -> String {
        self.account.clone()
    }

    fn contract(&self) -> String {
        self.contract.to_string()
    }

    fn sign(&self, intent: &MintIntent, network_id: u64) -> Result<SignedIntent, SignError> {
        let data = encode_safe_mint(&intent.recipient.to_bytes(), &intent.token_uri);

        let mut unsigned = RlpStream::new_list(9);
        self.append_unsigned(&mut unsigned, intent, &data);
        unsigned.append(&network_id);
        unsigned.append(&0u8);
        unsigned.append(&0u8);
        let sighash = keccak256(unsigned.as_raw());

        let (mut signature, mut recid) = self
            .key
            .sign_prehash_recoverable(&sighash)
            .map_err(|e| SignError::Signing(e.to_string()))?;

        // EIP-2: low-S only
        if let Some(normalized) = signature.normalize_s() {
            signature = normalized;
            recid = RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced());
        }

        let bytes = signature.to_bytes();
        let r = U256::from_big_endian(&bytes[..32]);
        let s = U256::from_big_endian(&bytes[32..]);
        let v = u64::from(recid.to_byte()) + network_id * 2 + 35;

        let mut signed = RlpStream::new_list(9);
        self.append_unsigned(&mut signed, intent, &data);
        signed.append(&v);
        signed.append(&r);
        signed.append(&s);
        let raw = signed.out().to_vec();

        let tx_ref = TxHandle(format!("0x{}", hex::encode(keccak256(&raw))));
        Ok(SignedIntent {
            tx_ref,
            nonce: intent.nonce,
            raw,
        })
    }
}
