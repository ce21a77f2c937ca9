//! Minimal Solidity ABI encoding for the collection contract.
//!
//! Only the two calls the claim node makes: `safeMint(address,string)` and
//! `count()`.

use primitive_types::U256;
use sha3::{Digest, Keccak256};

/// Width of one ABI word.
const WORD: usize = 32;

/// First four bytes of the Keccak-256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn push_word(out: &mut Vec<u8>, value: U256) {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    out.extend_from_slice(&word);
}

/// Calldata for `safeMint(address to, string uri)`.
///
/// `uri` is the bare content hash; the collection contract prepends its
/// `ipfs://` base URI in `tokenURI`.
pub fn encode_safe_mint(to: &[u8; 20], uri: &str) -> Vec<u8> {
    let uri = uri.as_bytes();
    let padded = uri.len().div_ceil(WORD) * WORD;

    let mut out = Vec::with_capacity(4 + WORD * 3 + padded);
    out.extend_from_slice(&selector("safeMint(address,string)"));

    // head: address, offset of the string tail
    out.extend_from_slice(&[0u8; 12]);
    out.extend_from_slice(to);
    push_word(&mut out, U256::from(2 * WORD));

    // tail: length, bytes right-padded to a word boundary
    push_word(&mut out, U256::from(uri.len()));
    out.extend_from_slice(uri);
    out.resize(out.len() + (padded - uri.len()), 0);
    out
}

/// Calldata for `count()`.
pub fn encode_count() -> Vec<u8> {
    selector("count()").to_vec()
}

/// Decode a single `uint256` return value.
///
/// `None` if the word is missing or does not fit in a `u64`.
pub fn decode_u64_word(data: &[u8]) -> Option<u64> {
    if data.len() < WORD {
        return None;
    }
    let value = U256::from_big_endian(&data[..WORD]);
    if value > U256::from(u64::MAX) {
        return None;
    }
    Some(value.as_u64())
}
