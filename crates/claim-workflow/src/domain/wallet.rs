//! # Wallet Addresses
//!
//! Destination address validation (format + EIP-55 checksum).

use super::errors::WalletError;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// A validated destination address, held in EIP-55 checksummed form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Validate an address in exact EIP-55 form.
    ///
    /// The input must carry a `0x` prefix and match its checksummed
    /// encoding character for character; all-lowercase and all-uppercase
    /// hex are rejected.
    pub fn parse(input: &str) -> Result<Self, WalletError> {
        let hex_part = input.strip_prefix("0x").ok_or(WalletError::MissingPrefix)?;

        if hex_part.len() != 40 {
            return Err(WalletError::InvalidLength(hex_part.len()));
        }
        if let Some(bad) = hex_part.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(WalletError::InvalidCharacter(bad));
        }

        let checksummed = to_checksum(hex_part);
        if checksummed != input {
            return Err(WalletError::ChecksumMismatch);
        }

        Ok(Self(checksummed))
    }

    /// Checksummed `0x`-prefixed form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 20 address bytes.
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        // Validated in `parse`: 40 hex digits after the prefix.
        if let Ok(bytes) = hex::decode(&self.0[2..]) {
            out.copy_from_slice(&bytes);
        }
        out
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// EIP-55 checksum encoding of 40 hex digits.
pub fn to_checksum(hex_digits: &str) -> String {
    let lower = hex_digits.to_ascii_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
