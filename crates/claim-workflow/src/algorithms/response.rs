//! # Response Formatter
//!
//! Pure mapping from a record to the payloads returned to callers.

use crate::domain::{ClaimRecord, ClaimState};
use serde::{Deserialize, Serialize};

/// Display data for a known network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Human readable name.
    pub name: &'static str,
    /// Block explorer base URL (no trailing slash).
    pub explorer: Option<&'static str>,
    /// Marketplace asset base URL (no trailing slash).
    pub marketplace: Option<&'static str>,
}

/// Look up display data by network id.
pub fn network_info(network_id: u64) -> NetworkInfo {
    let (name, explorer, marketplace) = match network_id {
        1 => (
            "Ethereum Mainnet",
            Some("https://etherscan.io"),
            Some("https://opensea.io/assets/ethereum"),
        ),
        5 => (
            "Goerli",
            Some("https://goerli.etherscan.io"),
            Some("https://testnets.opensea.io/assets/goerli"),
        ),
        11155111 => (
            "Sepolia",
            Some("https://sepolia.etherscan.io"),
            Some("https://testnets.opensea.io/assets/sepolia"),
        ),
        137 => (
            "Polygon",
            Some("https://polygonscan.com"),
            Some("https://opensea.io/assets/matic"),
        ),
        80001 => (
            "Mumbai",
            Some("https://mumbai.polygonscan.com"),
            Some("https://testnets.opensea.io/assets/mumbai"),
        ),
        1337 | 31337 => ("Local Development", None, None),
        _ => ("Unknown Network", None, None),
    };
    NetworkInfo {
        name,
        explorer,
        marketplace,
    }
}

/// Payload returned for a minted code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    /// Always `true` for a receipt.
    pub success: bool,
    /// Redeem code.
    pub code: String,
    /// Wallet the token was minted to.
    pub wallet: String,
    /// Minted token id.
    pub token_ref: String,
    /// Mint transaction handle.
    pub tx_ref: String,
    /// Network the mint happened on.
    pub network_id: u64,
    /// Network display name.
    pub network_name: String,
    /// Explorer link for the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Marketplace link for the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace_url: Option<String>,
    /// `true` when this call only replayed an earlier mint.
    pub already_claimed: bool,
}

/// Build the receipt for a minted record; `None` for any other state.
pub fn format_receipt(
    record: &ClaimRecord,
    network_id: u64,
    contract: &str,
    already_claimed: bool,
) -> Option<ClaimReceipt> {
    if record.state != ClaimState::Minted {
        return None;
    }
    let wallet = record.wallet.as_ref()?;
    let token_ref = record.token_ref.clone()?;
    let tx_ref = record.tx_ref.as_ref()?.0.clone();
    let info = network_info(network_id);

    Some(ClaimReceipt {
        success: true,
        code: record.code.clone(),
        wallet: wallet.to_string(),
        explorer_url: info.explorer.map(|base| format!("{}/tx/{}", base, tx_ref)),
        marketplace_url: info
            .marketplace
            .map(|base| format!("{}/{}/{}", base, contract, token_ref)),
        token_ref,
        tx_ref,
        network_id,
        network_name: info.name.to_string(),
        already_claimed,
    })
}

/// Side-effect-free view of a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatusView {
    /// Human readable summary.
    pub message: String,
    /// Redeem code.
    pub code: String,
    /// Current state.
    pub state: String,
    /// Recorded wallet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    /// Minted token id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_ref: Option<String>,
    /// Mint transaction handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_ref: Option<String>,
    /// Cause of the last failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Attempts started so far.
    pub attempts: u32,
}

/// Status view of any record.
pub fn status_view(record: &ClaimRecord) -> ClaimStatusView {
    ClaimStatusView {
        message: format!("Redeem code {} found", record.code),
        code: record.code.clone(),
        state: record.state.as_str().to_string(),
        wallet: record.wallet.as_ref().map(|w| w.to_string()),
        token_ref: record.token_ref.clone(),
        tx_ref: record.tx_ref.as_ref().map(|t| t.0.clone()),
        last_error: record.last_error.clone(),
        attempts: record.attempts,
    }
}
