//! # Domain Invariants
//!
//! Rules every stored claim record obeys. The controller checks each
//! update against them before it is committed.

use super::entities::ClaimRecord;
use super::errors::ClaimError;
use super::value_objects::ClaimState;

/// Invariant: `token_ref` is set iff the record is `Minted`.
pub fn invariant_token_ref_iff_minted(record: &ClaimRecord) -> bool {
    record.token_ref.is_some() == (record.state == ClaimState::Minted)
}

/// Invariant: a lease only exists while `Pending`, and `Pending` always has one.
pub fn invariant_lease_only_pending(record: &ClaimRecord) -> bool {
    record.lease.is_some() == (record.state == ClaimState::Pending)
}

/// Invariant: once recorded, the wallet never changes and is never cleared.
pub fn invariant_wallet_immutable(before: &ClaimRecord, after: &ClaimRecord) -> bool {
    match &before.wallet {
        Some(recorded) => after.wallet.as_ref() == Some(recorded),
        None => true,
    }
}

/// Invariant: a record past `Unclaimed` carries a wallet.
pub fn invariant_wallet_bound(record: &ClaimRecord) -> bool {
    record.state == ClaimState::Unclaimed || record.wallet.is_some()
}

/// Check a full update `before -> after`.
pub fn check_record_update(before: &ClaimRecord, after: &ClaimRecord) -> Result<(), ClaimError> {
    let violation = |rule: &str| ClaimError::InvalidTransition {
        from: format!("{:?}", before.state),
        to: format!("{:?} ({})", after.state, rule),
    };

    if before.code != after.code {
        return Err(violation("code changed"));
    }
    if before.state != after.state && !before.state.can_transition_to(after.state) {
        return Err(violation("state machine"));
    }
    if before.state.is_terminal() {
        return Err(violation("terminal record"));
    }
    if after.revision <= before.revision {
        return Err(violation("revision not advanced"));
    }
    if !invariant_wallet_immutable(before, after) {
        return Err(violation("wallet changed"));
    }
    if !invariant_wallet_bound(after) {
        return Err(violation("wallet missing"));
    }
    if !invariant_token_ref_iff_minted(after) {
        return Err(violation("token_ref without mint"));
    }
    if !invariant_lease_only_pending(after) {
        return Err(violation("lease outside pending"));
    }
    Ok(())
}
