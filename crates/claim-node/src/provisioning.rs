//! # Code Provisioning
//!
//! Bulk creation of `Unclaimed` records, either from generated random codes
//! or from a caller-supplied list. Existing codes are never overwritten.

use claim_workflow::{now_ms, validate_code, ClaimError, ClaimRecord, RecordStore, StoreError};
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

/// Default number of generated codes.
pub const DEFAULT_COUNT: usize = 1000;

/// Default generated code length.
pub const DEFAULT_LENGTH: usize = 10;

/// Provisioning errors.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A supplied code is not a valid redeem code.
    #[error("Invalid code {code:?}: {reason}")]
    InvalidCode {
        /// Offending code
        code: String,
        /// Validation failure
        reason: String,
    },

    /// Random generation kept colliding with existing codes.
    #[error("Gave up after {attempts} attempts with {inserted} of {requested} codes inserted")]
    Exhausted {
        /// Codes requested
        requested: usize,
        /// Codes inserted before giving up
        inserted: usize,
        /// Insert attempts made
        attempts: usize,
    },

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a provisioning run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Codes newly inserted, in insertion order.
    pub inserted: Vec<String>,
    /// Codes that already existed.
    pub skipped: Vec<String>,
}

/// Generate one random alphanumeric code.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Insert `count` freshly generated codes of `length` characters.
///
/// Collisions with existing codes are skipped and replaced by new draws.
pub async fn provision_random(
    store: &dyn RecordStore,
    count: usize,
    length: usize,
) -> Result<ProvisionReport, ProvisionError> {
    check_code(&"a".repeat(length))?;

    let max_attempts = count.saturating_mul(4).max(16);
    let mut report = ProvisionReport::default();
    let mut attempts = 0;

    while report.inserted.len() < count {
        if attempts == max_attempts {
            return Err(ProvisionError::Exhausted {
                requested: count,
                inserted: report.inserted.len(),
                attempts,
            });
        }
        attempts += 1;

        let code = generate_code(&mut rand::thread_rng(), length);
        insert(store, code, &mut report).await?;
    }

    info!(
        inserted = report.inserted.len(),
        collisions = report.skipped.len(),
        "[claim] provisioned random codes"
    );
    Ok(report)
}

/// Insert the given codes, skipping those already present.
///
/// Every code is validated before anything is written.
pub async fn provision_codes<I>(
    store: &dyn RecordStore,
    codes: I,
) -> Result<ProvisionReport, ProvisionError>
where
    I: IntoIterator<Item = String>,
{
    let codes: Vec<String> = codes
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    for code in &codes {
        check_code(code)?;
    }

    let mut report = ProvisionReport::default();
    for code in codes {
        insert(store, code, &mut report).await?;
    }

    info!(
        inserted = report.inserted.len(),
        skipped = report.skipped.len(),
        "[claim] provisioned listed codes"
    );
    Ok(report)
}

async fn insert(
    store: &dyn RecordStore,
    code: String,
    report: &mut ProvisionReport,
) -> Result<(), ProvisionError> {
    let record = ClaimRecord::unclaimed(code.clone(), now_ms());
    if store.insert_if_absent(record).await? {
        report.inserted.push(code);
    } else {
        debug!(code = %code, "[claim] code already exists, skipped");
        report.skipped.push(code);
    }
    Ok(())
}

fn check_code(code: &str) -> Result<(), ProvisionError> {
    validate_code(code).map_err(|e| ProvisionError::InvalidCode {
        code: code.to_string(),
        reason: match e {
            ClaimError::InvalidCode(reason) => reason,
            other => other.to_string(),
        },
    })
}
