//! Single-use email verification codes.
//!
//! The plaintext code only ever travels in the mailed link; the database keeps
//! its SHA-256 digest.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a generated secret code.
pub const SECRET_CODE_LEN: usize = 32;

/// How long a verification code stays redeemable.
pub const VERIFY_EMAIL_TTL: Duration = Duration::minutes(15);

/// Why a verification attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The code does not match the record.
    #[error("invalid secret code")]
    CodeMismatch,

    /// The record was already redeemed or invalidated.
    #[error("verification code has already been used")]
    AlreadyUsed,

    /// The record expired.
    #[error("verification code has expired")]
    Expired,
}

/// Generates a random alphanumeric secret code.
#[must_use]
pub fn generate_secret_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_CODE_LEN)
        .map(char::from)
        .collect()
}

/// Returns the hex SHA-256 digest stored in place of `code`.
#[must_use]
pub fn hash_secret_code(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Returns the expiry of a code created at `created_at`.
#[must_use]
pub fn expires_at(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + VERIFY_EMAIL_TTL
}

/// Checks whether a stored record can be redeemed with `code` at `now`.
///
/// Mismatch is reported before the used/expired state so a wrong code never
/// reveals anything about the record.
pub fn check_redeemable(
    stored_hash: &str,
    is_used: bool,
    expired_at: DateTime<Utc>,
    code: &str,
    now: DateTime<Utc>,
) -> Result<(), VerificationError> {
    if hash_secret_code(code) != stored_hash {
        return Err(VerificationError::CodeMismatch);
    }
    if is_used {
        return Err(VerificationError::AlreadyUsed);
    }
    if now >= expired_at {
        return Err(VerificationError::Expired);
    }
    Ok(())
}
