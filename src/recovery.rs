//! One-time recovery codes for when the second factor is unavailable.
//!
//! Plaintext codes are shown exactly once, at generation time; only the
//! SHA-256 digest of a code is ever persisted or compared. Consumption
//! bookkeeping (marking a code used) belongs to the caller's storage layer.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Codes issued per batch.
pub const BATCH_SIZE: usize = 10;

const CODE_LEN: usize = 16;
const GROUP_SIZE: usize = 4;
const CODE_BYTES: usize = CODE_LEN / 2;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    #[error("failed to generate recovery code")]
    Random,
}

/// Generate a batch of formatted codes (`XXXX-XXXX-XXXX-XXXX`).
///
/// # Errors
/// Returns an error if the random source fails.
pub fn generate(count: usize) -> Result<Vec<String>, RecoveryError> {
    let mut codes = Vec::with_capacity(count);
    for _ in 0..count {
        let mut raw = [0u8; CODE_BYTES];
        OsRng
            .try_fill_bytes(&mut raw)
            .map_err(|_| RecoveryError::Random)?;
        let hex_upper = hex::encode_upper(raw);
        codes.push(group(&hex_upper));
    }
    Ok(codes)
}

/// Generate a standard batch of [`BATCH_SIZE`] codes.
///
/// # Errors
/// Returns an error if the random source fails.
pub fn generate_batch() -> Result<Vec<String>, RecoveryError> {
    generate(BATCH_SIZE)
}

/// Normalize user input back into the canonical dashed form.
///
/// Strips every non-alphanumeric character and uppercases; anything that
/// does not clean up to exactly 16 characters is rejected with `None` so the
/// caller can treat it like any other failed code.
#[must_use]
pub fn normalize(input: &str) -> Option<String> {
    let cleaned: String = input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_uppercase())
        .collect();

    if cleaned.len() != CODE_LEN {
        return None;
    }

    Some(group(&cleaned))
}

/// One-way hash of a code for storage and comparison.
///
/// Input is normalized first so generated codes and user submissions hash
/// identically; returns `None` when the input cannot be a code at all.
#[must_use]
pub fn hash_code(code: &str) -> Option<String> {
    let normalized = normalize(code)?;
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

fn group(cleaned: &str) -> String {
    let mut out = String::with_capacity(CODE_LEN + CODE_LEN / GROUP_SIZE - 1);
    for (idx, chunk) in cleaned.as_bytes().chunks(GROUP_SIZE).enumerate() {
        if idx > 0 {
            out.push('-');
        }
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
    }
    out
}
