//! TOTP engine (RFC 6238 over RFC 4226 HOTP).
//!
//! Stateless: every operation is a pure function of the shared secret, the
//! submitted code, and an injectable timestamp, which keeps verification
//! trivially testable. Policy defaults (6 digits, 30 s period, ±1 step of
//! clock-drift tolerance) live on [`VerifyOptions`] and can be overridden
//! per call.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use url::Url;

use crate::base32::{self, Base32Error};

/// Minimum secret size accepted at generation time (128 bits).
pub const MIN_SECRET_BYTES: usize = 16;

/// Default secret size (160 bits, 32 base32 characters).
pub const DEFAULT_SECRET_BYTES: usize = 20;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TotpError {
    #[error("totp secret must be at least {MIN_SECRET_BYTES} bytes")]
    SecretTooShort,
    #[error("failed to generate totp secret")]
    Random,
    #[error("stored totp secret is not valid base32: {0}")]
    Secret(#[from] Base32Error),
    #[error("invalid provisioning parameters")]
    Provisioning,
}

/// Generate a fresh shared secret, returned as base32 text.
///
/// # Errors
/// Returns an error if `size_bytes` is below [`MIN_SECRET_BYTES`] or the
/// random source fails.
pub fn generate_secret(size_bytes: usize) -> Result<String, TotpError> {
    if size_bytes < MIN_SECRET_BYTES {
        return Err(TotpError::SecretTooShort);
    }

    let mut bytes = vec![0u8; size_bytes];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|_| TotpError::Random)?;

    Ok(base32::encode(&bytes))
}

/// Label and policy inputs for an `otpauth://` provisioning URI.
#[derive(Debug, Clone)]
pub struct Provisioning<'a> {
    secret: &'a str,
    account_name: &'a str,
    issuer: &'a str,
    digits: u32,
    period_seconds: u64,
}

impl<'a> Provisioning<'a> {
    #[must_use]
    pub fn new(secret: &'a str, account_name: &'a str, issuer: &'a str) -> Self {
        Self {
            secret,
            account_name,
            issuer,
            digits: 6,
            period_seconds: 30,
        }
    }

    #[must_use]
    pub fn with_digits(mut self, digits: u32) -> Self {
        self.digits = digits;
        self
    }

    #[must_use]
    pub fn with_period_seconds(mut self, period_seconds: u64) -> Self {
        self.period_seconds = period_seconds;
        self
    }

    /// Build the `otpauth://totp/...` URI understood by authenticator apps.
    ///
    /// Issuer and account land in the label (URL-encoded) and the issuer is
    /// repeated as a query parameter, which is what most apps key off.
    ///
    /// # Errors
    /// Returns an error if the label cannot be assembled into a valid URI.
    pub fn uri(&self) -> Result<String, TotpError> {
        let mut url = Url::parse("otpauth://totp/").map_err(|_| TotpError::Provisioning)?;
        url.set_path(&format!("{}:{}", self.issuer, self.account_name));
        url.query_pairs_mut()
            .append_pair("secret", self.secret)
            .append_pair("issuer", self.issuer)
            .append_pair("digits", &self.digits.to_string())
            .append_pair("period", &self.period_seconds.to_string());
        Ok(url.to_string())
    }
}

/// Verification policy; defaults match what the enrollment URI advertises.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub window_steps: u32,
    pub period_seconds: u64,
    pub digits: u32,
    /// Verification time; `None` means "now". Tests inject fixed values.
    pub at_time: Option<DateTime<Utc>>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            window_steps: 1,
            period_seconds: 30,
            digits: 6,
            at_time: None,
        }
    }
}

/// Verify a submitted code against a base32 secret.
///
/// Walks the counters in `[current - window, current + window]` (negative
/// counters skipped) and accepts on an exact match. Whitespace in the
/// submitted code is ignored; an empty submission is rejected before any
/// computation.
///
/// # Errors
/// Returns [`TotpError::Secret`] if the stored secret is not valid base32.
pub fn verify(secret_base32: &str, code: &str, options: &VerifyOptions) -> Result<bool, TotpError> {
    let submitted: String = code.chars().filter(|ch| !ch.is_ascii_whitespace()).collect();
    if submitted.is_empty() {
        return Ok(false);
    }

    let key = base32::decode(secret_base32)?;

    let now = options.at_time.unwrap_or_else(Utc::now).timestamp();
    let period = i64::try_from(options.period_seconds.max(1)).unwrap_or(30);
    let current = now.div_euclid(period);
    let window = i64::from(options.window_steps);

    let mut matched = false;
    for counter in (current - window)..=(current + window) {
        let Ok(counter) = u64::try_from(counter) else {
            continue;
        };
        let candidate = hotp(&key, counter, options.digits);
        matched |= bool::from(candidate.as_bytes().ct_eq(submitted.as_bytes()));
    }

    Ok(matched)
}

/// HOTP value for one counter: HMAC-SHA1 over the big-endian counter,
/// RFC 4226 dynamic truncation, reduced modulo `10^digits` and zero-padded.
#[must_use]
pub fn hotp(key: &[u8], counter: u64, digits: u32) -> String {
    // HMAC-SHA1 accepts keys of any length.
    #[allow(clippy::expect_used)]
    let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = usize::from(digest[digest.len() - 1] & 0x0f);
    let truncated = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    let modulo = 10u32.saturating_pow(digits);
    let value = truncated % modulo;
    format!("{value:0width$}", width = digits as usize)
}
