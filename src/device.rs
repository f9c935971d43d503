//! Signed "remember this device" tokens.
//!
//! A trusted device carries `deviceId.token.signature` in a cookie. The
//! signature is an HMAC over the first two segments under a static server
//! key, so validating it needs no lookup; whether the device is *still*
//! trusted (not revoked, not expired) is a separate check the caller makes
//! against the persisted `token_hash`.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// How long a device stays trusted after second-factor success.
pub const TRUST_PERIOD_DAYS: i64 = 30;

const DEVICE_ID_BYTES: usize = 16;
const TOKEN_BYTES: usize = 32;
const KEY_BYTES: usize = 32;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("device signing key is not valid hex")]
    InvalidKey,
    #[error("device signing key must be exactly {KEY_BYTES} bytes")]
    InvalidKeyLength,
    #[error("failed to generate device token")]
    Random,
}

/// Static HMAC key for cookie signatures, hex-decoded and validated once at
/// startup.
pub struct DeviceKey(SecretBox<[u8; KEY_BYTES]>);

impl DeviceKey {
    /// Decode and validate a hex-encoded signing key.
    ///
    /// # Errors
    /// Returns an error if the input is not hex or not exactly 32 bytes;
    /// callers treat this as fatal at startup.
    pub fn from_hex(hex_key: &str) -> Result<Self, DeviceError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| DeviceError::InvalidKey)?;
        let key: [u8; KEY_BYTES] = bytes
            .try_into()
            .map_err(|_| DeviceError::InvalidKeyLength)?;
        Ok(Self(SecretBox::new(Box::new(key))))
    }
}

impl std::fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DeviceKey(REDACTED)")
    }
}

/// A freshly issued remember-device credential.
///
/// `token` is shown to the client once; the storage layer keeps only
/// `token_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceToken {
    pub device_id: String,
    pub token: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Segments recovered from a cookie whose signature checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCookie {
    pub device_id: String,
    pub token: String,
}

#[derive(Debug)]
pub struct DeviceTokenSigner {
    key: DeviceKey,
}

impl DeviceTokenSigner {
    #[must_use]
    pub fn new(key: DeviceKey) -> Self {
        Self { key }
    }

    /// Issue a new device credential valid for [`TRUST_PERIOD_DAYS`].
    ///
    /// # Errors
    /// Returns an error if the random source fails.
    pub fn generate(&self) -> Result<DeviceToken, DeviceError> {
        let mut id_bytes = [0u8; DEVICE_ID_BYTES];
        OsRng
            .try_fill_bytes(&mut id_bytes)
            .map_err(|_| DeviceError::Random)?;

        let mut token_bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut token_bytes)
            .map_err(|_| DeviceError::Random)?;

        let token = Base64UrlUnpadded::encode_string(&token_bytes);

        Ok(DeviceToken {
            device_id: hex::encode(id_bytes),
            token_hash: hash_token(&token),
            token,
            expires_at: Utc::now() + Duration::days(TRUST_PERIOD_DAYS),
        })
    }

    /// HMAC-SHA256 signature over `"{device_id}.{token}"`, hex-encoded.
    #[must_use]
    pub fn sign(&self, device_id: &str, token: &str) -> String {
        // HMAC-SHA256 accepts keys of any length.
        #[allow(clippy::expect_used)]
        let mut mac = Hmac::<Sha256>::new_from_slice(self.key.0.expose_secret())
            .expect("hmac accepts any key length");
        mac.update(device_id.as_bytes());
        mac.update(b".");
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Assemble the cookie payload `deviceId.token.signature`.
    #[must_use]
    pub fn cookie_value(&self, device_id: &str, token: &str) -> String {
        let signature = self.sign(device_id, token);
        format!("{device_id}.{token}.{signature}")
    }

    /// Split and authenticate a cookie payload.
    ///
    /// Returns `None` unless exactly three segments are present and the
    /// third is the signature this server would have produced for the first
    /// two. A valid signature does not mean the device is still trusted;
    /// callers must still check the persisted `token_hash`.
    #[must_use]
    pub fn parse_cookie_value(&self, raw: &str) -> Option<ParsedCookie> {
        let segments: Vec<&str> = raw.split('.').collect();
        let [device_id, token, signature] = segments.as_slice() else {
            return None;
        };

        let expected = self.sign(device_id, token);
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return None;
        }

        Some(ParsedCookie {
            device_id: (*device_id).to_string(),
            token: (*token).to_string(),
        })
    }
}

/// One-way hash of a raw token for persistence and lookup.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether a stored credential has aged out.
#[must_use]
pub fn is_expired(expires_at: DateTime<Utc>) -> bool {
    expires_at <= Utc::now()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{hash_token, is_expired, DeviceError, DeviceKey, DeviceTokenSigner};
    use chrono::{Duration, Utc};

    fn signer() -> DeviceTokenSigner {
        let key = DeviceKey::from_hex(&"ab".repeat(32)).unwrap();
        DeviceTokenSigner::new(key)
    }

    #[test]
    fn key_must_be_32_bytes_of_hex() {
        assert_eq!(
            DeviceKey::from_hex("not hex").unwrap_err(),
            DeviceError::InvalidKey
        );
        assert_eq!(
            DeviceKey::from_hex("abcd").unwrap_err(),
            DeviceError::InvalidKeyLength
        );
        assert!(DeviceKey::from_hex(&"00".repeat(32)).is_ok());
    }

    #[test]
    fn generated_token_shape() {
        let issued = signer().generate().unwrap();
        assert_eq!(issued.device_id.len(), 32);
        assert!(issued.device_id.chars().all(|ch| ch.is_ascii_hexdigit()));
        // 32 bytes of base64url without padding.
        assert_eq!(issued.token.len(), 43);
        assert_eq!(issued.token_hash, hash_token(&issued.token));
        assert!(issued.expires_at > Utc::now() + Duration::days(29));
        assert!(issued.expires_at < Utc::now() + Duration::days(31));
    }

    #[test]
    fn cookie_round_trip() {
        let signer = signer();
        let issued = signer.generate().unwrap();
        let cookie = signer.cookie_value(&issued.device_id, &issued.token);

        let parsed = signer.parse_cookie_value(&cookie).unwrap();
        assert_eq!(parsed.device_id, issued.device_id);
        assert_eq!(parsed.token, issued.token);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let signer = signer();
        let issued = signer.generate().unwrap();
        let cookie = signer.cookie_value(&issued.device_id, &issued.token);

        // Flip one character in the signature segment.
        let mut chars: Vec<char> = cookie.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '0' { '1' } else { '0' };
        let tampered: String = chars.into_iter().collect();

        assert!(signer.parse_cookie_value(&tampered).is_none());
    }

    #[test]
    fn wrong_segment_count_is_rejected() {
        let signer = signer();
        assert!(signer.parse_cookie_value("").is_none());
        assert!(signer.parse_cookie_value("a.b").is_none());
        assert!(signer.parse_cookie_value("a.b.c.d").is_none());
    }

    #[test]
    fn signature_is_keyed() {
        let first = signer();
        let other_key = DeviceKey::from_hex(&"cd".repeat(32)).unwrap();
        let other = DeviceTokenSigner::new(other_key);

        let issued = first.generate().unwrap();
        let cookie = first.cookie_value(&issued.device_id, &issued.token);
        assert!(other.parse_cookie_value(&cookie).is_none());
    }

    #[test]
    fn expiry_is_a_pure_comparison() {
        assert!(is_expired(Utc::now() - Duration::seconds(1)));
        assert!(!is_expired(Utc::now() + Duration::days(30)));
    }
}
