//! Envelope encryption for secrets at rest.
//!
//! Arbitrary plaintext strings (third-party API keys and the like) are
//! sealed under a single 256-bit master key with AES-256-GCM. The stored
//! blob is self-contained: base64 of `iv (12 bytes) || ciphertext+tag`.
//! The key is hex-decoded and length-checked once, at startup, and the
//! resulting [`MasterKey`] handle is shared by reference afterwards.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64ct::{Base64, Encoding};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretBox};

const KEY_BYTES: usize = 32;
const IV_BYTES: usize = 12;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("master key is not valid hex")]
    InvalidKey,
    #[error("master key must be exactly {KEY_BYTES} bytes")]
    InvalidKeyLength,
    #[error("failed to generate iv")]
    Random,
    #[error("encryption failed")]
    Encrypt,
    #[error("ciphertext blob is not valid base64")]
    InvalidEncoding,
    #[error("ciphertext blob too short to contain an iv")]
    PayloadTooShort,
    #[error("authentication failed: ciphertext tampered or wrong key")]
    AuthenticationFailed,
    #[error("decrypted payload is not valid utf-8")]
    InvalidUtf8,
}

/// The process-wide master encryption key.
pub struct MasterKey(SecretBox<[u8; KEY_BYTES]>);

impl MasterKey {
    /// Decode and validate a hex-encoded 32-byte key.
    ///
    /// # Errors
    /// Returns [`EnvelopeError::InvalidKey`] on non-hex input and
    /// [`EnvelopeError::InvalidKeyLength`] on any other length; both are
    /// fatal at startup.
    pub fn from_hex(hex_key: &str) -> Result<Self, EnvelopeError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| EnvelopeError::InvalidKey)?;
        let key: [u8; KEY_BYTES] = bytes
            .try_into()
            .map_err(|_| EnvelopeError::InvalidKeyLength)?;
        Ok(Self(SecretBox::new(Box::new(key))))
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(REDACTED)")
    }
}

#[derive(Debug)]
pub struct Envelope {
    key: MasterKey,
}

impl Envelope {
    #[must_use]
    pub fn new(key: MasterKey) -> Self {
        Self { key }
    }

    fn cipher(&self) -> Aes256Gcm {
        let key = Key::<Aes256Gcm>::from_slice(self.key.0.expose_secret());
        Aes256Gcm::new(key)
    }

    /// Seal a plaintext string into a self-contained blob.
    ///
    /// A fresh random IV is drawn per call, so encrypting the same
    /// plaintext twice never yields the same blob.
    ///
    /// # Errors
    /// Returns an error if the random source or the AEAD fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EnvelopeError> {
        let mut iv = [0u8; IV_BYTES];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|_| EnvelopeError::Random)?;

        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| EnvelopeError::Encrypt)?;

        let mut blob = Vec::with_capacity(IV_BYTES + ciphertext.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&ciphertext);

        Ok(Base64::encode_string(&blob))
    }

    /// Open a blob produced by [`Envelope::encrypt`].
    ///
    /// # Errors
    /// Returns [`EnvelopeError::PayloadTooShort`] when the decoded blob
    /// cannot contain anything beyond the IV, and
    /// [`EnvelopeError::AuthenticationFailed`] when the authentication tag
    /// does not verify (tampering or wrong key).
    pub fn decrypt(&self, blob: &str) -> Result<String, EnvelopeError> {
        let decoded = Base64::decode_vec(blob).map_err(|_| EnvelopeError::InvalidEncoding)?;
        if decoded.len() <= IV_BYTES {
            return Err(EnvelopeError::PayloadTooShort);
        }

        let (iv, ciphertext) = decoded.split_at(IV_BYTES);
        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|_| EnvelopeError::AuthenticationFailed)?;

        String::from_utf8(plaintext).map_err(|_| EnvelopeError::InvalidUtf8)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{Envelope, EnvelopeError, MasterKey};
    use base64ct::{Base64, Encoding};

    fn envelope() -> Envelope {
        Envelope::new(MasterKey::from_hex(&"2a".repeat(32)).unwrap())
    }

    #[test]
    fn key_length_is_validated_at_load() {
        assert_eq!(
            MasterKey::from_hex("zz").unwrap_err(),
            EnvelopeError::InvalidKey
        );
        assert_eq!(
            MasterKey::from_hex(&"2a".repeat(16)).unwrap_err(),
            EnvelopeError::InvalidKeyLength
        );
        assert_eq!(
            MasterKey::from_hex(&"2a".repeat(33)).unwrap_err(),
            EnvelopeError::InvalidKeyLength
        );
    }

    #[test]
    fn round_trip_including_empty_and_multibyte() {
        let envelope = envelope();
        for plaintext in ["", "sk-live-1234567890", "pässwörd \u{1F512} 日本語"] {
            let blob = envelope.encrypt(plaintext).unwrap();
            assert_eq!(envelope.decrypt(&blob).unwrap(), plaintext);
        }
    }

    #[test]
    fn fresh_iv_per_call() {
        let envelope = envelope();
        let first = envelope.encrypt("same secret").unwrap();
        let second = envelope.encrypt("same secret").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn tampered_blob_fails_authentication() {
        let envelope = envelope();
        let blob = envelope.encrypt("secret").unwrap();

        let mut decoded = Base64::decode_vec(&blob).unwrap();
        let last = decoded.len() - 1;
        decoded[last] ^= 0xff;
        let tampered = Base64::encode_string(&decoded);

        assert_eq!(
            envelope.decrypt(&tampered).unwrap_err(),
            EnvelopeError::AuthenticationFailed
        );
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let blob = envelope().encrypt("secret").unwrap();
        let other = Envelope::new(MasterKey::from_hex(&"3b".repeat(32)).unwrap());
        assert_eq!(
            other.decrypt(&blob).unwrap_err(),
            EnvelopeError::AuthenticationFailed
        );
    }

    #[test]
    fn undersized_blob_is_rejected_before_decrypting() {
        let envelope = envelope();
        assert_eq!(
            envelope.decrypt("").unwrap_err(),
            EnvelopeError::PayloadTooShort
        );
        let short = Base64::encode_string(&[0u8; 12]);
        assert_eq!(
            envelope.decrypt(&short).unwrap_err(),
            EnvelopeError::PayloadTooShort
        );
        assert_eq!(
            envelope.decrypt("!!!").unwrap_err(),
            EnvelopeError::InvalidEncoding
        );
    }
}
