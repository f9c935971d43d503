//! Password hashing with scrypt.
//!
//! Hashes are stored as self-describing strings,
//! `scrypt$N$r$p$saltHex$keyHex`, so verification always re-derives with the
//! parameters that produced the stored value. Raising the cost parameters
//! only changes what new hashes look like; old ones keep verifying through
//! the same path until the password is next changed.

use rand::{rngs::OsRng, RngCore};
use scrypt::Params;
use subtle::ConstantTimeEq;

/// Cost parameters for newly created hashes.
const SCRYPT_N: u32 = 16384;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 64;

const SCHEME: &str = "scrypt";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    /// Stored hash string is not a recognized 6-field scrypt record.
    #[error("malformed password hash")]
    MalformedHash,
    /// Random source failed while generating a salt.
    #[error("failed to generate salt")]
    Salt,
    /// Key derivation failed.
    #[error("scrypt key derivation failed")]
    Kdf,
}

/// A parsed `scrypt$N$r$p$saltHex$keyHex` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScryptHash {
    pub n: u32,
    pub r: u32,
    pub p: u32,
    pub salt: Vec<u8>,
    pub key: Vec<u8>,
}

impl ScryptHash {
    /// Parse a stored hash string.
    ///
    /// # Errors
    /// Returns [`PasswordError::MalformedHash`] if the string is not a
    /// 6-field record, the scheme tag is unrecognized, or any field fails to
    /// parse.
    pub fn parse(stored: &str) -> Result<Self, PasswordError> {
        let fields: Vec<&str> = stored.split('$').collect();
        let [scheme, n, r, p, salt_hex, key_hex] = fields.as_slice() else {
            return Err(PasswordError::MalformedHash);
        };

        if *scheme != SCHEME {
            return Err(PasswordError::MalformedHash);
        }

        let n: u32 = n.parse().map_err(|_| PasswordError::MalformedHash)?;
        let r: u32 = r.parse().map_err(|_| PasswordError::MalformedHash)?;
        let p: u32 = p.parse().map_err(|_| PasswordError::MalformedHash)?;
        let salt = hex::decode(salt_hex).map_err(|_| PasswordError::MalformedHash)?;
        let key = hex::decode(key_hex).map_err(|_| PasswordError::MalformedHash)?;

        if key.is_empty() {
            return Err(PasswordError::MalformedHash);
        }

        Ok(Self { n, r, p, salt, key })
    }

    fn serialize(&self) -> String {
        format!(
            "{SCHEME}${}${}${}${}${}",
            self.n,
            self.r,
            self.p,
            hex::encode(&self.salt),
            hex::encode(&self.key)
        )
    }

    /// scrypt takes log2(N); N must be a power of two.
    fn params(&self, key_len: usize) -> Result<Params, PasswordError> {
        if self.n < 2 || !self.n.is_power_of_two() {
            return Err(PasswordError::MalformedHash);
        }
        let log_n = u8::try_from(self.n.trailing_zeros()).map_err(|_| PasswordError::MalformedHash)?;
        Params::new(log_n, self.r, self.p, key_len).map_err(|_| PasswordError::MalformedHash)
    }
}

/// Hash a password with the current cost parameters.
///
/// Each call uses a fresh random salt, so hashing the same password twice
/// yields two different strings that both verify.
///
/// # Errors
/// Returns an error if the random source or the KDF fails.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|_| PasswordError::Salt)?;

    let record = ScryptHash {
        n: SCRYPT_N,
        r: SCRYPT_R,
        p: SCRYPT_P,
        salt: salt.to_vec(),
        key: vec![0u8; KEY_LEN],
    };

    let mut key = vec![0u8; KEY_LEN];
    let params = record.params(KEY_LEN)?;
    scrypt::scrypt(password.as_bytes(), &record.salt, &params, &mut key)
        .map_err(|_| PasswordError::Kdf)?;

    Ok(ScryptHash { key, ..record }.serialize())
}

/// Verify a password against a stored hash string.
///
/// Re-derives a key of the stored key length using the parameters embedded
/// in the record and compares in constant time. A wrong password is
/// `Ok(false)`, never an error.
///
/// # Errors
/// Returns [`PasswordError::MalformedHash`] if the stored string does not
/// parse or embeds unusable parameters.
pub fn verify(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let record = ScryptHash::parse(stored)?;

    let mut derived = vec![0u8; record.key.len()];
    let params = record.params(derived.len())?;
    scrypt::scrypt(password.as_bytes(), &record.salt, &params, &mut derived)
        .map_err(|_| PasswordError::MalformedHash)?;

    Ok(derived.ct_eq(&record.key).into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{hash, verify, PasswordError, ScryptHash};

    #[test]
    fn hash_then_verify_round_trip() {
        let stored = hash("correct horse battery staple").unwrap();
        assert!(stored.starts_with("scrypt$16384$8$1$"));
        assert!(verify("correct horse battery staple", &stored).unwrap());
        assert!(!verify("correct horse battery stable", &stored).unwrap());
    }

    #[test]
    fn two_hashes_differ_but_both_verify() {
        let first = hash("hunter2").unwrap();
        let second = hash("hunter2").unwrap();
        assert_ne!(first, second);
        assert!(verify("hunter2", &first).unwrap());
        assert!(verify("hunter2", &second).unwrap());
    }

    #[test]
    fn verify_accepts_legacy_cost_parameters() {
        // A record produced under older, cheaper parameters still verifies
        // because the parameters ride along in the string.
        let legacy = ScryptHash {
            n: 4096,
            r: 8,
            p: 1,
            salt: b"0123456789abcdef".to_vec(),
            key: vec![0u8; 32],
        };
        let mut key = vec![0u8; 32];
        let params = scrypt::Params::new(12, 8, 1, 32).unwrap();
        scrypt::scrypt(b"old password", &legacy.salt, &params, &mut key).unwrap();
        let stored = format!(
            "scrypt$4096$8$1${}${}",
            hex::encode(&legacy.salt),
            hex::encode(&key)
        );

        assert!(verify("old password", &stored).unwrap());
        assert!(!verify("new password", &stored).unwrap());
    }

    #[test]
    fn malformed_records_are_rejected() {
        let cases = [
            "",
            "plain",
            "bcrypt$16384$8$1$aa$bb",
            "scrypt$16384$8$1$zz$bb",
            "scrypt$16384$8$1$aa",
            "scrypt$16384$8$1$aa$bb$cc",
            "scrypt$notanumber$8$1$aa$bb",
            "scrypt$16383$8$1$aabb$ccdd",
        ];
        for stored in cases {
            assert_eq!(
                verify("anything", stored),
                Err(PasswordError::MalformedHash),
                "{stored}"
            );
        }
    }

    #[test]
    fn parse_exposes_embedded_parameters() {
        let stored = hash("pw").unwrap();
        let record = ScryptHash::parse(&stored).unwrap();
        assert_eq!(record.n, 16384);
        assert_eq!(record.r, 8);
        assert_eq!(record.p, 1);
        assert_eq!(record.salt.len(), 16);
        assert_eq!(record.key.len(), 64);
    }
}
