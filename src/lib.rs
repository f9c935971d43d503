//! # Sigilo (Authentication & Secrets-Security Core)
//!
//! `sigilo` implements the cryptographic contracts behind an admin sign-in
//! flow: password hashing, a TOTP second factor with recovery codes, signed
//! remember-device tokens, envelope encryption for secrets at rest, and the
//! ephemeral challenge ledger that ties a sign-in handshake together.
//!
//! ## What lives here, what does not
//!
//! This crate owns algorithms and formats only. Request routing, session
//! cookies, authorization, rate limiting, and durable storage are the host
//! application's problem; they call into this crate and persist what it
//! hands back. The one external dependency is an ephemeral key-value store
//! for pending challenges, reached through the narrow
//! [`challenge::ChallengeStore`] trait.
//!
//! ## Formats
//!
//! Everything stored or shown is self-describing text:
//!
//! - Password hashes: `scrypt$N$r$p$saltHex$keyHex`; verification re-derives
//!   with the parameters embedded in the stored string, so cost upgrades need
//!   no migration.
//! - TOTP secrets: base32 (`A-Z2-7`), shared via `otpauth://` URIs.
//! - Recovery codes: `XXXX-XXXX-XXXX-XXXX`, SHA-256-hashed for storage.
//! - Remember-device cookies: `deviceId.token.hmacHex`, HMAC-SHA256 under a
//!   static server key.
//! - Encrypted secrets: base64 of `iv || ciphertext+tag` (AES-256-GCM).
//!
//! ## Keys
//!
//! Two 32-byte hex keys are required configuration: the master encryption
//! key ([`envelope::MasterKey`]) and the device-token signing key
//! ([`device::DeviceKey`]). Both are validated once, at startup; a bad key
//! is a fatal configuration error, never a per-request one.
//!
//! ## Concurrency
//!
//! All primitives are synchronous, stateless, and safe to call from
//! concurrent tasks. The scrypt KDF is deliberately slow; dispatch it off
//! the async event loop (e.g. `tokio::task::spawn_blocking`) and rate-limit
//! authentication attempts upstream. Only the challenge ledger does I/O.

pub mod base32;
pub mod challenge;
pub mod cli;
pub mod device;
pub mod envelope;
pub mod password;
pub mod recovery;
pub mod totp;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
