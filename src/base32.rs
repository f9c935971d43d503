//! Base32 codec for TOTP shared secrets.
//!
//! RFC 4648 alphabet (`A-Z2-7`), no padding on encode. Decoding is tolerant
//! of what authenticator apps and users produce: lowercase input, stray
//! whitespace, and trailing `=` padding are all accepted.

use data_encoding::BASE32_NOPAD;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Base32Error {
    #[error("invalid base32 character")]
    InvalidCharacter,
    #[error("invalid base32 length")]
    InvalidLength,
}

/// Encode bytes as unpadded base32.
#[must_use]
pub fn encode(input: &[u8]) -> String {
    BASE32_NOPAD.encode(input)
}

/// Decode base32 text into bytes.
///
/// Input is uppercased and stripped of whitespace and `=` padding before
/// decoding.
///
/// # Errors
/// Returns [`Base32Error::InvalidCharacter`] if any remaining symbol is
/// outside `A-Z2-7`, or [`Base32Error::InvalidLength`] if the input cannot
/// be a whole number of bytes.
pub fn decode(input: &str) -> Result<Vec<u8>, Base32Error> {
    let cleaned: String = input
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace() && *ch != '=')
        .map(|ch| ch.to_ascii_uppercase())
        .collect();

    if !cleaned
        .bytes()
        .all(|byte| byte.is_ascii_uppercase() || (b'2'..=b'7').contains(&byte))
    {
        return Err(Base32Error::InvalidCharacter);
    }

    BASE32_NOPAD
        .decode(cleaned.as_bytes())
        .map_err(|_| Base32Error::InvalidLength)
}
