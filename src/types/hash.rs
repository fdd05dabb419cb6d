use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a content digest in bytes (SHA-256 output)
pub const HASH_LEN: usize = 32;

/// A 32-byte content digest. The zero hash is reserved for the genesis
/// predecessor.
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    pub fn new(bytes: [u8; HASH_LEN]) -> Hash {
        Hash(bytes)
    }

    /// Build a hash from a byte slice, rejecting anything that is not
    /// exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Hash> {
        if bytes.len() != HASH_LEN {
            return Err(BlockchainError::Crypto(format!(
                "invalid hash length: {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(bytes);
        Ok(Hash(out))
    }

    /// SHA-256 digest of `data`.
    pub fn digest(data: &[u8]) -> Hash {
        let digest = crate::utils::sha256_digest(data);
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        Hash(out)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// A random hash, for synthetic test fixtures.
    pub fn random() -> Hash {
        use ring::rand::{SecureRandom, SystemRandom};
        let mut out = [0u8; HASH_LEN];
        // SystemRandom only fails if the platform RNG is unavailable.
        if SystemRandom::new().fill(&mut out).is_err() {
            log::error!("system RNG unavailable, returning zero hash");
        }
        Hash(out)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", HEXLOWER.encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_hash() {
        assert!(Hash::default().is_zero());
        assert!(!Hash::new([1u8; HASH_LEN]).is_zero());
    }

    #[test]
    fn test_from_slice_rejects_bad_length() {
        assert!(Hash::from_slice(&[0u8; 31]).is_err());
        assert!(Hash::from_slice(&[0u8; 33]).is_err());
        assert!(Hash::from_slice(&[0u8; 32]).is_ok());
    }

    #[test]
    fn test_digest_is_deterministic() {
        let a = Hash::digest(b"payload");
        let b = Hash::digest(b"payload");
        assert_eq!(a, b);
        assert_ne!(a, Hash::digest(b"other"));
    }

    #[test]
    fn test_display_is_lowercase_hex() {
        let hash = Hash::new([0xab; HASH_LEN]);
        assert_eq!(hash.to_string(), "ab".repeat(HASH_LEN));
    }
}
