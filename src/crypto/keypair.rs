use crate::error::{BlockchainError, Result};
use crate::types::{Address, ADDRESS_LEN};
use crate::utils::{
    ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, new_key_pair, sha256_digest,
};
use data_encoding::HEXLOWER;
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed length of an r‖s signature in bytes
pub const SIGNATURE_LEN: usize = 64;

/// An ECDSA P-256 public key (SEC1 uncompressed point bytes).
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> PublicKey {
        PublicKey(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The account identifier for this key: the first 20 bytes of the
    /// SHA-256 digest of the key bytes.
    pub fn address(&self) -> Address {
        let digest = sha256_digest(&self.0);
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&digest[..ADDRESS_LEN]);
        Address::new(out)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.0))
    }
}

/// A fixed-size (r, s) signature over a transaction digest.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Signature {
        Signature(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Verify this signature over `message` against `public_key`.
    pub fn verify(&self, public_key: &PublicKey, message: &[u8]) -> bool {
        ecdsa_p256_sha256_sign_verify(public_key.as_bytes(), &self.0, message)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.0))
    }
}

/// An ECDSA P-256 key pair. The PKCS#8 document is the canonical secret
/// form; the public key is cached at construction.
#[derive(Clone)]
pub struct PrivateKey {
    pkcs8: Vec<u8>,
    public_key: PublicKey,
}

impl PrivateKey {
    /// Generate a fresh key pair.
    pub fn generate() -> Result<PrivateKey> {
        let pkcs8 = new_key_pair()?;
        Self::from_pkcs8(pkcs8)
    }

    /// Restore a key pair from its PKCS#8 document.
    pub fn from_pkcs8(pkcs8: Vec<u8>) -> Result<PrivateKey> {
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &pkcs8, &rng)
            .map_err(|e| {
                BlockchainError::Crypto(format!("failed to create key pair from PKCS8: {e}"))
            })?;
        let public_key = PublicKey(key_pair.public_key().as_ref().to_vec());
        Ok(PrivateKey { pkcs8, public_key })
    }

    /// Restore a key pair from a hex-encoded PKCS#8 document.
    pub fn from_hex(hex: &str) -> Result<PrivateKey> {
        let pkcs8 = HEXLOWER
            .decode(hex.as_bytes())
            .map_err(|e| BlockchainError::Crypto(format!("invalid private key hex: {e}")))?;
        Self::from_pkcs8(pkcs8)
    }

    /// Use the supplied hex key, or generate a fresh one when it is empty.
    pub fn from_hex_or_generate(hex: &str) -> Result<PrivateKey> {
        if hex.is_empty() {
            Self::generate()
        } else {
            Self::from_hex(hex)
        }
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.pkcs8)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Sign `message`, producing the fixed 64-byte r‖s serialization.
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        let bytes = ecdsa_p256_sha256_sign_digest(&self.pkcs8, message)?;
        Ok(Signature(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let key = PrivateKey::generate().unwrap();
        let signature = key.sign(b"digest").unwrap();

        assert_eq!(signature.as_bytes().len(), SIGNATURE_LEN);
        assert!(signature.verify(key.public_key(), b"digest"));
        assert!(!signature.verify(key.public_key(), b"tampered"));

        let other = PrivateKey::generate().unwrap();
        assert!(!signature.verify(other.public_key(), b"digest"));
    }

    #[test]
    fn test_hex_round_trip() {
        let key = PrivateKey::generate().unwrap();
        let restored = PrivateKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key.public_key(), restored.public_key());

        // The restored key must produce signatures the original key's
        // public half accepts.
        let signature = restored.sign(b"payload").unwrap();
        assert!(signature.verify(key.public_key(), b"payload"));
    }

    #[test]
    fn test_from_hex_or_generate() {
        let fresh = PrivateKey::from_hex_or_generate("").unwrap();
        let restored = PrivateKey::from_hex_or_generate(&fresh.to_hex()).unwrap();
        assert_eq!(fresh.public_key(), restored.public_key());

        assert!(PrivateKey::from_hex_or_generate("zz-not-hex").is_err());
    }

    #[test]
    fn test_address_derivation_is_stable() {
        let key = PrivateKey::generate().unwrap();
        let addr1 = key.public_key().address();
        let addr2 = key.public_key().address();
        assert_eq!(addr1, addr2);
        assert!(!addr1.is_zero());

        let other = PrivateKey::generate().unwrap();
        assert_ne!(addr1, other.public_key().address());
    }
}
