use crate::crypto::{PrivateKey, PublicKey, Signature};
use crate::error::Result;
use crate::types::Hash;
use crate::utils::{deserialize, serialize};
use serde::{Deserialize, Serialize};

/// A signed value transfer between two accounts.
///
/// The digest covers `from ‖ to ‖ data ‖ value ‖ nonce` (integers in
/// little-endian byte order); the cached `hash` and the `signature` are
/// excluded, so the digest can always be recomputed from the carried fields.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    from: PublicKey,
    to: PublicKey,
    data: Vec<u8>,
    value: u64,
    nonce: i64,

    /// Cached digest of the fields above
    hash: Hash,
    signature: Option<Signature>,
}

impl Transaction {
    /// Build and sign a transfer. The sender is the signer's public key.
    pub fn new(
        signer: &PrivateKey,
        to: PublicKey,
        data: Vec<u8>,
        value: u64,
        nonce: i64,
    ) -> Result<Transaction> {
        let mut tx = Transaction {
            from: signer.public_key().clone(),
            to,
            data,
            value,
            nonce,
            hash: Hash::default(),
            signature: None,
        };
        tx.hash = tx.cal_hash();
        tx.signature = Some(signer.sign(tx.hash.as_bytes())?);
        Ok(tx)
    }

    /// Recompute the digest from the carried fields. Pure: equal fields
    /// always produce an equal hash.
    pub fn cal_hash(&self) -> Hash {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.from.as_bytes());
        buf.extend_from_slice(self.to.as_bytes());
        buf.extend_from_slice(&self.data);
        buf.extend_from_slice(&self.value.to_le_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        Hash::digest(&buf)
    }

    /// True iff the signature is present, non-empty, and verifies the
    /// sender key against a freshly recomputed digest.
    pub fn verify(&self) -> bool {
        match &self.signature {
            None => false,
            Some(signature) => {
                if signature.is_empty() {
                    return false;
                }
                let digest = self.cal_hash();
                signature.verify(&self.from, digest.as_bytes())
            }
        }
    }

    pub fn get_from(&self) -> &PublicKey {
        &self.from
    }

    pub fn get_to(&self) -> &PublicKey {
        &self.to
    }

    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    /// The cached digest carried on the wire. [`Transaction::cal_hash`] is
    /// the authoritative recomputation.
    pub fn get_hash(&self) -> Hash {
        self.hash
    }

    pub fn get_signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}
