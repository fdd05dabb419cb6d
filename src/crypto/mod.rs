//! Key management
//!
//! ECDSA P-256 key pairs with fixed-size signature serialization, and the
//! derivation of 20-byte account addresses from public keys.

pub mod keypair;

pub use keypair::{PrivateKey, PublicKey, Signature, SIGNATURE_LEN};
