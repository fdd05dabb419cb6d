//! Utility functions and helpers
//!
//! Cryptographic primitives (digests, ECDSA signing) and the binary
//! serialization helpers used by every wire and storage structure.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    current_timestamp, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, new_key_pair,
    sha256_digest,
};
pub use serialization::{deserialize, serialize};
