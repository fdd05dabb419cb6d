//! Fixed-size value types shared across the chain, ledger, and wire layer.

pub mod address;
pub mod hash;

pub use address::{Address, ADDRESS_LEN};
pub use hash::{Hash, HASH_LEN};
