//! Error handling for the node
//!
//! One crate-wide error enum, named by effect. Consensus-relevant errors
//! (ledger, validator) propagate to the nearest handler; wire and transport
//! errors are logged at the call site and never fatal.

use crate::types::Address;
use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

#[derive(Debug, Clone)]
pub enum BlockchainError {
    /// Transfer attempted from the zero address
    ZeroAddress,
    /// Transfer attempted from an address with no account
    AccountNotExists(Address),
    /// Sender balance cannot cover the transfer
    InsufficientBalance { required: u64, available: u64 },
    /// Block height out of range for a lookup
    BlockNotFound(u32),
    /// Block rejected by the append validator
    BlockValidationFailed(String),
    /// Transaction failed signature verification
    InvalidTransaction(String),
    /// Node construction requires at least one seed node
    NoSeedNodes,
    /// Encode/decode failures
    Serialization(String),
    /// Socket and peer errors
    Network(String),
    /// Key generation, signing, digest errors
    Crypto(String),
    /// Bad option values
    Config(String),
    /// File / socket I/O errors
    Io(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::ZeroAddress => write!(f, "transfer from the zero address"),
            BlockchainError::AccountNotExists(addr) => write!(f, "no such account: {addr}"),
            BlockchainError::InsufficientBalance {
                required,
                available,
            } => {
                write!(
                    f,
                    "insufficient balance: required {required}, available {available}"
                )
            }
            BlockchainError::BlockNotFound(height) => {
                write!(f, "block not found at height {height}")
            }
            BlockchainError::BlockValidationFailed(msg) => {
                write!(f, "block validation failed: {msg}")
            }
            BlockchainError::InvalidTransaction(msg) => write!(f, "invalid transaction: {msg}"),
            BlockchainError::NoSeedNodes => write!(f, "no seed nodes provided"),
            BlockchainError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            BlockchainError::Network(msg) => write!(f, "network error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "cryptographic error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}
