//! # mesh-chain
//!
//! A peer-to-peer blockchain node. Each process keeps a local chain of
//! cryptographically linked blocks of signed value transfers, applies them
//! to an in-memory account ledger, and converges with its peers over a TCP
//! mesh bootstrapped from a static seed list.
//!
//! ## Layout
//! - `core/`: blocks, transactions, the ledger, the chain, and the append
//!   validator, including the reorganization index maintenance
//! - `storage/`: the bounded priority store and the two-partition
//!   transaction pool
//! - `network/`: typed messages, length-prefix framed TCP transport, and
//!   the node server (handlers, broadcast, status gossip, reorg driver)
//! - `crypto/`: ECDSA P-256 key pairs and address derivation
//! - `types/`: the fixed-size `Hash` and `Address` values
//! - `config/`, `cli/`: node options and the bootstrap commands
//!
//! There is no mining, no fees, and no persistence: blocks carry a nonce
//! that is never contested, and all state lives for the process lifetime.

pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod network;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{
    NodeOpts, DEFAULT_ALL_POOL_LIMIT, DEFAULT_LISTEN_ADDR, DEFAULT_PENDING_POOL_LIMIT,
};
pub use core::{
    Account, AccountState, Block, BlockHeader, BlockValidator, Blockchain, Transaction, Validate,
    BLOCK_VERSION,
};
pub use crypto::{PrivateKey, PublicKey, Signature};
pub use error::{BlockchainError, Result};
pub use network::{
    BlocksMessage, GetBlocksMessage, GetPeersMessage, GetStatusMessage, Message, MessageType,
    PeersMessage, Server, StatusMessage, NODE_VERSION,
};
pub use storage::{SortedTxStore, TxPool};
pub use types::{Address, Hash};
pub use utils::{current_timestamp, deserialize, serialize, sha256_digest};
