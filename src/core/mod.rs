//! Core chain functionality
//!
//! Blocks, signed value-transfer transactions, the account ledger, the
//! append validator, and the chain itself.

pub mod account_state;
pub mod block;
pub mod blockchain;
pub mod transaction;
pub mod validator;

pub use account_state::{Account, AccountState};
pub use block::{Block, BlockHeader, BLOCK_VERSION};
pub use blockchain::Blockchain;
pub use transaction::Transaction;
pub use validator::{BlockValidator, Validate};
