//! In-memory transaction storage
//!
//! The bounded priority store and the two-partition transaction pool built
//! on top of it. Nothing here touches disk; state lives for the process
//! lifetime only.

pub mod sorted_store;
pub mod tx_pool;

pub use sorted_store::SortedTxStore;
pub use tx_pool::TxPool;
