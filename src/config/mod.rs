//! Node configuration
//!
//! Per-node option values with defaults: listen address, seed list, key
//! material, and pool capacities.

pub mod settings;

pub use settings::{
    NodeOpts, DEFAULT_ALL_POOL_LIMIT, DEFAULT_LISTEN_ADDR, DEFAULT_PENDING_POOL_LIMIT,
};
