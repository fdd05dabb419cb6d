use crate::error::{BlockchainError, Result};
use uuid::Uuid;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9977";
pub const DEFAULT_ALL_POOL_LIMIT: usize = 10_000;
pub const DEFAULT_PENDING_POOL_LIMIT: usize = 4096;

/// Option values for one node. Unset fields are filled with defaults by
/// [`NodeOpts::resolve`]; an empty seed list is the one fatal omission.
#[derive(Debug, Clone)]
pub struct NodeOpts {
    /// Node identity carried in status gossip; generated when empty
    pub id: String,
    pub listen_addr: String,
    pub seed_nodes: Vec<String>,
    /// Hex-encoded PKCS#8 key; a fresh key is generated when empty
    pub priv_key_hex: String,
    pub all_pool_limit: usize,
    pub pending_pool_limit: usize,
}

impl Default for NodeOpts {
    fn default() -> Self {
        NodeOpts {
            id: String::new(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            seed_nodes: Vec::new(),
            priv_key_hex: String::new(),
            all_pool_limit: DEFAULT_ALL_POOL_LIMIT,
            pending_pool_limit: DEFAULT_PENDING_POOL_LIMIT,
        }
    }
}

impl NodeOpts {
    pub fn new() -> NodeOpts {
        NodeOpts::default()
    }

    pub fn with_id(mut self, id: String) -> NodeOpts {
        self.id = id;
        self
    }

    pub fn with_listen_addr(mut self, addr: String) -> NodeOpts {
        self.listen_addr = addr;
        self
    }

    pub fn with_seed_nodes(mut self, seeds: Vec<String>) -> NodeOpts {
        self.seed_nodes = seeds;
        self
    }

    pub fn with_priv_key(mut self, hex: String) -> NodeOpts {
        self.priv_key_hex = hex;
        self
    }

    pub fn with_all_pool_limit(mut self, limit: usize) -> NodeOpts {
        self.all_pool_limit = limit;
        self
    }

    pub fn with_pending_pool_limit(mut self, limit: usize) -> NodeOpts {
        self.pending_pool_limit = limit;
        self
    }

    /// Fill defaults and validate. A node without seed nodes cannot join
    /// the mesh, so that is rejected outright.
    pub fn resolve(mut self) -> Result<NodeOpts> {
        if self.seed_nodes.is_empty() {
            return Err(BlockchainError::NoSeedNodes);
        }
        if self.id.is_empty() {
            self.id = Uuid::new_v4().to_string();
        }
        if self.listen_addr.is_empty() {
            self.listen_addr = DEFAULT_LISTEN_ADDR.to_string();
        }
        if self.all_pool_limit == 0 {
            self.all_pool_limit = DEFAULT_ALL_POOL_LIMIT;
        }
        if self.pending_pool_limit == 0 {
            self.pending_pool_limit = DEFAULT_PENDING_POOL_LIMIT;
        }
        Ok(self)
    }
}
