use crate::config::{DEFAULT_ALL_POOL_LIMIT, DEFAULT_LISTEN_ADDR, DEFAULT_PENDING_POOL_LIMIT};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mesh-chain", about = "A peer-to-peer blockchain node")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a single node
    Start {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
        listen: String,

        /// Seed node to connect to (repeat for several)
        #[arg(long = "seed", value_name = "ADDR", required = true)]
        seeds: Vec<String>,

        /// Hex-encoded PKCS#8 private key (empty generates a fresh key)
        #[arg(long, default_value = "")]
        key: String,

        /// Node id carried in status gossip (empty generates one)
        #[arg(long, default_value = "")]
        id: String,

        /// Capacity of the `all` transaction pool partition
        #[arg(long, default_value_t = DEFAULT_ALL_POOL_LIMIT)]
        all_pool_limit: usize,

        /// Capacity of the `pending` transaction pool partition
        #[arg(long, default_value_t = DEFAULT_PENDING_POOL_LIMIT)]
        pending_pool_limit: usize,
    },

    /// Run the local reference network: three nodes on ports 9977-9979,
    /// each seeded with the other two
    LocalNet,
}
