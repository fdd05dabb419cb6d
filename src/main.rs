use clap::Parser;
use log::{error, LevelFilter};
use mesh_chain::{Command, NodeOpts, Opt, Server};
use std::process;
use std::sync::Arc;
use std::thread;

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Start {
            listen,
            seeds,
            key,
            id,
            all_pool_limit,
            pending_pool_limit,
        } => {
            let opts = NodeOpts::new()
                .with_id(id)
                .with_listen_addr(listen)
                .with_seed_nodes(seeds)
                .with_priv_key(key)
                .with_all_pool_limit(all_pool_limit)
                .with_pending_pool_limit(pending_pool_limit);

            let server = Server::new(opts)?;
            Arc::clone(&server).start()?;
            park_forever();
        }
        Command::LocalNet => {
            let ports = [9977u16, 9978, 9979];
            let mut servers = Vec::with_capacity(ports.len());

            for port in ports {
                // Every node seeds with the other two.
                let seeds: Vec<String> = ports
                    .iter()
                    .filter(|p| **p != port)
                    .map(|p| format!("127.0.0.1:{p}"))
                    .collect();

                let opts = NodeOpts::new()
                    .with_listen_addr(format!("127.0.0.1:{port}"))
                    .with_seed_nodes(seeds);
                servers.push(Server::new(opts)?);
            }

            for server in &servers {
                Arc::clone(server).start()?;
            }
            park_forever();
        }
    }
}

/// The node runs until the process is killed.
fn park_forever() -> ! {
    loop {
        thread::park();
    }
}
