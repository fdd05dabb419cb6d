use crate::config::NodeOpts;
use crate::core::{Block, Blockchain, Transaction};
use crate::crypto::PrivateKey;
use crate::error::{BlockchainError, Result};
use crate::network::message::{
    BlocksMessage, GetBlocksMessage, GetStatusMessage, Message, MessageType, StatusMessage,
};
use crate::network::transport::{receive_loop, NetEvent, TcpPeer, TcpTransport, RPC};
use crate::storage::TxPool;
use crate::utils::deserialize;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

/// Protocol version carried in status gossip
pub const NODE_VERSION: u32 = 1;

/// Period of the status gossip ticker
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// A running node: the chain, the transaction pool, the peer mesh, and the
/// handlers wiring them together.
///
/// Task layout: one accept loop, one receive loop per peer, one dispatcher
/// consuming the shared event channel, one status ticker, and one
/// short-lived thread per received RPC. The quit signal stops the
/// dispatcher and the ticker; receive loops end with their sockets.
pub struct Server {
    id: String,
    opts: NodeOpts,
    chain: Blockchain,
    pool: TxPool,
    priv_key: PrivateKey,
    peers: Arc<RwLock<HashMap<SocketAddr, Arc<TcpPeer>>>>,
    event_tx: Sender<NetEvent>,
    event_rx: Mutex<Option<Receiver<NetEvent>>>,
    transport: Mutex<Option<TcpTransport>>,
    local_addr: SocketAddr,
    /// Held across rollback + re-application so no two reorganizations
    /// interleave and no reader observes a half-applied switch.
    reorg_lock: Mutex<()>,
    ticker_quit_tx: Sender<()>,
    ticker_quit_rx: Mutex<Option<Receiver<()>>>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("id", &self.id).finish()
    }
}

impl Server {
    /// Build a node from options. Fails with `NoSeedNodes` when the seed
    /// list is empty; binds the listen socket; seeds the deterministic
    /// genesis block so every peer shares a common ancestor.
    pub fn new(opts: NodeOpts) -> Result<Arc<Server>> {
        let opts = opts.resolve()?;
        let priv_key = PrivateKey::from_hex_or_generate(&opts.priv_key_hex)?;
        let transport = TcpTransport::new(&opts.listen_addr)?;
        let local_addr = transport.local_addr();

        let chain = Blockchain::new();
        chain.add_block_without_validation(Block::genesis());

        let pool = TxPool::new(opts.all_pool_limit, opts.pending_pool_limit);
        let (event_tx, event_rx) = mpsc::channel();
        let (ticker_quit_tx, ticker_quit_rx) = mpsc::channel();

        Ok(Arc::new(Server {
            id: opts.id.clone(),
            opts,
            chain,
            pool,
            priv_key,
            peers: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            transport: Mutex::new(Some(transport)),
            local_addr,
            reorg_lock: Mutex::new(()),
            ticker_quit_tx,
            ticker_quit_rx: Mutex::new(Some(ticker_quit_rx)),
        }))
    }

    /// Start the accept loop, dial the seed nodes, and spawn the dispatcher
    /// and status ticker. Returns once everything is running.
    pub fn start(self: Arc<Self>) -> Result<()> {
        let already_started =
            || BlockchainError::Config("server already started".to_string());
        let transport = self
            .transport
            .lock()
            .expect("transport lock poisoned")
            .take()
            .ok_or_else(already_started)?;
        let event_rx = self
            .event_rx
            .lock()
            .expect("event channel lock poisoned")
            .take()
            .ok_or_else(already_started)?;
        let ticker_quit_rx = self
            .ticker_quit_rx
            .lock()
            .expect("ticker channel lock poisoned")
            .take()
            .ok_or_else(already_started)?;

        transport.start(self.event_tx.clone());

        for seed in self.opts.seed_nodes.clone() {
            match TcpStream::connect(&seed) {
                Ok(stream) => self.register_peer(stream, true),
                Err(e) => error!("failed to connect to seed node {seed}: {e}"),
            }
        }

        info!("node {} listening on {}", self.id, self.local_addr);

        {
            let server = Arc::clone(&self);
            thread::spawn(move || server.dispatch_loop(event_rx));
        }
        {
            let server = Arc::clone(&self);
            thread::spawn(move || server.status_loop(ticker_quit_rx));
        }
        Ok(())
    }

    /// Stop the dispatcher and the status ticker. Receive loops terminate
    /// when their sockets close.
    pub fn shutdown(&self) {
        let _ = self.event_tx.send(NetEvent::Shutdown);
        let _ = self.ticker_quit_tx.send(());
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn chain(&self) -> &Blockchain {
        &self.chain
    }

    pub fn pool(&self) -> &TxPool {
        &self.pool
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.priv_key
    }

    pub fn peer_count(&self) -> usize {
        self.peers.read().expect("peer map lock poisoned").len()
    }

    /// Wrap a connected socket as a peer, register it, and spawn its
    /// receive loop. The peer deregisters itself when the loop exits.
    fn register_peer(&self, stream: TcpStream, outgoing: bool) {
        let peer = match TcpPeer::new(&stream, outgoing) {
            Ok(peer) => Arc::new(peer),
            Err(e) => {
                error!("failed to wrap peer connection: {e}");
                return;
            }
        };
        let addr = peer.addr();
        self.peers
            .write()
            .expect("peer map lock poisoned")
            .insert(addr, peer);
        info!("peer {addr} connected (outgoing: {outgoing})");

        let peers = Arc::clone(&self.peers);
        let event_tx = self.event_tx.clone();
        thread::spawn(move || {
            receive_loop(stream, addr, &event_tx);
            peers
                .write()
                .expect("peer map lock poisoned")
                .remove(&addr);
            info!("peer {addr} disconnected");
        });
    }

    /// Main dispatch task: new peers, RPCs, quit. Each RPC is handed to a
    /// fresh thread so a slow handler never blocks dispatch.
    fn dispatch_loop(self: Arc<Self>, event_rx: Receiver<NetEvent>) {
        for event in event_rx {
            match event {
                NetEvent::Accepted(stream) => self.register_peer(stream, false),
                NetEvent::Rpc(rpc) => {
                    let server = Arc::clone(&self);
                    thread::spawn(move || server.dispatch_rpc(rpc));
                }
                NetEvent::Shutdown => {
                    info!("node {} dispatcher shutting down", self.id);
                    break;
                }
            }
        }
    }

    fn dispatch_rpc(&self, rpc: RPC) {
        let msg = match Message::decode(&rpc.payload) {
            Ok(msg) => msg,
            Err(e) => {
                error!("failed to decode rpc from {}: {e}", rpc.from);
                return;
            }
        };
        let msg_type = match MessageType::try_from(msg.msg_type) {
            Ok(msg_type) => msg_type,
            Err(e) => {
                warn!("{e} (from {})", rpc.from);
                return;
            }
        };

        match msg_type {
            MessageType::Tx => self.handle_tx_message(rpc.from, &msg.body),
            MessageType::Block => self.handle_block_message(rpc.from, &msg.body),
            MessageType::GetBlocks => self.handle_get_blocks_message(rpc.from, &msg.body),
            MessageType::Blocks => self.handle_blocks_message(rpc.from, &msg.body),
            MessageType::GetStatus => self.handle_get_status_message(rpc.from),
            MessageType::Status => self.handle_status_message(rpc.from, &msg.body),
            MessageType::GetPeers | MessageType::Peers => {
                debug!("ignoring reserved message type {msg_type:?} from {}", rpc.from);
            }
        }
    }

    fn handle_tx_message(&self, from: SocketAddr, body: &[u8]) {
        let tx = match Transaction::deserialize(body) {
            Ok(tx) => tx,
            Err(e) => {
                error!("failed to decode transaction from {from}: {e}");
                return;
            }
        };
        debug!("transaction {} received from {from}", tx.cal_hash());
        self.pool.add(vec![tx.clone()]);
        self.broadcast_tx(&tx);
    }

    fn handle_block_message(&self, from: SocketAddr, body: &[u8]) {
        let block = match Block::deserialize(body) {
            Ok(block) => block,
            Err(e) => {
                error!("failed to decode block from {from}: {e}");
                return;
            }
        };
        let hash = block.get_data_hash();
        match self.chain.add_block(block) {
            Ok(stored) => {
                self.pool.remove_pending_txs(stored.get_transactions());
                self.broadcast_block(&stored);
            }
            Err(e) => {
                warn!("rejected block {hash} from {from}: {e}");
            }
        }
    }

    fn handle_get_blocks_message(&self, from: SocketAddr, body: &[u8]) {
        let request: GetBlocksMessage = match deserialize(body) {
            Ok(request) => request,
            Err(e) => {
                error!("failed to decode get-blocks request from {from}: {e}");
                return;
            }
        };
        let blocks = self.chain.get_range_blocks(request.from, request.to);
        debug!(
            "sending {} blocks [{}, {}] to {from}",
            blocks.len(),
            request.from,
            request.to
        );
        let reply = BlocksMessage { blocks };
        match Message::encode(MessageType::Blocks, &reply) {
            Ok(bytes) => self.send_to(from, &bytes),
            Err(e) => error!("failed to encode blocks reply: {e}"),
        }
    }

    fn handle_status_message(&self, from: SocketAddr, body: &[u8]) {
        let status: StatusMessage = match deserialize(body) {
            Ok(status) => status,
            Err(e) => {
                error!("failed to decode status from {from}: {e}");
                return;
            }
        };
        debug!(
            "status from {from}: id={} version={} height={}",
            status.id, status.version, status.current_height
        );

        let local_height = self.chain.height();
        if status.current_height > local_height {
            let request = GetBlocksMessage {
                from: local_height + 1,
                to: status.current_height,
            };
            match Message::encode(MessageType::GetBlocks, &request) {
                Ok(bytes) => self.send_to(from, &bytes),
                Err(e) => error!("failed to encode get-blocks request: {e}"),
            }
        }
    }

    fn handle_get_status_message(&self, from: SocketAddr) {
        let status = StatusMessage {
            id: self.id.clone(),
            version: NODE_VERSION,
            current_height: self.chain.height(),
        };
        match Message::encode(MessageType::Status, &status) {
            Ok(bytes) => self.send_to(from, &bytes),
            Err(e) => error!("failed to encode status reply: {e}"),
        }
    }

    fn handle_blocks_message(&self, from: SocketAddr, body: &[u8]) {
        let bm: BlocksMessage = match deserialize(body) {
            Ok(bm) => bm,
            Err(e) => {
                error!("failed to decode block range from {from}: {e}");
                return;
            }
        };
        self.sync_remote_blocks(bm.blocks);
    }

    /// Attach a received block range, reorganizing the local chain when the
    /// range forks below the tip.
    ///
    /// The scan walks the range from newest to oldest looking for a block
    /// whose predecessor we already hold; everything above that ancestor is
    /// rolled back and the range is re-applied from there. Without a common
    /// ancestor the whole range replays from the bottom. A validator
    /// failure mid-application aborts and leaves the truncated chain for
    /// the next sync round.
    pub fn sync_remote_blocks(&self, blocks: Vec<Block>) {
        let local_height = self.chain.height();
        let (first, last) = match (blocks.first(), blocks.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                debug!("ignoring empty block range");
                return;
            }
        };
        if first.get_height() > local_height + 1 {
            warn!(
                "cannot attach block range starting at height {} to chain at height {local_height}",
                first.get_height()
            );
            return;
        }
        if last.get_height() <= local_height {
            debug!(
                "ignoring stale block range ending at height {}",
                last.get_height()
            );
            return;
        }

        let mut start_height = local_height;
        let mut start_idx = 0usize;
        for (i, block) in blocks.iter().enumerate().rev() {
            if let Some(parent) = self.chain.get_block_by_hash(&block.get_prev_block_hash()) {
                start_height = parent.get_height();
                start_idx = i;
                break;
            }
        }

        let _guard = self.reorg_lock.lock().expect("reorg lock poisoned");
        self.roll_block_range(start_height + 1);
        for block in blocks.into_iter().skip(start_idx) {
            let hash = block.get_data_hash();
            if let Err(e) = self.chain.add_block(block) {
                error!("aborting block sync at {hash}: {e}");
                return;
            }
        }
    }

    /// Inverse-execute and drop every block at height ≥ `from_height`:
    /// transfers are reversed newest-first, indices are cleaned up, and the
    /// rolled-back transactions go back to the pool.
    pub fn roll_block_range(&self, from_height: u32) {
        let height = self.chain.height();
        if from_height == 0 {
            warn!("refusing to roll back the genesis block");
            return;
        }
        if from_height > height {
            debug!("nothing to roll back from height {from_height} (chain at {height})");
            return;
        }

        let to_remove = self.chain.get_range_blocks(from_height, height);
        let mut rolled_back = Vec::new();
        for block in to_remove.iter().rev() {
            for tx in block.get_transactions() {
                // Swapped endpoints undo the transfer. This is expected to
                // succeed for every recorded transaction.
                if let Err(e) = self.chain.account_state().transfer(
                    tx.get_to().address(),
                    tx.get_from().address(),
                    tx.get_value(),
                ) {
                    warn!("failed to roll back transaction {}: {e}", tx.cal_hash());
                    continue;
                }
                self.chain.delete_txs(std::slice::from_ref(tx));
                rolled_back.push(tx.clone());
            }
            self.chain.delete_block_store(&block.get_data_hash());
        }
        self.chain.remove_blocks(from_height);

        info!(
            "rolled back {} blocks from height {from_height}, returning {} transactions to the pool",
            to_remove.len(),
            rolled_back.len()
        );
        self.pool.add(rolled_back);
    }

    fn broadcast_tx(&self, tx: &Transaction) {
        match Message::encode(MessageType::Tx, tx) {
            Ok(bytes) => self.broadcast(&bytes),
            Err(e) => error!("failed to encode transaction for broadcast: {e}"),
        }
    }

    fn broadcast_block(&self, block: &Block) {
        match Message::encode(MessageType::Block, block) {
            Ok(bytes) => self.broadcast(&bytes),
            Err(e) => error!("failed to encode block for broadcast: {e}"),
        }
    }

    /// Fan a frame out to every connected peer. The peer map is snapshotted
    /// first so no lock is held across socket writes.
    fn broadcast(&self, data: &[u8]) {
        for peer in self.peer_snapshot() {
            if let Err(e) = peer.send(data) {
                error!("broadcast to {} failed: {e}", peer.addr());
            }
        }
    }

    fn send_to(&self, addr: SocketAddr, data: &[u8]) {
        let peer = self
            .peers
            .read()
            .expect("peer map lock poisoned")
            .get(&addr)
            .cloned();
        match peer {
            Some(peer) => {
                if let Err(e) = peer.send(data) {
                    error!("send to {addr} failed: {e}");
                }
            }
            None => warn!("no connected peer at {addr}"),
        }
    }

    fn peer_snapshot(&self) -> Vec<Arc<TcpPeer>> {
        self.peers
            .read()
            .expect("peer map lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Every 30 seconds, ask every live peer for its status. Per-peer send
    /// failures are logged and never stop the loop.
    fn status_loop(self: Arc<Self>, quit_rx: Receiver<()>) {
        loop {
            match quit_rx.recv_timeout(STATUS_INTERVAL) {
                Err(mpsc::RecvTimeoutError::Timeout) => self.query_peer_status(),
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                    info!("node {} status ticker shutting down", self.id);
                    break;
                }
            }
        }
    }

    fn query_peer_status(&self) {
        let msg = match Message::encode(MessageType::GetStatus, &GetStatusMessage {}) {
            Ok(msg) => msg,
            Err(e) => {
                error!("failed to encode status query: {e}");
                return;
            }
        };
        for peer in self.peer_snapshot() {
            debug!("querying status of {}", peer.addr());
            if let Err(e) = peer.send(&msg) {
                error!("status query to {} failed: {e}", peer.addr());
            }
        }
    }
}
