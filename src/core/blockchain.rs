use crate::core::{AccountState, Block, BlockHeader, BlockValidator, Transaction, Validate};
use crate::error::{BlockchainError, Result};
use crate::types::Hash;
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

/// The append-only chain: a dense height-indexed block vector with hash and
/// transaction indices, the account ledger, and the append validator.
///
/// Two locks split the hot paths: the ledger carries its own lock so
/// transaction execution does not block readers of the block indices, and
/// `inner` guards the block/index structures. The append mutex serializes
/// `add_block` against every other append.
pub struct Blockchain {
    inner: RwLock<ChainInner>,
    account_state: AccountState,
    append_lock: Mutex<()>,
    validator: Box<dyn Validate>,
}

struct ChainInner {
    blocks: Vec<Block>,
    headers: Vec<BlockHeader>,
    block_store: HashMap<Hash, Block>,
    tx_store: HashMap<Hash, Transaction>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// An empty chain with the default validator. Callers seed the genesis
    /// block through [`Blockchain::add_block_without_validation`].
    pub fn new() -> Blockchain {
        Blockchain {
            inner: RwLock::new(ChainInner {
                blocks: Vec::new(),
                headers: Vec::new(),
                block_store: HashMap::new(),
                tx_store: HashMap::new(),
            }),
            account_state: AccountState::new(),
            append_lock: Mutex::new(()),
            validator: Box::new(BlockValidator),
        }
    }

    /// Validate and append. Returns the stored block, which carries only
    /// the transactions that actually executed.
    pub fn add_block(&self, block: Block) -> Result<Block> {
        let _guard = self.append_lock.lock().expect("append lock poisoned");
        self.validator.validate(self, &block)?;
        Ok(self.append(block))
    }

    /// Append without validation: the genesis seed and the bulk-sync fast
    /// path.
    pub fn add_block_without_validation(&self, block: Block) -> Block {
        let _guard = self.append_lock.lock().expect("append lock poisoned");
        self.append(block)
    }

    fn append(&self, mut block: Block) -> Block {
        // Execute first: transactions that fail against the ledger are
        // dropped, and the stored block witnesses what actually applied.
        let mut applied = Vec::new();
        for tx in block.take_transactions() {
            match self.execute_transaction(&tx) {
                Ok(()) => applied.push(tx),
                Err(e) => {
                    warn!(
                        "dropping transaction {} from block {}: {e}",
                        tx.cal_hash(),
                        block.get_data_hash()
                    );
                }
            }
        }
        block.set_transactions(applied);

        let mut inner = self.inner.write().expect("chain lock poisoned");
        inner.headers.push(block.get_header().clone());
        inner
            .block_store
            .insert(block.get_data_hash(), block.clone());
        for tx in block.get_transactions() {
            inner.tx_store.insert(tx.cal_hash(), tx.clone());
        }
        inner.blocks.push(block.clone());
        drop(inner);

        info!(
            "new block {} at height {} with {} transactions",
            block.get_data_hash(),
            block.get_height(),
            block.get_transactions().len()
        );
        block
    }

    /// Verify `tx`, apply it to the ledger, and record it in the
    /// transaction index.
    pub fn execute_transaction(&self, tx: &Transaction) -> Result<()> {
        if !tx.verify() {
            return Err(BlockchainError::InvalidTransaction(format!(
                "signature verification failed for {}",
                tx.cal_hash()
            )));
        }

        self.account_state.transfer(
            tx.get_from().address(),
            tx.get_to().address(),
            tx.get_value(),
        )?;

        let mut inner = self.inner.write().expect("chain lock poisoned");
        inner.tx_store.insert(tx.cal_hash(), tx.clone());
        Ok(())
    }

    /// Block at `height`. Genesis (height 0) is reachable only through
    /// [`Blockchain::get_latest_block`].
    pub fn get_block(&self, height: u32) -> Result<Block> {
        let inner = self.inner.read().expect("chain lock poisoned");
        if height < 1 || (height as usize) >= inner.blocks.len() {
            warn!("block height {height} out of range");
            return Err(BlockchainError::BlockNotFound(height));
        }
        Ok(inner.blocks[height as usize].clone())
    }

    pub fn get_block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.inner
            .read()
            .expect("chain lock poisoned")
            .block_store
            .get(hash)
            .cloned()
    }

    pub fn has_block(&self, hash: &Hash) -> bool {
        self.inner
            .read()
            .expect("chain lock poisoned")
            .block_store
            .contains_key(hash)
    }

    pub fn get_transaction(&self, hash: &Hash) -> Option<Transaction> {
        self.inner
            .read()
            .expect("chain lock poisoned")
            .tx_store
            .get(hash)
            .cloned()
    }

    pub fn has_transaction(&self, hash: &Hash) -> bool {
        self.inner
            .read()
            .expect("chain lock poisoned")
            .tx_store
            .contains_key(hash)
    }

    pub fn get_latest_block(&self) -> Option<Block> {
        self.inner
            .read()
            .expect("chain lock poisoned")
            .blocks
            .last()
            .cloned()
    }

    /// Current height: the block count minus one, genesis sitting at
    /// height 0.
    pub fn height(&self) -> u32 {
        let inner = self.inner.read().expect("chain lock poisoned");
        inner.blocks.len().saturating_sub(1) as u32
    }

    /// Blocks at heights `[from, to]` inclusive; empty on any invalid
    /// bound.
    pub fn get_range_blocks(&self, from: u32, to: u32) -> Vec<Block> {
        let inner = self.inner.read().expect("chain lock poisoned");
        let height = inner.blocks.len().saturating_sub(1) as u32;

        if from > to {
            warn!("invalid block range: from {from} > to {to}");
            return Vec::new();
        }
        if from < 1 || from > height {
            warn!("invalid block range start: {from}, current height: {height}");
            return Vec::new();
        }
        if to > height {
            warn!("invalid block range end: {to}, current height: {height}");
            return Vec::new();
        }

        inner.blocks[from as usize..=to as usize].to_vec()
    }

    /// Truncate the block vector to `to_height` elements, dropping every
    /// block at height ≥ `to_height`. Hash and transaction indices are
    /// maintained separately by the reorg driver.
    pub fn remove_blocks(&self, to_height: u32) {
        let mut inner = self.inner.write().expect("chain lock poisoned");
        inner.blocks.truncate(to_height as usize);
        inner.headers.truncate(to_height as usize);
    }

    /// Drop the given transactions from the transaction index.
    pub fn delete_txs(&self, txs: &[Transaction]) {
        let mut inner = self.inner.write().expect("chain lock poisoned");
        for tx in txs {
            inner.tx_store.remove(&tx.cal_hash());
        }
    }

    /// Drop a block from the hash index.
    pub fn delete_block_store(&self, hash: &Hash) {
        let mut inner = self.inner.write().expect("chain lock poisoned");
        if inner.block_store.remove(hash).is_none() {
            error!("attempted to delete unknown block {hash} from the hash index");
        }
    }

    pub fn account_state(&self) -> &AccountState {
        &self.account_state
    }
}
