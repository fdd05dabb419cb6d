use crate::core::Transaction;
use crate::error::Result;
use crate::types::Hash;
use crate::utils::{current_timestamp, deserialize, serialize};
use log::warn;
use serde::{Deserialize, Serialize};

/// The only block version this node produces or accepts
pub const BLOCK_VERSION: u32 = 1;

/// Timestamp stamped on the genesis block, shared by every node so
/// independently booted peers agree on the common ancestor.
const GENESIS_TIMESTAMP: i64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct BlockHeader {
    version: u32,
    prev_block_hash: Hash,
    /// Digest over the concatenated encodings of the block's transactions.
    /// Doubles as the block identifier.
    data_hash: Hash,
    height: u32,
    /// Unix seconds
    timestamp: i64,
    /// Carried but never contested (no proof of work)
    nonce: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    header: BlockHeader,
    transactions: Vec<Transaction>,
}

impl Block {
    /// Build a block on top of `prev_block_hash` at `height`, stamped with
    /// the current time.
    pub fn new(prev_block_hash: Hash, height: u32, transactions: Vec<Transaction>) -> Result<Block> {
        let data_hash = Self::calculate_data_hash(&transactions)?;
        Ok(Block {
            header: BlockHeader {
                version: BLOCK_VERSION,
                prev_block_hash,
                data_hash,
                height,
                timestamp: current_timestamp()?,
                nonce: 0,
            },
            transactions,
        })
    }

    /// The deterministic genesis block: zero predecessor hash, height 0,
    /// no transactions, fixed timestamp.
    pub fn genesis() -> Block {
        let data_hash = Hash::digest(&[]);
        Block {
            header: BlockHeader {
                version: BLOCK_VERSION,
                prev_block_hash: Hash::default(),
                data_hash,
                height: 0,
                timestamp: GENESIS_TIMESTAMP,
                nonce: 0,
            },
            transactions: Vec::new(),
        }
    }

    /// Digest over the concatenation of each transaction's binary encoding,
    /// in listed order.
    pub fn calculate_data_hash(transactions: &[Transaction]) -> Result<Hash> {
        let mut buf = Vec::new();
        for tx in transactions {
            buf.extend_from_slice(&tx.serialize()?);
        }
        Ok(Hash::digest(&buf))
    }

    /// Header checks, per-transaction signatures, and the data-hash
    /// recomputation.
    pub fn verify(&self) -> bool {
        self.verify_header() && self.verify_transactions() && self.verify_data_hash()
    }

    fn verify_header(&self) -> bool {
        if self.header.version != BLOCK_VERSION {
            return false;
        }
        let now = match current_timestamp() {
            Ok(now) => now,
            Err(e) => {
                warn!("failed to read current time during block verification: {e}");
                return false;
            }
        };
        self.header.timestamp <= now
    }

    fn verify_transactions(&self) -> bool {
        self.transactions.iter().all(Transaction::verify)
    }

    fn verify_data_hash(&self) -> bool {
        match Self::calculate_data_hash(&self.transactions) {
            Ok(hash) => hash == self.header.data_hash,
            Err(e) => {
                warn!("failed to recompute data hash during block verification: {e}");
                false
            }
        }
    }

    /// True iff `next` links back to this block.
    pub fn is_predecessor_of(&self, next: &Block) -> bool {
        next.get_prev_block_hash() == self.get_data_hash()
    }

    pub fn get_data_hash(&self) -> Hash {
        self.header.data_hash
    }

    pub fn get_prev_block_hash(&self) -> Hash {
        self.header.prev_block_hash
    }

    pub fn get_height(&self) -> u32 {
        self.header.height
    }

    pub fn get_timestamp(&self) -> i64 {
        self.header.timestamp
    }

    pub fn get_version(&self) -> u32 {
        self.header.version
    }

    pub fn get_nonce(&self) -> u32 {
        self.header.nonce
    }

    pub fn get_header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Hand the transaction list to the chain's append path, which keeps
    /// only the transactions that actually executed.
    pub(crate) fn take_transactions(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.transactions)
    }

    pub(crate) fn set_transactions(&mut self, transactions: Vec<Transaction>) {
        self.transactions = transactions;
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize(bytes)
    }

    /// Build a block with an explicit timestamp, for edge-case tests.
    #[cfg(test)]
    pub fn new_test_block(
        prev_block_hash: Hash,
        height: u32,
        timestamp: i64,
        transactions: Vec<Transaction>,
    ) -> Result<Block> {
        let data_hash = Self::calculate_data_hash(&transactions)?;
        Ok(Block {
            header: BlockHeader {
                version: BLOCK_VERSION,
                prev_block_hash,
                data_hash,
                height,
                timestamp,
                nonce: 0,
            },
            transactions,
        })
    }
}

impl BlockHeader {
    pub fn get_height(&self) -> u32 {
        self.height
    }

    pub fn get_data_hash(&self) -> Hash {
        self.data_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;

    fn sample_txs(count: usize) -> Vec<Transaction> {
        let signer = PrivateKey::generate().unwrap();
        let to = PrivateKey::generate().unwrap();
        (0..count)
            .map(|i| {
                Transaction::new(
                    &signer,
                    to.public_key().clone(),
                    format!("tx{i}").into_bytes(),
                    100 * (i as u64 + 1),
                    i as i64,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_new_block_verifies() {
        let block = Block::new(Hash::random(), 1, sample_txs(2)).unwrap();
        assert!(block.verify());
        assert_eq!(block.get_height(), 1);
        assert_eq!(block.get_version(), BLOCK_VERSION);
        assert!(block.get_timestamp() > 0);
    }

    #[test]
    fn test_genesis_is_deterministic() {
        let a = Block::genesis();
        let b = Block::genesis();
        assert_eq!(a.get_data_hash(), b.get_data_hash());
        assert_eq!(a.get_height(), 0);
        assert!(a.get_prev_block_hash().is_zero());
        assert!(a.get_transactions().is_empty());
        assert!(a.verify());
    }

    #[test]
    fn test_data_hash_tracks_transactions() {
        let txs = sample_txs(2);
        let block = Block::new(Hash::random(), 1, txs.clone()).unwrap();
        assert_eq!(
            block.get_data_hash(),
            Block::calculate_data_hash(&txs).unwrap()
        );

        // Dropping a transaction must change the recomputed digest.
        let shorter = Block::calculate_data_hash(&txs[..1]).unwrap();
        assert_ne!(block.get_data_hash(), shorter);
    }

    #[test]
    fn test_future_timestamp_fails_verify() {
        let future = current_timestamp().unwrap() + 3600;
        let block = Block::new_test_block(Hash::random(), 1, future, sample_txs(1)).unwrap();
        assert!(!block.verify());
    }

    #[test]
    fn test_tampered_transaction_list_fails_verify() {
        let mut block = Block::new(Hash::random(), 1, sample_txs(2)).unwrap();
        assert!(block.verify());

        // Slipping an extra (individually valid) transaction into the list
        // breaks the recorded data hash.
        let signer = PrivateKey::generate().unwrap();
        let extra = Transaction::new(
            &signer,
            signer.public_key().clone(),
            b"forged".to_vec(),
            1,
            0,
        )
        .unwrap();
        block.transactions.push(extra);
        assert!(!block.verify());

        // Dropping a transaction breaks it too.
        block.transactions.truncate(1);
        assert!(!block.verify());
    }

    #[test]
    fn test_wrong_version_fails_verify() {
        let mut block = Block::new(Hash::random(), 1, sample_txs(1)).unwrap();
        block.header.version = 2;
        assert!(!block.verify());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let block = Block::new(Hash::random(), 3, sample_txs(2)).unwrap();
        let bytes = block.serialize().unwrap();
        let decoded = Block::deserialize(&bytes).unwrap();

        assert_eq!(block.get_data_hash(), decoded.get_data_hash());
        assert_eq!(block.get_prev_block_hash(), decoded.get_prev_block_hash());
        assert_eq!(block.get_height(), decoded.get_height());
        assert_eq!(block.get_timestamp(), decoded.get_timestamp());
        assert_eq!(
            block.get_transactions().len(),
            decoded.get_transactions().len()
        );
        assert!(decoded.verify());
    }

    #[test]
    fn test_predecessor_link() {
        let parent = Block::new(Hash::random(), 1, sample_txs(1)).unwrap();
        let child = Block::new(parent.get_data_hash(), 2, sample_txs(1)).unwrap();
        assert!(parent.is_predecessor_of(&child));
        assert!(!child.is_predecessor_of(&parent));
    }
}
