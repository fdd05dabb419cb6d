use crate::core::Transaction;
use crate::storage::SortedTxStore;
use crate::types::Hash;
use std::sync::Mutex;

/// The transaction pool: two bounded priority stores over the same element
/// type. `all` holds everything the node has accepted and not explicitly
/// purged; `pending` holds what has not yet been packed into a block.
/// During normal operation `pending ⊆ all`.
pub struct TxPool {
    /// Serializes compound operations that touch both partitions.
    mu: Mutex<()>,
    all: SortedTxStore,
    pending: SortedTxStore,
}

impl TxPool {
    pub fn new(all_size: usize, pending_size: usize) -> TxPool {
        TxPool {
            mu: Mutex::new(()),
            all: SortedTxStore::new(all_size),
            pending: SortedTxStore::new(pending_size),
        }
    }

    /// Insert into both partitions. Duplicates and over-capacity low-value
    /// transactions are dropped silently by the stores.
    pub fn add(&self, txs: Vec<Transaction>) {
        let _guard = self.mu.lock().expect("pool lock poisoned");
        for tx in txs {
            self.all.add(tx.clone());
            self.pending.add(tx);
        }
    }

    pub fn get(&self, hash: &Hash) -> Option<Transaction> {
        self.all.get(hash)
    }

    pub fn get_pending_txs(&self) -> Vec<Transaction> {
        self.pending.get_all()
    }

    pub fn get_all_txs(&self) -> Vec<Transaction> {
        self.all.get_all()
    }

    /// The current pending snapshot, clearing `pending` in the same step.
    /// Empty result when there is nothing to pack.
    pub fn get_pending_txs_for_packing(&self) -> Vec<Transaction> {
        let _guard = self.mu.lock().expect("pool lock poisoned");
        if self.pending.is_empty() {
            return Vec::new();
        }
        let packed = self.pending.get_all();
        self.pending.clear();
        packed
    }

    /// Remove each transaction from the pending index, then rebuild the
    /// pending heap from the survivors so the heap property holds again.
    pub fn remove_pending_txs(&self, txs: &[Transaction]) {
        let _guard = self.mu.lock().expect("pool lock poisoned");
        for tx in txs {
            self.pending.remove(&tx.cal_hash());
        }
        self.pending.reset(self.pending.index_snapshot());
    }

    pub fn clear_pending(&self) {
        self.pending.clear();
    }

    pub fn clear_all(&self) {
        let _guard = self.mu.lock().expect("pool lock poisoned");
        self.all.clear();
    }

    pub fn all_len(&self) -> usize {
        self.all.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn max_all_size(&self) -> usize {
        self.all.max_size()
    }

    pub fn max_pending_size(&self) -> usize {
        self.pending.max_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;

    fn tx_with_value(signer: &PrivateKey, value: u64, nonce: i64) -> Transaction {
        let to = PrivateKey::generate().unwrap();
        Transaction::new(signer, to.public_key().clone(), Vec::new(), value, nonce).unwrap()
    }

    #[test]
    fn test_new_pool_sizes() {
        let pool = TxPool::new(100, 50);
        assert_eq!(pool.max_all_size(), 100);
        assert_eq!(pool.max_pending_size(), 50);
        assert_eq!(pool.all_len(), 0);
        assert_eq!(pool.pending_len(), 0);
    }

    #[test]
    fn test_add_lands_in_both_partitions() {
        let signer = PrivateKey::generate().unwrap();
        let pool = TxPool::new(100, 50);
        let tx = tx_with_value(&signer, 100, 0);

        pool.add(vec![tx.clone()]);
        assert_eq!(pool.all_len(), 1);
        assert_eq!(pool.pending_len(), 1);
        assert!(pool.get(&tx.cal_hash()).is_some());
    }

    #[test]
    fn test_packing_clears_pending_only() {
        let signer = PrivateKey::generate().unwrap();
        let pool = TxPool::new(100, 50);
        pool.add(vec![
            tx_with_value(&signer, 100, 0),
            tx_with_value(&signer, 200, 1),
        ]);

        let packed = pool.get_pending_txs_for_packing();
        assert_eq!(packed.len(), 2);
        assert_eq!(pool.pending_len(), 0);
        assert_eq!(pool.all_len(), 2);

        // Nothing pending: packing again yields nothing.
        assert!(pool.get_pending_txs_for_packing().is_empty());
    }

    #[test]
    fn test_remove_pending_txs_rebuilds_heap() {
        let signer = PrivateKey::generate().unwrap();
        let pool = TxPool::new(100, 50);
        let tx1 = tx_with_value(&signer, 100, 0);
        let tx2 = tx_with_value(&signer, 200, 1);
        let tx3 = tx_with_value(&signer, 300, 2);
        pool.add(vec![tx1.clone(), tx2.clone(), tx3.clone()]);

        pool.remove_pending_txs(&[tx1.clone(), tx2.clone()]);

        let pending = pool.get_pending_txs();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].cal_hash(), tx3.cal_hash());
        // `all` keeps everything.
        assert_eq!(pool.all_len(), 3);
        assert!(pool.get(&tx1.cal_hash()).is_some());
    }

    #[test]
    fn test_eviction_order() {
        let signer = PrivateKey::generate().unwrap();
        let pool = TxPool::new(5, 5);

        let values = [400u64, 100, 600, 300, 200, 500];
        let txs: Vec<Transaction> = values
            .iter()
            .enumerate()
            .map(|(i, v)| tx_with_value(&signer, *v, i as i64))
            .collect();
        for tx in &txs {
            pool.add(vec![tx.clone()]);
        }

        assert_eq!(pool.all_len(), 5);
        // The value-100 transaction was the eviction victim.
        assert!(pool.get(&txs[1].cal_hash()).is_none());
        for tx in txs.iter().filter(|t| t.get_value() != 100) {
            assert!(pool.get(&tx.cal_hash()).is_some());
        }
    }

    #[test]
    fn test_capacities_are_independent() {
        let signer = PrivateKey::generate().unwrap();
        let pool = TxPool::new(10, 2);

        for i in 0..5 {
            pool.add(vec![tx_with_value(&signer, (i + 1) * 100, i as i64)]);
        }
        assert_eq!(pool.all_len(), 5);
        assert_eq!(pool.pending_len(), 2);
        let mut pending: Vec<u64> = pool
            .get_pending_txs()
            .iter()
            .map(|t| t.get_value())
            .collect();
        pending.sort_unstable();
        assert_eq!(pending, vec![400, 500]);
    }

    #[test]
    fn test_clear_all_and_pending() {
        let signer = PrivateKey::generate().unwrap();
        let pool = TxPool::new(100, 50);
        pool.add(vec![tx_with_value(&signer, 100, 0)]);

        pool.clear_pending();
        assert_eq!(pool.pending_len(), 0);
        assert_eq!(pool.all_len(), 1);

        pool.clear_all();
        assert_eq!(pool.all_len(), 0);
    }
}
