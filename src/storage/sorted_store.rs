use crate::core::Transaction;
use crate::types::Hash;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Mutex;

/// Heap entry ordered by transaction value ascending (hash breaks ties so
/// the ordering is total). The comparison is inverted so `BinaryHeap`'s
/// maximum is the lowest-value transaction.
struct ByValue {
    key: (u64, Hash),
    tx: Transaction,
}

impl ByValue {
    fn new(tx: Transaction) -> ByValue {
        ByValue {
            key: (tx.get_value(), tx.cal_hash()),
            tx,
        }
    }
}

impl PartialEq for ByValue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ByValue {}

impl PartialOrd for ByValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByValue {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key.cmp(&self.key)
    }
}

/// A bounded priority store: a min-heap ordered by transaction value with a
/// hash-indexed lookup. When full, a new transaction evicts the current
/// minimum only if it is worth strictly more; otherwise it is silently
/// dropped. Duplicates (by hash) are silent no-ops.
///
/// `remove` only updates the hash index; callers repair the heap afterwards
/// with [`SortedTxStore::reset`].
pub struct SortedTxStore {
    inner: Mutex<StoreInner>,
    max_size: usize,
}

struct StoreInner {
    lookup: HashMap<Hash, Transaction>,
    heap: BinaryHeap<ByValue>,
}

impl SortedTxStore {
    pub fn new(max_size: usize) -> SortedTxStore {
        SortedTxStore {
            inner: Mutex::new(StoreInner {
                lookup: HashMap::new(),
                heap: BinaryHeap::new(),
            }),
            max_size,
        }
    }

    pub fn add(&self, tx: Transaction) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(_) => {
                log::error!("failed to acquire lock on sorted store");
                return;
            }
        };

        let hash = tx.cal_hash();
        if inner.lookup.contains_key(&hash) {
            return;
        }

        if inner.heap.len() >= self.max_size {
            let min_value = match inner.heap.peek() {
                Some(min) => min.key.0,
                None => return, // zero capacity
            };
            if tx.get_value() <= min_value {
                return;
            }
            if let Some(evicted) = inner.heap.pop() {
                inner.lookup.remove(&evicted.key.1);
            }
        }

        inner.lookup.insert(hash, tx.clone());
        inner.heap.push(ByValue::new(tx));
    }

    pub fn get(&self, hash: &Hash) -> Option<Transaction> {
        match self.inner.lock() {
            Ok(inner) => inner.lookup.get(hash).cloned(),
            Err(_) => {
                log::error!("failed to acquire lock on sorted store");
                None
            }
        }
    }

    /// Remove from the hash index only. The heap still holds the entry
    /// until the next [`SortedTxStore::reset`].
    pub fn remove(&self, hash: &Hash) {
        match self.inner.lock() {
            Ok(mut inner) => {
                inner.lookup.remove(hash);
            }
            Err(_) => {
                log::error!("failed to acquire lock on sorted store");
            }
        }
    }

    /// Rebuild the heap from `txs`, restoring the heap property after bulk
    /// removals.
    pub fn reset(&self, txs: Vec<Transaction>) {
        match self.inner.lock() {
            Ok(mut inner) => {
                inner.heap = txs.into_iter().map(ByValue::new).collect();
            }
            Err(_) => {
                log::error!("failed to acquire lock on sorted store");
            }
        }
    }

    /// Snapshot of the transactions currently in the hash index.
    pub fn index_snapshot(&self) -> Vec<Transaction> {
        match self.inner.lock() {
            Ok(inner) => inner.lookup.values().cloned().collect(),
            Err(_) => {
                log::error!("failed to acquire lock on sorted store");
                Vec::new()
            }
        }
    }

    /// Snapshot of the backing heap array (heap order, not sorted order).
    pub fn get_all(&self) -> Vec<Transaction> {
        match self.inner.lock() {
            Ok(inner) => inner.heap.iter().map(|entry| entry.tx.clone()).collect(),
            Err(_) => {
                log::error!("failed to acquire lock on sorted store");
                Vec::new()
            }
        }
    }

    pub fn clear(&self) {
        match self.inner.lock() {
            Ok(mut inner) => {
                inner.lookup.clear();
                inner.heap.clear();
            }
            Err(_) => {
                log::error!("failed to acquire lock on sorted store");
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(inner) => inner.heap.len(),
            Err(_) => {
                log::error!("failed to acquire lock on sorted store");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
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
    fn test_eviction_keeps_highest_values() {
        let signer = PrivateKey::generate().unwrap();
        let store = SortedTxStore::new(5);

        let values = [400u64, 100, 600, 300, 200, 500];
        let txs: Vec<Transaction> = values
            .iter()
            .enumerate()
            .map(|(i, v)| tx_with_value(&signer, *v, i as i64))
            .collect();
        for tx in &txs {
            store.add(tx.clone());
        }

        assert_eq!(store.len(), 5);
        let mut kept: Vec<u64> = store.get_all().iter().map(|t| t.get_value()).collect();
        kept.sort_unstable();
        assert_eq!(kept, vec![200, 300, 400, 500, 600]);
        assert!(store.get(&txs[1].cal_hash()).is_none()); // value 100 evicted
    }

    #[test]
    fn test_add_at_capacity_drops_low_value() {
        let signer = PrivateKey::generate().unwrap();
        let store = SortedTxStore::new(2);
        store.add(tx_with_value(&signer, 200, 0));
        store.add(tx_with_value(&signer, 300, 1));

        // Equal to the current minimum: dropped, not swapped.
        let equal = tx_with_value(&signer, 200, 2);
        store.add(equal.clone());
        assert!(store.get(&equal.cal_hash()).is_none());
        assert_eq!(store.len(), 2);

        // Below the current minimum: dropped.
        let low = tx_with_value(&signer, 100, 3);
        store.add(low.clone());
        assert!(store.get(&low.cal_hash()).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let signer = PrivateKey::generate().unwrap();
        let store = SortedTxStore::new(10);
        let tx = tx_with_value(&signer, 100, 0);

        store.add(tx.clone());
        store.add(tx.clone());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_then_reset_restores_consistency() {
        let signer = PrivateKey::generate().unwrap();
        let store = SortedTxStore::new(10);
        let keep = tx_with_value(&signer, 100, 0);
        let drop = tx_with_value(&signer, 200, 1);
        store.add(keep.clone());
        store.add(drop.clone());

        store.remove(&drop.cal_hash());
        // The heap is stale until reset.
        assert_eq!(store.get_all().len(), 2);
        assert!(store.get(&drop.cal_hash()).is_none());

        store.reset(store.index_snapshot());
        let remaining = store.get_all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].cal_hash(), keep.cal_hash());
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let signer = PrivateKey::generate().unwrap();
        let store = SortedTxStore::new(3);
        for i in 0..20 {
            store.add(tx_with_value(&signer, i as u64 + 1, i));
            assert!(store.len() <= 3);
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_clear() {
        let signer = PrivateKey::generate().unwrap();
        let store = SortedTxStore::new(10);
        store.add(tx_with_value(&signer, 100, 0));
        store.clear();
        assert!(store.is_empty());
        assert!(store.get_all().is_empty());
    }
}
