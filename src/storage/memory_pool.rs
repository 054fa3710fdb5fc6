use crate::core::Transaction;

/// Pending transactions in admission order.
///
/// Owned by a single ledger; admission rules live in the ledger, this type
/// only stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPool {
    inner: Vec<Transaction>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool { inner: Vec::new() }
    }

    pub fn get(&self, txid: &str) -> Option<&Transaction> {
        self.inner.iter().find(|tx| tx.get_id() == txid)
    }

    pub fn add(&mut self, tx: Transaction) {
        self.inner.push(tx);
    }

    pub fn contains(&self, txid: &str) -> bool {
        self.get(txid).is_some()
    }

    pub fn remove(&mut self, txid: &str) -> Option<Transaction> {
        let idx = self.inner.iter().position(|tx| tx.get_id() == txid)?;
        Some(self.inner.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn get_all(&self) -> &[Transaction] {
        self.inner.as_slice()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.inner.iter()
    }
}
