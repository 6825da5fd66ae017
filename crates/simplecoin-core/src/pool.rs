use crate::Transaction;

/// Pending transactions in arrival order.
#[derive(Clone, Debug, Default)]
pub struct Pool {
    pending: Vec<Transaction>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `tx` unless an identical transaction is already pending.
    /// Returns whether the pool changed.
    pub fn submit(&mut self, tx: Transaction) -> bool {
        if self.contains(&tx) {
            return false;
        }
        self.pending.push(tx);
        true
    }

    pub fn contains(&self, tx: &Transaction) -> bool {
        self.pending.iter().any(|p| p == tx)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Transaction> {
        self.pending.clone()
    }

    pub fn drain_all(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.pending)
    }

    /// Remove the transactions that made it into a mined block, keeping
    /// anything that arrived after the block's snapshot was taken.
    pub fn drain_mined(&mut self, mined: &[Transaction]) -> Vec<Transaction> {
        if self.pending.as_slice() == mined {
            return self.drain_all();
        }
        let mut drained = Vec::with_capacity(mined.len());
        self.pending.retain(|tx| {
            if mined.contains(tx) {
                drained.push(tx.clone());
                false
            } else {
                true
            }
        });
        drained
    }
}
