use crate::{mine::mine_parallel, Amount, Block, ChainError, Ledger, Pool, Transaction};
use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Trait the storage backends implement for the chain to persist itself.
/// This lives in `simplecoin-core` to avoid a circular dependency.
pub trait ChainStore: Send + Sync {
    /// The stored blocks, or `None` when nothing has been stored yet.
    fn load(&self) -> Result<Option<Vec<Block>>>;
    /// Replace the stored chain with `blocks`.
    fn save(&self, blocks: &[Block]) -> Result<()>;
}

/// Per-node settings fixed at startup.
#[derive(Clone, Debug)]
pub struct ChainParams {
    pub miner: String,
    pub difficulty: u32,
    pub reward: Amount,
}

/// Shared handle to the ledger and the pending pool.
///
/// Every mutation goes through one of the methods here. When both locks are
/// needed the pool is always taken before the ledger.
pub struct Chain<S: ChainStore> {
    store: Arc<S>,
    params: ChainParams,
    pool: Arc<Mutex<Pool>>,
    ledger: Arc<Mutex<Ledger>>,
}

impl<S: ChainStore> Clone for Chain<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            params: self.params.clone(),
            pool: Arc::clone(&self.pool),
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<S: ChainStore> Chain<S> {
    /// Load the stored chain and verify it block by block, or start a fresh
    /// chain at genesis when the store is empty.
    pub fn open(store: Arc<S>, params: ChainParams) -> Result<Self, ChainError> {
        let ledger = match store.load()? {
            Some(blocks) => {
                let ledger = Ledger::from_verified(blocks, params.difficulty)?;
                info!(height = ledger.tip().index, "loaded stored chain");
                ledger
            }
            None => {
                let ledger = Ledger::new(params.difficulty);
                store.save(ledger.blocks())?;
                info!("no stored chain, starting from genesis");
                ledger
            }
        };

        Ok(Self {
            store,
            params,
            pool: Arc::new(Mutex::new(Pool::new())),
            ledger: Arc::new(Mutex::new(ledger)),
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Add a transaction to the pending pool. Returns `false` for duplicates.
    pub fn submit(&self, tx: Transaction) -> bool {
        let added = self.pool.lock().submit(tx.clone());
        if added {
            info!(from = %tx.from, to = %tx.to, amount = tx.amount, "transaction pooled");
        } else {
            debug!(from = %tx.from, to = %tx.to, amount = tx.amount, "duplicate transaction dropped");
        }
        added
    }

    /// Append a block received from elsewhere and persist the new chain.
    /// The pending pool is not touched.
    ///
    /// If persisting fails the block stays accepted in memory and the
    /// storage error is returned.
    pub fn accept_block(&self, block: Block) -> Result<(), ChainError> {
        let snapshot = {
            let mut ledger = self.ledger.lock();
            ledger.append(block)?;
            ledger.blocks().to_vec()
        };
        self.store.save(&snapshot)?;
        Ok(())
    }

    /// Snapshot the pool and the tip into an unmined block. No lock is held
    /// once this returns.
    pub fn prepare_candidate(&self) -> Result<Block, ChainError> {
        let pool = self.pool.lock();
        if pool.is_empty() {
            return Err(ChainError::NothingToMine);
        }
        let ledger = self.ledger.lock();
        let tip = ledger.tip();
        Ok(Block::unmined(
            tip.index + 1,
            tip.hash,
            pool.snapshot(),
            self.params.miner.clone(),
            self.params.reward,
        ))
    }

    /// Append a locally mined block and drop its transactions from the pool
    /// in one step. Fails as stale if another block won the tip meanwhile,
    /// in which case the pool is left as it was.
    pub fn commit_mined(&self, block: Block) -> Result<(), ChainError> {
        let snapshot = {
            let mut pool = self.pool.lock();
            let mut ledger = self.ledger.lock();
            let tip = ledger.append(block)?;
            let drained = pool.drain_mined(&tip.transactions);
            debug!(index = tip.index, drained = drained.len(), "pool drained");
            ledger.blocks().to_vec()
        };
        self.store.save(&snapshot)?;
        Ok(())
    }

    /// Build, mine and commit a block from everything pending. Blocks the
    /// calling thread for the whole nonce search, without holding any lock.
    ///
    /// A failed save after the commit comes back as
    /// [`ChainError::Unpersisted`], carrying the block that is now the tip.
    pub fn mine(&self) -> Result<Block, ChainError> {
        let template = self.prepare_candidate()?;
        let block =
            mine_parallel(template, self.params.difficulty).ok_or(ChainError::NonceSpaceExhausted)?;
        match self.commit_mined(block.clone()) {
            Ok(()) => Ok(block),
            Err(ChainError::Storage(source)) => Err(ChainError::Unpersisted {
                block: Box::new(block),
                source,
            }),
            Err(e) => Err(e),
        }
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.ledger.lock().blocks().to_vec()
    }

    pub fn tip(&self) -> Block {
        self.ledger.lock().tip().clone()
    }

    pub fn len(&self) -> usize {
        self.ledger.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.lock().is_empty()
    }

    pub fn pending(&self) -> Vec<Transaction> {
        self.pool.lock().snapshot()
    }

    pub fn balance(&self, id: &str) -> Amount {
        self.ledger.lock().balance(id)
    }
}
