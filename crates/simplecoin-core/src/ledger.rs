use crate::{genesis_block, pow, AppendError, Amount, Block, LoadError};

/// The accepted blocks, genesis first. Never empty and append-only.
#[derive(Clone, Debug)]
pub struct Ledger {
    blocks: Vec<Block>,
    difficulty: u32,
}

impl Ledger {
    pub fn new(difficulty: u32) -> Self {
        Self {
            blocks: vec![genesis_block()],
            difficulty,
        }
    }

    /// Rebuild a ledger from stored blocks, re-checking every block the same
    /// way [`Ledger::append`] would. Block 0 must be the well-known genesis.
    pub fn from_verified(blocks: Vec<Block>, difficulty: u32) -> Result<Self, LoadError> {
        let mut iter = blocks.into_iter();
        let first = iter.next().ok_or(LoadError::Empty)?;
        if first != genesis_block() {
            return Err(LoadError::GenesisMismatch);
        }

        let mut ledger = Self::new(difficulty);
        for (offset, block) in iter.enumerate() {
            ledger.append(block).map_err(|source| LoadError::InvalidBlock {
                position: offset + 1,
                source,
            })?;
        }
        Ok(ledger)
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn tip(&self) -> &Block {
        // genesis is present from construction on
        &self.blocks[self.blocks.len() - 1]
    }

    /// Run every append check without mutating anything.
    pub fn check(&self, block: &Block) -> Result<(), AppendError> {
        let tip = self.tip();
        if block.prev_hash != tip.hash {
            return Err(AppendError::StaleTip {
                expected: tip.hash_hex(),
                got: hex::encode(block.prev_hash),
            });
        }

        let expected_index = self.blocks.len() as u64;
        if block.index != expected_index {
            return Err(AppendError::IndexMismatch {
                expected: expected_index,
                got: block.index,
            });
        }

        let computed = block.compute_hash();
        if computed != block.hash {
            return Err(AppendError::HashMismatch {
                claimed: block.hash_hex(),
                computed: hex::encode(computed),
            });
        }

        let found = pow::leading_zero_hex_digits(&block.hash);
        if found < self.difficulty {
            return Err(AppendError::InsufficientWork {
                required: self.difficulty,
                found,
            });
        }
        Ok(())
    }

    /// Extend the chain by one block. On error the ledger is unchanged.
    pub fn append(&mut self, block: Block) -> Result<&Block, AppendError> {
        self.check(&block)?;
        self.blocks.push(block);
        Ok(self.tip())
    }

    pub fn balance(&self, id: &str) -> Amount {
        balance_of(&self.blocks, id)
    }
}

/// Checks hash linkage between neighbours only. Hashes and work of the
/// blocks themselves are taken at face value.
pub fn validate_chain(chain: &[Block]) -> bool {
    chain.windows(2).all(|pair| pair[1].prev_hash == pair[0].hash)
}

pub fn balance_of(chain: &[Block], id: &str) -> Amount {
    let mut balance = 0.0;
    for tx in chain.iter().flat_map(|b| &b.transactions) {
        if tx.to == id {
            balance += tx.amount;
        }
        if tx.from == id {
            balance -= tx.amount;
        }
    }
    balance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_block, Transaction};

    const DIFFICULTY: u32 = 1;

    fn next_block(ledger: &Ledger, txs: Vec<Transaction>) -> Block {
        let tip = ledger.tip();
        create_block(txs, tip.hash, "node-a", tip.index + 1, 50.0, DIFFICULTY)
    }

    fn ledger_with(blocks: usize) -> Ledger {
        let mut ledger = Ledger::new(DIFFICULTY);
        for i in 0..blocks {
            let block = next_block(&ledger, vec![Transaction::new("a", "b", i as f64)]);
            ledger.append(block).unwrap();
        }
        ledger
    }

    #[test]
    fn new_ledger_holds_only_genesis() {
        let ledger = Ledger::new(DIFFICULTY);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.tip(), &genesis_block());
    }

    #[test]
    fn append_valid_block() {
        let mut ledger = Ledger::new(DIFFICULTY);
        let block = next_block(&ledger, vec![]);
        let tip = ledger.append(block.clone()).unwrap().clone();
        assert_eq!(tip, block);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn append_rejects_skipped_index() {
        let mut ledger = ledger_with(1);
        let tip = ledger.tip().clone();
        let block = create_block(vec![], tip.hash, "node-a", tip.index + 2, 50.0, DIFFICULTY);
        let err = ledger.append(block).unwrap_err();
        assert_eq!(err, AppendError::IndexMismatch { expected: 2, got: 3 });
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn append_rejects_wrong_prev_hash() {
        let mut ledger = ledger_with(1);
        let genesis = genesis_block();
        // right index, but builds on genesis instead of the tip
        let block = create_block(vec![], genesis.hash, "node-a", 2, 50.0, DIFFICULTY);
        let err = ledger.append(block).unwrap_err();
        assert!(matches!(err, AppendError::StaleTip { .. }), "{err}");
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn append_rejects_inconsistent_hash() {
        let mut ledger = Ledger::new(DIFFICULTY);
        let mut block = next_block(&ledger, vec![Transaction::new("a", "b", 1.0)]);
        block.transactions[0].amount = 1000.0;
        let err = ledger.append(block).unwrap_err();
        assert!(matches!(err, AppendError::HashMismatch { .. }), "{err}");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn append_rejects_insufficient_work() {
        let mut ledger = Ledger::new(3);
        let tip = ledger.tip().clone();
        // find a nonce whose hash is consistent but has fewer than 3 leading zeros
        let mut block = Block::unmined(1, tip.hash, vec![], "lazy", 50.0);
        while pow::leading_zero_hex_digits(&block.hash) >= 3 {
            block.nonce += 1;
            block.hash = block.compute_hash();
        }
        let err = ledger.append(block).unwrap_err();
        assert!(matches!(err, AppendError::InsufficientWork { required: 3, .. }), "{err}");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn validate_accepts_valid_chain() {
        let ledger = ledger_with(4);
        assert!(validate_chain(ledger.blocks()));
        assert!(validate_chain(&[]));
        assert!(validate_chain(&[genesis_block()]));
    }

    #[test]
    fn validate_detects_broken_link() {
        let ledger = ledger_with(4);
        for i in 1..ledger.len() {
            let mut blocks = ledger.blocks().to_vec();
            blocks[i].prev_hash[0] ^= 0xff;
            assert!(!validate_chain(&blocks), "altered link at {i} went unnoticed");
        }
    }

    #[test]
    fn balance_example() {
        let mut ledger = Ledger::new(DIFFICULTY);
        let b1 = next_block(&ledger, vec![Transaction::new("A", "B", 10.0)]);
        ledger.append(b1).unwrap();
        let b2 = next_block(&ledger, vec![Transaction::new("B", "C", 4.0)]);
        ledger.append(b2).unwrap();

        assert_eq!(ledger.balance("A"), -10.0);
        assert_eq!(ledger.balance("B"), 6.0);
        assert_eq!(ledger.balance("C"), 4.0);
        assert_eq!(ledger.balance("nobody"), 0.0);
    }

    #[test]
    fn self_transfer_nets_zero() {
        let mut ledger = Ledger::new(DIFFICULTY);
        let b1 = next_block(&ledger, vec![Transaction::new("A", "A", 7.0)]);
        ledger.append(b1).unwrap();
        assert_eq!(ledger.balance("A"), 0.0);
    }

    #[test]
    fn from_verified_round_trip() {
        let ledger = ledger_with(3);
        let loaded = Ledger::from_verified(ledger.blocks().to_vec(), DIFFICULTY).unwrap();
        assert_eq!(loaded.blocks(), ledger.blocks());
    }

    #[test]
    fn from_verified_rejects_empty_and_foreign_genesis() {
        assert_eq!(Ledger::from_verified(vec![], DIFFICULTY).unwrap_err(), LoadError::Empty);

        let mut blocks = ledger_with(1).blocks().to_vec();
        blocks[0].miner = "impostor".into();
        blocks[0].hash = blocks[0].compute_hash();
        assert_eq!(
            Ledger::from_verified(blocks, DIFFICULTY).unwrap_err(),
            LoadError::GenesisMismatch
        );
    }

    #[test]
    fn from_verified_rejects_tampered_history() {
        let mut blocks = ledger_with(3).blocks().to_vec();
        blocks[2].transactions[0].amount = 999.0;
        let err = Ledger::from_verified(blocks, DIFFICULTY).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidBlock {
                position: 2,
                source: AppendError::HashMismatch { .. }
            }
        ));
    }

    #[test]
    fn from_verified_enforces_work() {
        let blocks = ledger_with(2).blocks().to_vec();
        // mined at difficulty 1, so a node demanding 60 digits refuses it
        let err = Ledger::from_verified(blocks, 60).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidBlock {
                position: 1,
                source: AppendError::InsufficientWork { .. }
            }
        ));
    }
}
