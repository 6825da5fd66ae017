use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod mine;
pub mod pool;

pub use error::{AppendError, ChainError, LoadError};
pub use ledger::{validate_chain, Ledger};
pub use pool::Pool;

pub type Hash = [u8; 32];
pub type Amount = f64;

/// A transfer of `amount` from one identifier to another. Two transactions
/// with the same fields are the same transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    #[serde(deserialize_with = "amount_from_number_or_string")]
    pub amount: Amount,
}

impl Transaction {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: Amount) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

// Peers relaying raw operator input send amounts as strings.
fn amount_from_number_or_string<'de, D>(deserializer: D) -> Result<Amount, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    let amount = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom)?,
    };
    if !amount.is_finite() {
        return Err(serde::de::Error::custom("amount must be a finite number"));
    }
    Ok(normalize_zero(amount))
}

/// Folds `-0.0` into `0.0` so equal amounts share one bit pattern.
fn normalize_zero(amount: Amount) -> Amount {
    if amount == 0.0 {
        0.0
    } else {
        amount
    }
}

fn put_amount(bytes: &mut Vec<u8>, amount: Amount) {
    bytes.extend_from_slice(&normalize_zero(amount).to_bits().to_le_bytes());
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    #[serde(with = "hex::serde")]
    pub prev_hash: Hash,
    pub miner: String,
    pub reward: Amount,
    pub nonce: u64,
    #[serde(with = "hex::serde")]
    pub hash: Hash,
}

impl Block {
    /// Build a block at nonce 0 with its hash filled in. The result is not
    /// mined; see [`pow::mine`] and [`mine::mine_parallel`].
    pub fn unmined(
        index: u64,
        prev_hash: Hash,
        transactions: Vec<Transaction>,
        miner: impl Into<String>,
        reward: Amount,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp: now_secs(),
            transactions,
            prev_hash,
            miner: miner.into(),
            reward,
            nonce: 0,
            hash: [0u8; 32],
        };
        block.hash = block.compute_hash();
        block
    }

    /// Parse an untrusted structural representation. Nothing about the
    /// result is checked; callers must verify hash, work and linkage.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Deterministic encoding of every field except `hash`.
    ///
    /// Layout (little-endian, strings length-prefixed with a u64):
    /// `index | timestamp | tx_count | (from | to | amount)* | prev_hash | miner | reward | nonce`.
    /// The nonce is always the trailing 8 bytes, which the miner relies on.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 * 6 + 32 + self.miner.len() + self.transactions.len() * 48);
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&(self.transactions.len() as u64).to_le_bytes());
        for tx in &self.transactions {
            put_str(&mut bytes, &tx.from);
            put_str(&mut bytes, &tx.to);
            put_amount(&mut bytes, tx.amount);
        }
        bytes.extend_from_slice(&self.prev_hash);
        put_str(&mut bytes, &self.miner);
        put_amount(&mut bytes, self.reward);
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    pub fn compute_hash(&self) -> Hash {
        digest(&self.canonical_bytes())
    }

    /// True when the stored `hash` matches the block's contents.
    pub fn has_consistent_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

fn put_str(bytes: &mut Vec<u8>, s: &str) {
    bytes.extend_from_slice(&(s.len() as u64).to_le_bytes());
    bytes.extend_from_slice(s.as_bytes());
}

pub fn digest(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The well-known block 0. Every node derives the same hash for it.
pub fn genesis_block() -> Block {
    let mut block = Block {
        index: 0,
        timestamp: constants::GENESIS_TIMESTAMP,
        transactions: vec![],
        prev_hash: [0u8; 32],
        miner: constants::GENESIS_MINER.to_string(),
        reward: 0.0,
        nonce: 0,
        hash: [0u8; 32],
    };
    block.hash = block.compute_hash();
    block
}

/// Assemble and mine a block on the calling thread.
pub fn create_block(
    transactions: Vec<Transaction>,
    prev_hash: Hash,
    miner: &str,
    index: u64,
    reward: Amount,
    difficulty: u32,
) -> Block {
    let template = Block::unmined(index, prev_hash, transactions, miner, reward);
    pow::mine(template, difficulty)
}

pub mod pow {
    use super::{Block, Hash};
    use sha2::{Digest, Sha256};

    /// Hashes one block template under many nonces. The canonical encoding
    /// ends with the nonce, so everything before it is absorbed once.
    #[derive(Clone)]
    pub struct NonceHasher {
        prefix: Sha256,
    }

    impl NonceHasher {
        pub fn new(template: &Block) -> Self {
            let bytes = template.canonical_bytes();
            let mut prefix = Sha256::new();
            prefix.update(&bytes[..bytes.len() - 8]);
            Self { prefix }
        }

        pub fn hash_with(&self, nonce: u64) -> Hash {
            let mut hasher = self.prefix.clone();
            hasher.update(nonce.to_le_bytes());
            let digest = hasher.finalize();
            let mut h = [0u8; 32];
            h.copy_from_slice(&digest[..]);
            h
        }
    }

    /// Mine the block by trying nonces 0, 1, 2, ... until the hex rendering
    /// of its hash starts with at least `difficulty` zeros.
    pub fn mine(mut block: Block, difficulty: u32) -> Block {
        let hasher = NonceHasher::new(&block);
        let mut nonce = 0u64;
        loop {
            let h = hasher.hash_with(nonce);
            if meets_difficulty(&h, difficulty) {
                block.nonce = nonce;
                block.hash = h;
                return block;
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
        leading_zero_hex_digits(hash) >= difficulty
    }

    /// Number of leading `'0'` characters in `hex::encode(hash)`.
    pub fn leading_zero_hex_digits(hash: &Hash) -> u32 {
        count_leading_zero_bits(hash) / 4
    }

    pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 8;
            } else {
                total += b.leading_zeros();
                break;
            }
        }
        total
    }
}
