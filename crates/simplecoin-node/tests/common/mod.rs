#![allow(dead_code)]

use simplecoin_core::chain::{Chain, ChainParams};
use simplecoin_core::{create_block, Block, Transaction};
use simplecoin_node::NodeChain;
use simplecoin_storage::JsonFileStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

pub const DIFFICULTY: u32 = 1;

pub fn open_chain(miner: &str) -> (TempDir, NodeChain) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let store = JsonFileStore::open(temp_dir.path().join("chain.json")).expect("open store");
    let params = ChainParams {
        miner: miner.to_string(),
        difficulty: DIFFICULTY,
        reward: 50.0,
    };
    let chain = Chain::open(Arc::new(store), params).expect("open chain");
    (temp_dir, chain)
}

/// A valid next block for `chain`, mined by someone else.
pub fn next_block(chain: &NodeChain, miner: &str, txs: Vec<Transaction>) -> Block {
    let tip = chain.tip();
    create_block(txs, tip.hash, miner, tip.index + 1, 50.0, DIFFICULTY)
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
