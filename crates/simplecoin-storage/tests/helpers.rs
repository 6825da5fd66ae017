use simplecoin_core::{create_block, genesis_block, Block, Transaction};
use simplecoin_storage::JsonFileStore;
use tempfile::{tempdir, TempDir};

pub const DIFFICULTY: u32 = 1;

pub fn create_temp_store() -> (TempDir, JsonFileStore) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("chain.json");
    let store = JsonFileStore::open(&path).expect("Failed to open JsonFileStore");
    (temp_dir, store)
}

/// Genesis followed by `len` mined blocks, each carrying one transfer.
pub fn mined_chain(len: usize) -> Vec<Block> {
    let mut blocks = vec![genesis_block()];
    for i in 0..len {
        let tip = blocks.last().unwrap();
        let tx = Transaction::new("alice", "bob", (i + 1) as f64);
        blocks.push(create_block(vec![tx], tip.hash, "node-a", tip.index + 1, 50.0, DIFFICULTY));
    }
    blocks
}
