pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Difficulty is counted in hex digits, so a digest has at most this many.
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;
pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const DEFAULT_REWARD: f64 = 50.0;
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
pub const GENESIS_MINER: &str = "genesis";
