use crate::{pow::meets_difficulty, pow::NonceHasher, Block};
use rayon::prelude::*;
use tracing::{debug, info};

/// Nonces handed to the thread pool per round.
const NONCE_BATCH: u64 = 1 << 16;

/// Mines `template` by searching nonces in parallel until the block hash has
/// at least `difficulty` leading zero hex digits.
///
/// Nonces are searched in consecutive batches, each split across the rayon
/// pool with `find_first`. The winner is the lowest satisfying nonce, so the
/// result is identical to the sequential [`crate::pow::mine`]. Returns `None`
/// only if the whole u64 nonce space fails, which does not happen in practice.
pub fn mine_parallel(template: Block, difficulty: u32) -> Option<Block> {
    mine_in_batches(template, difficulty, NONCE_BATCH)
}

fn mine_in_batches(template: Block, difficulty: u32, batch: u64) -> Option<Block> {
    debug!(
        index = template.index,
        txs = template.transactions.len(),
        difficulty,
        "starting nonce search"
    );
    let hasher = NonceHasher::new(&template);

    let mut base = 0u64;
    let nonce = loop {
        let last = base.saturating_add(batch.max(1) - 1);
        let found = (base..=last)
            .into_par_iter()
            .find_first(|nonce| meets_difficulty(&hasher.hash_with(*nonce), difficulty));
        if let Some(nonce) = found {
            break nonce;
        }
        if last == u64::MAX {
            return None;
        }
        base = last + 1;
    };

    let mut block = template;
    block.nonce = nonce;
    block.hash = hasher.hash_with(nonce);

    info!(
        "Mined block {} with nonce {} and hash {}",
        block.index,
        nonce,
        block.hash_hex()
    );
    Some(block)
}
