use anyhow::{Context, Result};
use parking_lot::Mutex;
use simplecoin_core::{chain::ChainStore, Block};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Keeps the whole chain in one pretty-printed JSON array, rewritten on
/// every save.
pub struct JsonFileStore {
    path: PathBuf,
    // Length of the chain last written. The chain only grows, so a shorter
    // snapshot arriving late is older than what is on disk.
    written: Mutex<usize>,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }
        info!(path = %path.display(), "json chain store opened");
        Ok(Self {
            path,
            written: Mutex::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChainStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<Block>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data =
            fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let blocks: Vec<Block> = serde_json::from_slice(&data)
            .with_context(|| format!("parsing chain file {}", self.path.display()))?;
        *self.written.lock() = blocks.len();
        Ok(Some(blocks))
    }

    fn save(&self, blocks: &[Block]) -> Result<()> {
        let mut written = self.written.lock();
        if blocks.len() < *written {
            debug!(len = blocks.len(), on_disk = *written, "skipping stale chain snapshot");
            return Ok(());
        }

        let data = serde_json::to_vec_pretty(blocks)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;

        *written = blocks.len();
        debug!(len = blocks.len(), path = %self.path.display(), "chain saved");
        Ok(())
    }
}
