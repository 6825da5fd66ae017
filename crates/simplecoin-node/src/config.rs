//! Node configuration, read once at startup.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use simplecoin_core::chain::ChainParams;
use simplecoin_core::constants::{DEFAULT_DIFFICULTY, DEFAULT_REWARD, MAX_DIFFICULTY};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node_id: String,
    /// Host the peer listener binds to.
    pub host: String,
    /// Peer listener port, also the port assumed for peers listed without one.
    pub port: u16,
    /// Leading zero hex digits a block hash must have.
    pub difficulty: u32,
    pub reward: f64,
    pub blockchain_file: String,
    pub peers_file: String,
    /// Address of the operator HTTP API.
    pub api_listen: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "node-1".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            difficulty: DEFAULT_DIFFICULTY,
            reward: DEFAULT_REWARD,
            blockchain_file: "data/blockchain.json".to_string(),
            peers_file: "configs/peers.txt".to_string(),
            api_listen: "127.0.0.1:8080".to_string(),
        }
    }
}

impl NodeConfig {
    /// Read the JSON config file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let data =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        info!(path = %path.display(), node_id = %config.node_id, "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            bail!("node_id must not be empty");
        }
        if self.difficulty > MAX_DIFFICULTY {
            bail!("difficulty {} exceeds the maximum of {MAX_DIFFICULTY}", self.difficulty);
        }
        if !self.reward.is_finite() || self.reward < 0.0 {
            bail!("reward must be a non-negative number, got {}", self.reward);
        }
        if self.blockchain_file.trim().is_empty() {
            bail!("blockchain_file must be set");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn chain_params(&self) -> ChainParams {
        ChainParams {
            miner: self.node_id.clone(),
            difficulty: self.difficulty,
            reward: self.reward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: NodeConfig =
            serde_json::from_str(r#"{"node_id":"george_linux","difficulty":3,"reward":10}"#).unwrap();
        assert_eq!(config.node_id, "george_linux");
        assert_eq!(config.difficulty, 3);
        assert_eq!(config.reward, 10.0);
        assert_eq!(config.port, NodeConfig::default().port);
        config.validate().unwrap();
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = NodeConfig::default();
        config.difficulty = MAX_DIFFICULTY + 1;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.node_id = "  ".into();
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.reward = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, NodeConfig::default());
    }
}
