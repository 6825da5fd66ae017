//! Peer-facing and operator-facing surfaces of a SimpleCoin node.
//!
//! Peers talk a one-shot JSON protocol over raw TCP ([`protocol`], [`ingest`],
//! [`broadcast`]); the local operator drives the node over HTTP ([`api`]).

pub mod api;
pub mod broadcast;
pub mod config;
pub mod constants;
pub mod ingest;
pub mod protocol;

use simplecoin_core::chain::Chain;
use simplecoin_storage::JsonFileStore;

pub type NodeChain = Chain<JsonFileStore>;
