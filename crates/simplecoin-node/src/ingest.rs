use crate::constants::{MAX_MESSAGE_BYTES, READ_TIMEOUT};
use crate::protocol::{read_message, Message};
use crate::NodeChain;
use simplecoin_core::{AppendError, ChainError};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What became of one inbound connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    BlockAccepted { index: u64 },
    /// Accepted into the ledger, but writing the chain file failed.
    BlockUnpersisted { index: u64, reason: String },
    BlockRejected(AppendError),
    TxPooled,
    TxDuplicate,
    Malformed(String),
    Failed(String),
}

/// Bind the peer listener and serve it on a background task.
pub async fn spawn_listener(addr: &str, chain: NodeChain) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!("peer listener on {local}");
    Ok((local, tokio::spawn(serve(listener, chain))))
}

/// Accept connections forever, one task per connection. A slow or broken
/// peer never holds up the accept loop.
pub async fn serve(listener: TcpListener, chain: NodeChain) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let chain = chain.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer, chain).await;
                });
            }
            Err(e) => warn!("accept failed: {e}"),
        }
    }
}

pub async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, chain: NodeChain) -> Outcome {
    let outcome = match read_message(&mut stream, MAX_MESSAGE_BYTES, READ_TIMEOUT).await {
        Ok(msg) => {
            debug!(%peer, kind = msg.kind(), "message received");
            apply(msg, &chain).await
        }
        Err(e) => Outcome::Malformed(e.to_string()),
    };
    log_outcome(peer, &outcome);
    outcome
}

/// Apply a parsed peer message to the chain.
pub async fn apply(msg: Message, chain: &NodeChain) -> Outcome {
    match msg {
        Message::Tx(tx) => {
            if chain.submit(tx) {
                Outcome::TxPooled
            } else {
                Outcome::TxDuplicate
            }
        }
        Message::Block(block) => {
            let index = block.index;
            let chain = chain.clone();
            // hashing and the chain file write stay off the async workers
            let result = tokio::task::spawn_blocking(move || chain.accept_block(block)).await;
            match result {
                Ok(Ok(())) => Outcome::BlockAccepted { index },
                Ok(Err(ChainError::Rejected(reason))) => Outcome::BlockRejected(reason),
                Ok(Err(e)) => Outcome::BlockUnpersisted {
                    index,
                    reason: e.to_string(),
                },
                Err(e) => Outcome::Failed(format!("block handler failed: {e}")),
            }
        }
    }
}

fn log_outcome(peer: SocketAddr, outcome: &Outcome) {
    match outcome {
        Outcome::BlockAccepted { index } => info!(%peer, index, "new valid block added"),
        Outcome::BlockUnpersisted { index, reason } => {
            error!(%peer, index, "block accepted but not persisted: {reason}")
        }
        Outcome::BlockRejected(reason) => warn!(%peer, "invalid block rejected: {reason}"),
        Outcome::TxPooled => info!(%peer, "transaction received"),
        Outcome::TxDuplicate => debug!(%peer, "duplicate transaction ignored"),
        Outcome::Malformed(reason) => warn!(%peer, "dropping connection: {reason}"),
        Outcome::Failed(reason) => error!(%peer, "{reason}"),
    }
}
