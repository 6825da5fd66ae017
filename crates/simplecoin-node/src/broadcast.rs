use crate::protocol::{write_message, Message, ProtocolError};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fire-and-forget fan-out to the configured peers. Each peer gets a fresh
/// connection carrying exactly one message.
#[derive(Clone, Debug)]
pub struct Broadcaster {
    peers: Arc<Vec<String>>,
    timeout: Duration,
}

impl Broadcaster {
    pub fn new(peers: Vec<String>, timeout: Duration) -> Self {
        Self {
            peers: Arc::new(peers),
            timeout,
        }
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Send `msg` to every peer concurrently. A peer that cannot be reached
    /// within the timeout is logged and skipped.
    pub async fn broadcast(&self, msg: &Message) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        if self.peers.is_empty() {
            return report;
        }

        let payload: Arc<[u8]> = match msg.encode() {
            Ok(bytes) => bytes.into(),
            Err(e) => {
                error!("cannot encode {} message: {e}", msg.kind());
                report.failed = self.peers.len();
                return report;
            }
        };

        let mut sends = JoinSet::new();
        for peer in self.peers.iter().cloned() {
            let payload = Arc::clone(&payload);
            let timeout = self.timeout;
            sends.spawn(async move {
                let result = send_to(&peer, &payload, timeout).await;
                (peer, result)
            });
        }

        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((peer, Ok(()))) => {
                    debug!(%peer, kind = msg.kind(), "delivered");
                    report.delivered += 1;
                }
                Ok((peer, Err(e))) => {
                    warn!(%peer, kind = msg.kind(), "broadcast failed: {e}");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!("broadcast task failed: {e}");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Open a connection to `addr`, write `payload`, close. The whole exchange
/// is bounded by `timeout`.
pub async fn send_to(addr: &str, payload: &[u8], timeout: Duration) -> Result<(), ProtocolError> {
    tokio::time::timeout(timeout, async {
        let stream = TcpStream::connect(addr).await?;
        write_message(stream, payload).await
    })
    .await
    .map_err(|_| ProtocolError::Timeout)?
}
