use serde::{Deserialize, Serialize};
use simplecoin_core::{Block, Transaction};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// One peer message. On the wire: `{"type": "block" | "tx", "data": ...}`,
/// one message per connection, terminated by the sender closing its side.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Message {
    Block(Block),
    Tx(Transaction),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown message type {0:?}")]
    UnknownKind(String),
    #[error("message exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("timed out")]
    Timeout,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: serde_json::Value,
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Block(_) => "block",
            Message::Tx(_) => "tx",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a message. A block payload is only parsed, not verified.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        match envelope.kind.as_str() {
            "block" => Ok(Message::Block(Block::from_json_value(envelope.data)?)),
            "tx" => Ok(Message::Tx(serde_json::from_value(envelope.data)?)),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

/// Read one message until the peer closes its write half.
pub async fn read_message<R>(reader: R, limit: usize, timeout: Duration) -> Result<Message, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut limited = reader.take(limit as u64 + 1);
    tokio::time::timeout(timeout, limited.read_to_end(&mut buf))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    if buf.len() > limit {
        return Err(ProtocolError::TooLarge { limit });
    }
    Message::decode(&buf)
}

/// Send one message and close the write half.
pub async fn write_message<W>(mut writer: W, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(payload).await?;
    writer.shutdown().await?;
    Ok(())
}
