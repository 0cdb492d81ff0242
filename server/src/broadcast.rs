//! Outbound delivery to connected peers.
//!
//! Every connection owns a bounded outbox drained by its WebSocket task.
//! Delivery is best-effort: a closed or full outbox just loses the message.

use pong_shared::protocol::ServerMsg;
use tokio::sync::mpsc;

/// Identifies one transport connection for its whole lifetime.
pub type ConnectionId = u64;

/// Sending half of a peer connection.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    outbox: mpsc::Sender<String>,
}

impl Connection {
    pub fn new(id: ConnectionId, outbox: mpsc::Sender<String>) -> Self {
        Self { id, outbox }
    }

    /// Queue an already encoded message. Returns false if it was dropped.
    pub fn send_text(&self, text: String) -> bool {
        match self.outbox.try_send(text) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("Connection {} outbox full, dropping message", self.id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn send(&self, msg: &ServerMsg) -> bool {
        match encode(msg) {
            Some(text) => self.send_text(text),
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.outbox.is_closed()
    }
}

/// Serialize once, then hand the same text to every connection.
pub fn broadcast<'a>(connections: impl IntoIterator<Item = &'a Connection>, msg: &ServerMsg) {
    let Some(text) = encode(msg) else {
        return;
    };
    for connection in connections {
        connection.send_text(text.clone());
    }
}

fn encode(msg: &ServerMsg) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!("Failed to encode {:?}: {}", msg, e);
            None
        }
    }
}
