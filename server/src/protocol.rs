//! Inbound decoding. Wire types live in `pong_shared::protocol`.

use crate::error::SessionError;
pub use pong_shared::protocol::*;

/// Largest inbound text frame accepted; anything bigger is not a pong message
pub const MAX_MESSAGE_BYTES: usize = 1024;

/// Decode one client text frame.
pub fn decode_client_msg(text: &str) -> Result<ClientMsg, SessionError> {
    match serde_json::from_str::<ClientMsg>(text)? {
        ClientMsg::Unknown => Err(SessionError::UnknownMessageKind),
        msg => Ok(msg),
    }
}
