/// Failures contained at the connect/dispatch boundary.
///
/// None of these ever stop a session's tick or the game loop.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Both slots of the target session are occupied.
    #[error("session {0} has no free slot")]
    SlotsFull(String),

    /// The pairing rule pointed at a session that no longer exists.
    #[error("session {0} is not available")]
    RegistryUnavailable(String),

    #[error("malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    #[error("unknown message kind")]
    UnknownMessageKind,
}
