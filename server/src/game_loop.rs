use crate::broadcast::{Connection, ConnectionId};
use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::protocol::ClientMsg;
use crate::registry::{Assignment, SessionRegistry};
use tokio::sync::{mpsc, oneshot};

/// Everything the game loop reacts to. Processed strictly one at a time.
pub enum GameCommand {
    Connect {
        outbox: mpsc::Sender<String>,
        response: oneshot::Sender<(ConnectionId, Result<Assignment, SessionError>)>,
    },
    Message {
        connection_id: ConnectionId,
        msg: ClientMsg,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    /// Sent by a session's tick timer
    Tick {
        session_id: String,
    },
}

/// Run the game loop. Owns the registry and with it every session.
///
/// `cmd_tx` is the sending half of `cmd_rx`; session timers use it to
/// schedule their ticks.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    cmd_tx: mpsc::Sender<GameCommand>,
    config: ServerConfig,
) {
    let mut registry = SessionRegistry::new(&config, cmd_tx);
    let mut next_connection_id: ConnectionId = 1;

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            GameCommand::Connect { outbox, response } => {
                let connection_id = next_connection_id;
                next_connection_id += 1;

                let result = registry.connect(Connection::new(connection_id, outbox));
                match &result {
                    Ok(assignment) => tracing::info!(
                        "Connection {} is player {} ({:?}) in {}",
                        connection_id,
                        assignment.slot_id,
                        assignment.color,
                        assignment.session_id
                    ),
                    Err(e) => tracing::warn!("Connection {} not seated: {}", connection_id, e),
                }
                let _ = response.send((connection_id, result));
            }
            GameCommand::Message { connection_id, msg } => {
                registry.dispatch(connection_id, msg);
            }
            GameCommand::Disconnect { connection_id } => {
                registry.disconnect(connection_id);
            }
            GameCommand::Tick { session_id } => {
                registry.tick(&session_id);
            }
        }
    }

    tracing::info!("Game loop ended");
}
