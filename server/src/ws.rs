use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};

use crate::error::SessionError;
use crate::game_loop::GameCommand;
use crate::protocol::{decode_client_msg, MAX_MESSAGE_BYTES};

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub outbound_buffer: usize,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::channel::<String>(app_state.outbound_buffer);

    // Take a seat
    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .game_tx
        .send(GameCommand::Connect {
            outbox,
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Connect command");
        return;
    }

    let connection_id = match resp_rx.await {
        Ok((id, Ok(_))) => id,
        Ok((id, Err(e))) => {
            tracing::warn!("Dropping connection {}: {}", id, e);
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
        Err(_) => {
            tracing::error!("Failed to receive seat assignment");
            return;
        }
    };

    tracing::info!("Connection {} opened", connection_id);

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_MESSAGE_BYTES {
                            tracing::warn!(
                                "Connection {} sent {} byte message, dropping",
                                connection_id,
                                text.len()
                            );
                            continue;
                        }
                        match decode_client_msg(&text) {
                            Ok(msg) => {
                                let cmd = GameCommand::Message { connection_id, msg };
                                if app_state.game_tx.send(cmd).await.is_err() {
                                    break;
                                }
                            }
                            Err(SessionError::UnknownMessageKind) => {
                                tracing::debug!("Connection {} sent unknown message kind", connection_id);
                            }
                            Err(e) => {
                                tracing::warn!("Connection {}: {}", connection_id, e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Connection {} read error: {}", connection_id, e);
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client
            outgoing = outbox_rx.recv() => {
                match outgoing {
                    Some(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .game_tx
        .send(GameCommand::Disconnect { connection_id })
        .await;
    tracing::info!("Connection {} closed", connection_id);
}
