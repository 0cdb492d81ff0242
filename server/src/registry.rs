use crate::broadcast::{Connection, ConnectionId};
use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::game_loop::GameCommand;
use crate::physics::Goal;
use crate::session::Session;
use pong_shared::protocol::{AssignPlayerMsg, ClientMsg, PaddleColor, ServerMsg};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// Where a newly connected peer ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub session_id: String,
    pub slot_id: u8,
    pub color: PaddleColor,
}

/// All live sessions, owned by the game loop.
///
/// Pairing is strictly by arrival order: odd arrivals open a new session,
/// even arrivals join the session opened just before them. Nothing searches
/// for free slots elsewhere.
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
    /// Session each connection holds a slot in
    memberships: HashMap<ConnectionId, String>,
    next_session_number: u64,
    /// The most recently created session still expects its second player
    awaiting_peer: bool,
    rng_seed: u64,
    tick_period: Duration,
    ticks: mpsc::Sender<GameCommand>,
}

impl SessionRegistry {
    pub fn new(config: &ServerConfig, ticks: mpsc::Sender<GameCommand>) -> Self {
        Self {
            sessions: HashMap::new(),
            memberships: HashMap::new(),
            next_session_number: 1,
            awaiting_peer: false,
            rng_seed: config.rng_seed,
            tick_period: config.tick_period(),
            ticks,
        }
    }

    /// Seat a new connection, send it `assignPlayer` and start the session
    /// once it is full.
    pub fn connect(&mut self, connection: Connection) -> Result<Assignment, SessionError> {
        let session_id = if self.awaiting_peer {
            self.awaiting_peer = false;
            session_name(self.next_session_number - 1)
        } else {
            let number = self.next_session_number;
            self.next_session_number += 1;
            self.awaiting_peer = true;

            let id = session_name(number);
            let session = Session::new(
                id.clone(),
                self.rng_seed.wrapping_add(number),
                self.tick_period,
            );
            self.sessions.insert(id.clone(), session);
            tracing::info!("Session {} created", id);
            id
        };

        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| SessionError::RegistryUnavailable(session_id.clone()))?;

        let connection_id = connection.id;
        let slot = session.assign_slot(connection)?;
        let assignment = Assignment {
            session_id: session_id.clone(),
            slot_id: slot.slot_id,
            color: slot.color,
        };
        slot.connection.send(&ServerMsg::AssignPlayer(AssignPlayerMsg {
            player_id: assignment.slot_id,
            color: assignment.color,
            game_id: session_id.clone(),
        }));

        self.memberships.insert(connection_id, session_id);
        session.start_if_ready(&self.ticks);
        Ok(assignment)
    }

    /// Apply one decoded client message to the sender's session.
    pub fn dispatch(&mut self, connection_id: ConnectionId, msg: ClientMsg) {
        let Some(session_id) = self.memberships.get(&connection_id) else {
            tracing::debug!("Connection {} has no session, dropping message", connection_id);
            return;
        };
        let Some(session) = self.sessions.get_mut(session_id) else {
            return;
        };

        match msg {
            ClientMsg::UpdatePosition { player_id, y } => {
                session.update_player_position(player_id, y);
            }
            ClientMsg::StartGame { game_id } => {
                if addressed_to(session, &game_id) {
                    session.request_start();
                }
            }
            ClientMsg::TogglePause { game_id } => {
                if addressed_to(session, &game_id) {
                    session.toggle_pause();
                }
            }
            ClientMsg::SyncState { game_id } => {
                if addressed_to(session, &game_id) {
                    session.sync_state(connection_id);
                }
            }
            ClientMsg::Unknown => {
                tracing::debug!("Ignoring unknown message from connection {}", connection_id);
            }
        }
    }

    /// Release the connection's slot. Returns true if its session was
    /// destroyed as a result.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> bool {
        let Some(session_id) = self.memberships.remove(&connection_id) else {
            return false;
        };
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return false;
        };

        if session.remove_slot(connection_id) == Some(0) {
            self.sessions.remove(&session_id);
            tracing::info!("Session {} closed", session_id);
            return true;
        }
        false
    }

    /// Run one scheduled tick. Ticks for sessions that are gone or no
    /// longer timed are stale and ignored.
    pub fn tick(&mut self, session_id: &str) -> Option<Goal> {
        let session = self.sessions.get_mut(session_id)?;
        if !session.is_ticking() {
            return None;
        }
        session.on_tick()
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn session_of(&self, connection_id: ConnectionId) -> Option<&str> {
        self.memberships.get(&connection_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn session_name(number: u64) -> String {
    format!("game_{}", number)
}

fn addressed_to(session: &Session, game_id: &str) -> bool {
    if session.id() == game_id {
        return true;
    }
    tracing::debug!(
        "Dropping message for {} sent from session {}",
        game_id,
        session.id()
    );
    false
}
