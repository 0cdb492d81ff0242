use crate::broadcast::{broadcast, Connection, ConnectionId};
use crate::error::SessionError;
use crate::game_loop::GameCommand;
use crate::physics::{self, Ball, Goal, Paddle, Scores};
use pong_shared::config::PADDLE_START_Y;
use pong_shared::protocol::{GamePausedMsg, GameStateMsg, PaddleColor, PlayerWire, ServerMsg};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One of the two player positions in a session
#[derive(Debug)]
pub struct PlayerSlot {
    pub slot_id: u8,
    pub connection: Connection,
    pub paddle: Paddle,
    pub color: PaddleColor,
}

impl PlayerSlot {
    fn to_wire(&self) -> PlayerWire {
        PlayerWire {
            player_id: self.slot_id,
            y: self.paddle.y,
            color: self.color,
        }
    }
}

/// Recurring task that feeds `GameCommand::Tick` for one session into the
/// game loop. Aborted when dropped.
#[derive(Debug)]
pub struct TickTimer {
    handle: JoinHandle<()>,
}

impl TickTimer {
    pub fn spawn(session_id: String, period: Duration, ticks: mpsc::Sender<GameCommand>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of an interval completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let cmd = GameCommand::Tick {
                    session_id: session_id.clone(),
                };
                if ticks.send(cmd).await.is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    WaitingForPeer,
    Running,
    Paused,
    Terminated,
}

/// One two-player game: its slots, ball, scores and tick timer.
pub struct Session {
    id: String,
    slots: [Option<PlayerSlot>; 2],
    ball: Ball,
    scores: Scores,
    paused: bool,
    tick: Option<TickTimer>,
    tick_period: Duration,
    rng: ChaCha8Rng,
    terminated: bool,
}

impl Session {
    pub fn new(id: String, rng_seed: u64, tick_period: Duration) -> Self {
        Self {
            id,
            slots: [None, None],
            ball: Ball::default(),
            scores: Scores::default(),
            paused: false,
            tick: None,
            tick_period,
            rng: ChaCha8Rng::seed_from_u64(rng_seed),
            terminated: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    pub fn scores(&self) -> &Scores {
        &self.scores
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_ticking(&self) -> bool {
        self.tick.is_some()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn slot(&self, slot_id: u8) -> Option<&PlayerSlot> {
        self.slots.iter().flatten().find(|s| s.slot_id == slot_id)
    }

    pub fn has_connection(&self, connection_id: ConnectionId) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|s| s.connection.id == connection_id)
    }

    pub fn phase(&self) -> SessionPhase {
        if self.terminated {
            return SessionPhase::Terminated;
        }
        match self.slot_count() {
            0 => SessionPhase::Empty,
            1 => SessionPhase::WaitingForPeer,
            _ if self.paused => SessionPhase::Paused,
            _ => SessionPhase::Running,
        }
    }

    /// Put `connection` into the first free slot.
    pub fn assign_slot(&mut self, connection: Connection) -> Result<&PlayerSlot, SessionError> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| SessionError::SlotsFull(self.id.clone()))?;
        let slot_id = index as u8 + 1;
        let slot = self.slots[index].insert(PlayerSlot {
            slot_id,
            connection,
            paddle: Paddle {
                slot: slot_id,
                y: PADDLE_START_Y,
            },
            color: PaddleColor::for_slot(slot_id),
        });
        Ok(&*slot)
    }

    /// Start the tick timer once both slots are filled. Returns true if a
    /// timer was started by this call.
    pub fn start_if_ready(&mut self, ticks: &mpsc::Sender<GameCommand>) -> bool {
        if self.slot_count() < 2 || self.tick.is_some() {
            return false;
        }
        self.tick = Some(TickTimer::spawn(
            self.id.clone(),
            self.tick_period,
            ticks.clone(),
        ));
        tracing::info!("Session {} started", self.id);
        true
    }

    /// One scheduled tick: advance the physics and broadcast a snapshot.
    pub fn on_tick(&mut self) -> Option<Goal> {
        if self.paused {
            return None;
        }

        let mut paddles: Vec<&mut Paddle> = self
            .slots
            .iter_mut()
            .flatten()
            .map(|s| &mut s.paddle)
            .collect();
        let goal = physics::advance(&mut self.ball, &mut self.scores, &mut paddles, &mut self.rng);
        if let Some(goal) = goal {
            tracing::debug!(
                "Session {}: {:?} scored ({}-{})",
                self.id,
                goal,
                self.scores.player1,
                self.scores.player2
            );
        }

        self.broadcast_snapshot();
        goal
    }

    /// Store a paddle position exactly as the client reported it and push
    /// a snapshot right away. Returns false if no such slot exists.
    pub fn update_player_position(&mut self, slot_id: u8, y: f64) -> bool {
        let Some(slot) = self.slots.iter_mut().flatten().find(|s| s.slot_id == slot_id) else {
            tracing::warn!("Player {} not found in session {}", slot_id, self.id);
            return false;
        };
        slot.paddle.y = y;
        self.broadcast_snapshot();
        true
    }

    /// Flip the pause flag. Returns the new value.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.broadcast(&ServerMsg::GamePaused(GamePausedMsg {
            paused: self.paused,
        }));
        self.paused
    }

    /// Resume a paused session. Returns false when it was not paused.
    pub fn request_start(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        self.broadcast(&ServerMsg::GameResumed);
        true
    }

    /// Send the current snapshot to one connection only.
    pub fn sync_state(&self, connection_id: ConnectionId) {
        if let Some(slot) = self
            .slots
            .iter()
            .flatten()
            .find(|s| s.connection.id == connection_id)
        {
            slot.connection.send(&ServerMsg::UpdateGameState(self.snapshot()));
        }
    }

    /// Drop the slot held by `connection_id`. Returns the remaining slot
    /// count, or `None` if the connection had no slot here.
    pub fn remove_slot(&mut self, connection_id: ConnectionId) -> Option<usize> {
        let entry = self
            .slots
            .iter_mut()
            .find(|s| matches!(s, Some(slot) if slot.connection.id == connection_id))?;
        let slot = entry.take()?;
        tracing::info!("Player {} left session {}", slot.slot_id, self.id);

        let remaining = self.slot_count();
        if remaining < 2 {
            self.stop_timer();
        }
        if remaining == 0 {
            self.terminate();
        }
        Some(remaining)
    }

    /// Release the timer for good.
    pub fn terminate(&mut self) {
        self.stop_timer();
        self.terminated = true;
    }

    pub fn snapshot(&self) -> GameStateMsg {
        GameStateMsg {
            game_id: self.id.clone(),
            ball: self.ball.to_wire(),
            scores: self.scores.to_wire(),
            players: self.slots.iter().flatten().map(PlayerSlot::to_wire).collect(),
        }
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.tick.take() {
            timer.cancel();
            tracing::debug!("Session {} tick timer cancelled", self.id);
        }
    }

    fn broadcast_snapshot(&self) {
        self.broadcast(&ServerMsg::UpdateGameState(self.snapshot()));
    }

    fn broadcast(&self, msg: &ServerMsg) {
        broadcast(self.slots.iter().flatten().map(|s| &s.connection), msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> Session {
        Session::new("game_1".to_string(), 12345, Duration::from_millis(16))
    }

    fn peer(id: ConnectionId) -> (Connection, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(32);
        (Connection::new(id, tx), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            out.push(serde_json::from_str(&text).unwrap());
        }
        out
    }

    fn full_session() -> (Session, mpsc::Receiver<String>, mpsc::Receiver<String>) {
        let mut session = test_session();
        let (c1, rx1) = peer(1);
        let (c2, rx2) = peer(2);
        session.assign_slot(c1).unwrap();
        session.assign_slot(c2).unwrap();
        (session, rx1, rx2)
    }

    #[test]
    fn new_session_is_empty_and_centered() {
        let session = test_session();
        assert_eq!(session.phase(), SessionPhase::Empty);
        assert_eq!((session.ball().x, session.ball().y), (500.0, 300.0));
        assert_eq!(session.scores().total(), 0);
        assert!(!session.is_paused());
        assert!(!session.is_ticking());
    }

    #[test]
    fn slots_fill_in_order_with_colors() {
        let mut session = test_session();
        let (c1, _rx1) = peer(1);
        let (c2, _rx2) = peer(2);

        let first = session.assign_slot(c1).unwrap();
        assert_eq!((first.slot_id, first.color), (1, PaddleColor::Red));
        assert_eq!(session.phase(), SessionPhase::WaitingForPeer);

        let second = session.assign_slot(c2).unwrap();
        assert_eq!((second.slot_id, second.color), (2, PaddleColor::Blue));
        assert_eq!(session.slot_count(), 2);
    }

    #[test]
    fn third_slot_is_rejected() {
        let (mut session, _rx1, _rx2) = full_session();
        let (c3, _rx3) = peer(3);
        assert!(matches!(
            session.assign_slot(c3),
            Err(SessionError::SlotsFull(id)) if id == "game_1"
        ));
    }

    #[test]
    fn freed_slot_is_reused_first() {
        let (mut session, _rx1, _rx2) = full_session();
        session.remove_slot(1);
        let (c3, _rx3) = peer(3);
        assert_eq!(session.assign_slot(c3).unwrap().slot_id, 1);
    }

    #[tokio::test]
    async fn timer_starts_only_with_two_slots() {
        let (ticks, _tick_rx) = mpsc::channel(8);
        let mut session = test_session();
        let (c1, _rx1) = peer(1);
        session.assign_slot(c1).unwrap();
        assert!(!session.start_if_ready(&ticks));
        assert!(!session.is_ticking());

        let (c2, _rx2) = peer(2);
        session.assign_slot(c2).unwrap();
        assert!(session.start_if_ready(&ticks));
        assert!(!session.start_if_ready(&ticks));
        assert!(session.is_ticking());
        assert_eq!(session.phase(), SessionPhase::Running);
    }

    #[tokio::test]
    async fn timer_delivers_ticks_for_its_session() {
        let (ticks, mut tick_rx) = mpsc::channel(8);
        let (mut session, _rx1, _rx2) = full_session();
        session.start_if_ready(&ticks);

        let cmd = tokio::time::timeout(Duration::from_secs(1), tick_rx.recv())
            .await
            .expect("tick should arrive")
            .expect("channel open");
        match cmd {
            GameCommand::Tick { session_id } => assert_eq!(session_id, "game_1"),
            _ => panic!("Expected Tick"),
        }
    }

    #[tokio::test]
    async fn removing_a_slot_cancels_timer() {
        let (ticks, _tick_rx) = mpsc::channel(8);
        let (mut session, _rx1, _rx2) = full_session();
        session.start_if_ready(&ticks);

        assert_eq!(session.remove_slot(2), Some(1));
        assert!(!session.is_ticking());
        assert_eq!(session.phase(), SessionPhase::WaitingForPeer);

        assert_eq!(session.remove_slot(1), Some(0));
        assert_eq!(session.phase(), SessionPhase::Terminated);
    }

    #[test]
    fn removing_unknown_connection_is_noop() {
        let (mut session, _rx1, _rx2) = full_session();
        assert_eq!(session.remove_slot(99), None);
        assert_eq!(session.slot_count(), 2);
    }

    #[test]
    fn tick_advances_ball_and_broadcasts() {
        let (mut session, mut rx1, mut rx2) = full_session();
        let before = *session.ball();

        session.on_tick();

        assert_eq!(session.ball().x, before.x + before.speed_x);
        assert_eq!(session.ball().y, before.y + before.speed_y);
        let m1 = drain(&mut rx1);
        let m2 = drain(&mut rx2);
        assert_eq!(m1.len(), 1);
        assert_eq!(m2.len(), 1);
        assert_eq!(m1[0]["type"], "updateGameState");
        assert_eq!(m1[0]["ball"]["x"], 505.0);
        assert_eq!(m1[0]["players"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn paused_tick_is_noop() {
        let (mut session, mut rx1, _rx2) = full_session();
        session.toggle_pause();
        drain(&mut rx1);
        let before = *session.ball();

        assert_eq!(session.on_tick(), None);

        assert_eq!(*session.ball(), before);
        assert!(drain(&mut rx1).is_empty());
    }

    #[test]
    fn double_toggle_restores_state() {
        let (mut session, mut rx1, mut rx2) = full_session();
        let before = *session.ball();

        assert!(session.toggle_pause());
        session.on_tick();
        assert!(!session.toggle_pause());

        assert!(!session.is_paused());
        assert_eq!(*session.ball(), before);
        let msgs = drain(&mut rx1);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0], serde_json::json!({"type": "gamePaused", "paused": true}));
        assert_eq!(msgs[1], serde_json::json!({"type": "gamePaused", "paused": false}));
        assert_eq!(drain(&mut rx2).len(), 2);
    }

    #[test]
    fn request_start_only_resumes_when_paused() {
        let (mut session, mut rx1, _rx2) = full_session();
        assert!(!session.request_start());
        assert!(drain(&mut rx1).is_empty());

        session.toggle_pause();
        drain(&mut rx1);
        assert!(session.request_start());
        assert!(!session.is_paused());
        assert_eq!(
            drain(&mut rx1),
            vec![serde_json::json!({"type": "gameResumed"})]
        );
    }

    #[test]
    fn position_update_is_verbatim_and_immediate() {
        let (mut session, mut rx1, mut rx2) = full_session();

        assert!(session.update_player_position(1, 200.0));

        let msgs = drain(&mut rx2);
        assert_eq!(msgs.len(), 1);
        let players = msgs[0]["players"].as_array().unwrap();
        assert!(players
            .iter()
            .any(|p| p["playerId"] == 1 && p["y"] == 200.0 && p["color"] == "red"));
        assert_eq!(drain(&mut rx1).len(), 1);

        // Out-of-field values are not clamped
        session.update_player_position(2, -45.0);
        assert_eq!(session.slot(2).unwrap().paddle.y, -45.0);
    }

    #[test]
    fn position_update_for_missing_slot_is_ignored() {
        let mut session = test_session();
        let (c1, mut rx1) = peer(1);
        session.assign_slot(c1).unwrap();

        assert!(!session.update_player_position(2, 100.0));
        assert!(drain(&mut rx1).is_empty());
    }

    #[test]
    fn goal_scores_and_recenters_in_same_snapshot() {
        let (mut session, mut rx1, _rx2) = full_session();
        session.ball = Ball {
            x: 5.0,
            y: 300.0,
            radius: 10.0,
            speed_x: -5.0,
            speed_y: 3.0,
        };
        session.update_player_position(1, 0.0);
        drain(&mut rx1);

        assert_eq!(session.on_tick(), Some(Goal::Player2));

        assert_eq!(session.scores().player2, 1);
        let msgs = drain(&mut rx1);
        assert_eq!(msgs[0]["scores"]["player2"], 1);
        assert_eq!(msgs[0]["ball"]["x"], 500.0);
        assert_eq!(msgs[0]["ball"]["y"], 300.0);
        assert_eq!(session.slot(1).unwrap().paddle.y, 270.0);
    }

    #[test]
    fn sync_state_answers_only_the_requester() {
        let (session, mut rx1, mut rx2) = full_session();

        session.sync_state(2);

        assert!(drain(&mut rx1).is_empty());
        let msgs = drain(&mut rx2);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["gameId"], "game_1");
    }

    #[test]
    fn closed_peer_does_not_stop_ticks() {
        let (mut session, rx1, mut rx2) = full_session();
        drop(rx1);

        session.on_tick();
        session.on_tick();

        assert_eq!(drain(&mut rx2).len(), 2);
    }
}
