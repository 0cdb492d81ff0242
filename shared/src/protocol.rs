use serde::{Deserialize, Serialize};

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "assignPlayer")]
    AssignPlayer(AssignPlayerMsg),
    #[serde(rename = "updateGameState")]
    UpdateGameState(GameStateMsg),
    #[serde(rename = "gamePaused")]
    GamePaused(GamePausedMsg),
    #[serde(rename = "gameResumed")]
    GameResumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddleColor {
    Red,
    Blue,
}

impl PaddleColor {
    /// Slot 1 plays red, slot 2 plays blue.
    pub fn for_slot(slot: u8) -> Self {
        if slot == 1 {
            PaddleColor::Red
        } else {
            PaddleColor::Blue
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPlayerMsg {
    pub player_id: u8,
    pub color: PaddleColor,
    pub game_id: String,
}

/// Full snapshot of one session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateMsg {
    pub game_id: String,
    pub ball: BallWire,
    pub scores: ScoresWire,
    pub players: Vec<PlayerWire>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallWire {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub speed_x: f64,
    pub speed_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoresWire {
    pub player1: u32,
    pub player2: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerWire {
    pub player_id: u8,
    pub y: f64,
    pub color: PaddleColor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamePausedMsg {
    pub paused: bool,
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Paddle top reported by the owning client. Taken verbatim.
    #[serde(rename = "updatePosition", rename_all = "camelCase")]
    UpdatePosition { player_id: u8, y: f64 },
    /// Resume a paused game
    #[serde(rename = "startGame", rename_all = "camelCase")]
    StartGame { game_id: String },
    #[serde(rename = "togglePause", rename_all = "camelCase")]
    TogglePause { game_id: String },
    /// Ask for a fresh snapshot (sent by clients after a local reset)
    #[serde(rename = "updateGameState", rename_all = "camelCase")]
    SyncState { game_id: String },
    /// Any `type` this server does not know about
    #[serde(other)]
    Unknown,
}
