//! Wire-compatible protocol types for the Taboo game server.
//!
//! Every frame is a single JSON object whose `type` field selects the message
//! kind. Field names are camelCase and enums travel as integers, matching the
//! server's encoding:
//!
//! - [`Team`]: `-1` unassigned, `0` red, `1` blue
//! - [`GameState`]: `0` lobby through `4` ended

use serde::{Deserialize, Serialize};

use crate::error_codes::ErrorCode;

// ── Type aliases ────────────────────────────────────────────────────

/// Opaque server-issued player identifier.
pub type PlayerId = String;

/// Round length the server uses when nothing else has been announced.
pub const DEFAULT_ROUND_SECONDS: u32 = 60;

// ── Enums ───────────────────────────────────────────────────────────

/// Team membership of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Team {
    #[default]
    Unassigned,
    Red,
    Blue,
}

impl Team {
    /// The team playing against this one. `Unassigned` has no opponent.
    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
            Self::Unassigned => Self::Unassigned,
        }
    }
}

impl TryFrom<i8> for Team {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Unassigned),
            0 => Ok(Self::Red),
            1 => Ok(Self::Blue),
            other => Err(format!("invalid team value {other}")),
        }
    }
}

impl From<Team> for i8 {
    fn from(team: Team) -> Self {
        match team {
            Team::Unassigned => -1,
            Team::Red => 0,
            Team::Blue => 1,
        }
    }
}

/// Macroscopic phase of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GameState {
    #[default]
    InLobby,
    InProgress,
    InRound,
    RoundPaused,
    Ended,
}

impl GameState {
    /// Whether per-round turn fields (team, guesser, hint giver) are meaningful.
    pub fn has_turn(self) -> bool {
        matches!(self, Self::InProgress | Self::InRound | Self::RoundPaused)
    }
}

impl TryFrom<u8> for GameState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::InLobby),
            1 => Ok(Self::InProgress),
            2 => Ok(Self::InRound),
            3 => Ok(Self::RoundPaused),
            4 => Ok(Self::Ended),
            other => Err(format!("invalid game state value {other}")),
        }
    }
}

impl From<GameState> for u8 {
    fn from(state: GameState) -> Self {
        match state {
            GameState::InLobby => 0,
            GameState::InProgress => 1,
            GameState::InRound => 2,
            GameState::RoundPaused => 3,
            GameState::Ended => 4,
        }
    }
}

// ── Structs ─────────────────────────────────────────────────────────

/// A word card: the word to describe and the words the hint giver must avoid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: u32,
    pub word: String,
    #[serde(default)]
    pub taboo: Vec<String>,
}

/// Information about a player as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub team: Team,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(default = "connected_by_default")]
    pub connected: bool,
}

fn connected_by_default() -> bool {
    true
}

/// Payload for the `reconnect_ack` server message.
/// Boxed in `ServerMessage` to reduce enum size.
///
/// Carries everything needed to rehydrate the local mirror after a reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectAckPayload {
    pub player_id: PlayerId,
    pub session_token: String,
    pub name: String,
    #[serde(default)]
    pub team: Team,
    #[serde(default)]
    pub state: GameState,
    /// Seconds left in the current round, if one is running or paused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_team: Option<Team>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guesser_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint_giver_id: Option<PlayerId>,
    #[serde(default)]
    pub red_score: u32,
    #[serde(default)]
    pub blue_score: u32,
    #[serde(default)]
    pub words: Vec<Word>,
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Fresh handshake; the server allocates a new identity.
    Connect { name: String },
    /// Resume handshake with a previously issued identity.
    Reconnect {
        player_id: PlayerId,
        session_token: String,
    },
    ChangeName { player_id: PlayerId, name: String },
    ChangeTeam { player_id: PlayerId, team: Team },
    PlayerReady { player_id: PlayerId, is_ready: bool },
    /// Sent by the hint giver once the round setup has been shown.
    StartRound { player_id: PlayerId },
    ResumeRound { player_id: PlayerId },
    ResetGame { player_id: PlayerId },
    SkipWord { player_id: PlayerId },
    GuessWord { player_id: PlayerId },
}

impl ClientMessage {
    /// Wire discriminant of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Reconnect { .. } => "reconnect",
            Self::ChangeName { .. } => "change_name",
            Self::ChangeTeam { .. } => "change_team",
            Self::PlayerReady { .. } => "player_ready",
            Self::StartRound { .. } => "start_round",
            Self::ResumeRound { .. } => "resume_round",
            Self::ResetGame { .. } => "reset_game",
            Self::SkipWord { .. } => "skip_word",
            Self::GuessWord { .. } => "guess_word",
        }
    }
}

/// Message types sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// A new identity was allocated (also the answer to a failed resume).
    ConnectAck {
        player_id: PlayerId,
        session_token: String,
        name: String,
    },
    /// The resume handshake succeeded (boxed to reduce enum size).
    ReconnectAck(Box<ReconnectAckPayload>),
    NameChanged { player_id: PlayerId, name: String },
    PlayerJoined { player_id: PlayerId, name: String },
    PlayerLeft { player_id: PlayerId },
    PlayerDisconnected { player_id: PlayerId },
    PlayerReconnected { player_id: PlayerId },
    /// Full roster replacement.
    PlayerList { players: Vec<PlayerInfo> },
    TeamChanged { player_id: PlayerId, team: Team },
    PlayerReady { player_id: PlayerId, is_ready: bool },
    GameStateChanged { state: GameState },
    /// Announces the team and roles of the next round.
    RoundSetup {
        team: Team,
        guesser_id: PlayerId,
        hint_giver_id: PlayerId,
        duration: u32,
        #[serde(default)]
        words: Vec<Word>,
    },
    RoundStarted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
    },
    RoundPaused { remaining_duration: u32 },
    RoundResumed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remaining_duration: Option<u32>,
    },
    RoundEnded,
    GameEnded { red_score: u32, blue_score: u32 },
    /// Back to the lobby. `player_ids` lists the players that stay in the
    /// game; when absent every known player is kept.
    GameReset {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_ids: Option<Vec<PlayerId>>,
    },
    WordSkipped { player_id: PlayerId },
    WordGuessed {
        player_id: PlayerId,
        red_score: u32,
        blue_score: u32,
    },
    /// More words for the active round, appended to the queue.
    WordList { words: Vec<Word> },
    /// A request failed; `failed_type` names the client message kind.
    ErrorResponse {
        failed_type: String,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
}

impl ServerMessage {
    /// Wire discriminant of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectAck { .. } => "connect_ack",
            Self::ReconnectAck(_) => "reconnect_ack",
            Self::NameChanged { .. } => "name_changed",
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::PlayerDisconnected { .. } => "player_disconnected",
            Self::PlayerReconnected { .. } => "player_reconnected",
            Self::PlayerList { .. } => "player_list",
            Self::TeamChanged { .. } => "team_changed",
            Self::PlayerReady { .. } => "player_ready",
            Self::GameStateChanged { .. } => "game_state_changed",
            Self::RoundSetup { .. } => "round_setup",
            Self::RoundStarted { .. } => "round_started",
            Self::RoundPaused { .. } => "round_paused",
            Self::RoundResumed { .. } => "round_resumed",
            Self::RoundEnded => "round_ended",
            Self::GameEnded { .. } => "game_ended",
            Self::GameReset { .. } => "game_reset",
            Self::WordSkipped { .. } => "word_skipped",
            Self::WordGuessed { .. } => "word_guessed",
            Self::WordList { .. } => "word_list",
            Self::ErrorResponse { .. } => "error_response",
        }
    }
}
