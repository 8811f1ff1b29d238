//! Events emitted by the client engine.
//!
//! Snapshots ([`RosterSnapshot`](crate::roster::RosterSnapshot),
//! [`RoundSnapshot`](crate::round::RoundSnapshot), ...) describe *state*;
//! [`TabooEvent`]s describe *what just happened*, for things like toasts,
//! sounds or log lines.

use crate::error_codes::ErrorCode;
use crate::protocol::{PlayerId, Team};

/// State of the single connection to the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Events delivered on the receiver returned by
/// [`TabooClient::start`](crate::TabooClient::start).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabooEvent {
    /// The transport opened and the handshake was sent.
    Connected,
    /// The transport closed. A reconnect follows unless the client was
    /// disconnected on purpose.
    Disconnected { reason: Option<String> },
    /// The server confirmed an identity. `resumed` is `false` when a new
    /// identity was allocated, including after a rejected resume.
    IdentityAssigned {
        player_id: PlayerId,
        name: String,
        resumed: bool,
    },
    PlayerJoined { player_id: PlayerId, name: String },
    PlayerLeft {
        player_id: PlayerId,
        name: Option<String>,
    },
    PlayerDisconnected { player_id: PlayerId },
    PlayerReconnected { player_id: PlayerId },
    RoundSetup {
        team: Team,
        guesser_id: PlayerId,
        hint_giver_id: PlayerId,
    },
    RoundStarted,
    RoundPaused { remaining_seconds: u32 },
    RoundResumed,
    RoundEnded,
    /// The local countdown reached zero.
    RoundExpired,
    WordGuessed {
        player_id: PlayerId,
        red_score: u32,
        blue_score: u32,
    },
    WordSkipped { player_id: PlayerId },
    GameEnded {
        red_score: u32,
        blue_score: u32,
        winner: Option<Team>,
    },
    GameReset,
    /// A request was rejected. `failed_type` is the client message kind.
    ServerError {
        failed_type: String,
        error: String,
        error_code: Option<ErrorCode>,
    },
}
