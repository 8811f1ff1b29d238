//! Error codes carried by `error_response` frames.
//!
//! The server sends these as plain integers. Codes this client does not know
//! about are preserved in [`ErrorCode::Other`] instead of failing the decode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error codes returned by the Taboo server.
///
/// Use [`description()`](ErrorCode::description) for a human-readable explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ErrorCode {
    // Lobby errors
    GameFull,
    PlayerNotFound,
    SessionTokenMissing,
    GameNotInLobby,
    TeamFull,
    PlayerNotInTeam,

    // Round errors
    GameNotStarted,
    NotHintGiver,
    NotAllConnected,
    RoundNotActive,
    RoundNotPaused,
    GameNotEnded,

    /// A code introduced by a newer server.
    Other(i32),
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::GameFull => "Game is full.",
            Self::PlayerNotFound => "Player ID does not exist.",
            Self::SessionTokenMissing => "Session token is missing.",
            Self::GameNotInLobby => "Game not in lobby state.",
            Self::TeamFull => "Team is full.",
            Self::PlayerNotInTeam => "Player has not selected team yet.",
            Self::GameNotStarted => "Game has not started yet.",
            Self::NotHintGiver => "Only hint giver can start a round.",
            Self::NotAllConnected => "Not all players are connected.",
            Self::RoundNotActive => "Round is not active.",
            Self::RoundNotPaused => "Round is not paused.",
            Self::GameNotEnded => "Game has not ended yet.",
            Self::Other(_) => "Unknown error.",
        }
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::GameFull,
            1 => Self::PlayerNotFound,
            2 => Self::SessionTokenMissing,
            3 => Self::GameNotInLobby,
            4 => Self::TeamFull,
            5 => Self::PlayerNotInTeam,
            6 => Self::GameNotStarted,
            7 => Self::NotHintGiver,
            8 => Self::NotAllConnected,
            9 => Self::RoundNotActive,
            10 => Self::RoundNotPaused,
            11 => Self::GameNotEnded,
            other => Self::Other(other),
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::GameFull => 0,
            ErrorCode::PlayerNotFound => 1,
            ErrorCode::SessionTokenMissing => 2,
            ErrorCode::GameNotInLobby => 3,
            ErrorCode::TeamFull => 4,
            ErrorCode::PlayerNotInTeam => 5,
            ErrorCode::GameNotStarted => 6,
            ErrorCode::NotHintGiver => 7,
            ErrorCode::NotAllConnected => 8,
            ErrorCode::RoundNotActive => 9,
            ErrorCode::RoundNotPaused => 10,
            ErrorCode::GameNotEnded => 11,
            ErrorCode::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_decode_from_integers() {
        let code: ErrorCode = serde_json::from_str("4").unwrap();
        assert_eq!(code, ErrorCode::TeamFull);
        assert_eq!(serde_json::to_string(&ErrorCode::RoundNotPaused).unwrap(), "10");
    }

    #[test]
    fn unknown_codes_are_preserved() {
        let code: ErrorCode = serde_json::from_str("99").unwrap();
        assert_eq!(code, ErrorCode::Other(99));
        assert_eq!(i32::from(code), 99);
        assert_eq!(code.to_string(), "Unknown error.");
    }
}
