#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format tests for the Taboo protocol.
//!
//! Outgoing messages are checked against the exact JSON the server expects;
//! incoming fixtures are frames as the server actually writes them.

use serde_json::{json, Value};
use taboo_client::codec::{decode, encode};
use taboo_client::error_codes::ErrorCode;
use taboo_client::protocol::{
    ClientMessage, GameState, PlayerInfo, ReconnectAckPayload, ServerMessage, Team, Word,
};
use taboo_client::TabooError;

fn encoded(message: &ClientMessage) -> Value {
    serde_json::from_str(&encode(message).unwrap()).unwrap()
}

// ════════════════════════════════════════════════════════════════════
// Client → server
// ════════════════════════════════════════════════════════════════════

#[test]
fn handshakes() {
    assert_eq!(
        encoded(&ClientMessage::Connect { name: "Ada".into() }),
        json!({"type": "connect", "name": "Ada"})
    );
    assert_eq!(
        encoded(&ClientMessage::Reconnect {
            player_id: "p1".into(),
            session_token: "t1".into(),
        }),
        json!({"type": "reconnect", "playerId": "p1", "sessionToken": "t1"})
    );
}

#[test]
fn lobby_requests() {
    assert_eq!(
        encoded(&ClientMessage::ChangeTeam {
            player_id: "p1".into(),
            team: Team::Blue,
        }),
        json!({"type": "change_team", "playerId": "p1", "team": 1})
    );
    assert_eq!(
        encoded(&ClientMessage::ChangeTeam {
            player_id: "p1".into(),
            team: Team::Unassigned,
        }),
        json!({"type": "change_team", "playerId": "p1", "team": -1})
    );
    assert_eq!(
        encoded(&ClientMessage::PlayerReady {
            player_id: "p1".into(),
            is_ready: true,
        }),
        json!({"type": "player_ready", "playerId": "p1", "isReady": true})
    );
    assert_eq!(
        encoded(&ClientMessage::ChangeName {
            player_id: "p1".into(),
            name: "Grace".into(),
        }),
        json!({"type": "change_name", "playerId": "p1", "name": "Grace"})
    );
}

#[test]
fn round_requests_carry_only_the_player_id() {
    let id = || "p1".to_string();
    let cases = [
        (ClientMessage::StartRound { player_id: id() }, "start_round"),
        (ClientMessage::ResumeRound { player_id: id() }, "resume_round"),
        (ClientMessage::ResetGame { player_id: id() }, "reset_game"),
        (ClientMessage::SkipWord { player_id: id() }, "skip_word"),
        (ClientMessage::GuessWord { player_id: id() }, "guess_word"),
    ];
    for (message, kind) in cases {
        assert_eq!(message.kind(), kind);
        assert_eq!(encoded(&message), json!({"type": kind, "playerId": "p1"}));
    }
}

// ════════════════════════════════════════════════════════════════════
// Server → client fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn fixture_connect_ack() {
    let msg = decode(r#"{"type":"connect_ack","playerId":"p1","sessionToken":"t1","name":"Ada"}"#)
        .unwrap();
    assert_eq!(
        msg,
        ServerMessage::ConnectAck {
            player_id: "p1".into(),
            session_token: "t1".into(),
            name: "Ada".into(),
        }
    );
}

#[test]
fn fixture_reconnect_ack_mid_round() {
    let msg = decode(
        r#"{
            "type": "reconnect_ack",
            "playerId": "p1",
            "sessionToken": "t1",
            "name": "Ada",
            "team": 0,
            "state": 3,
            "remainingDuration": 17,
            "currentTeam": 0,
            "guesserId": "p1",
            "hintGiverId": "p4",
            "redScore": 6,
            "blueScore": 5,
            "words": [{"id": 12, "word": "piano", "taboo": ["keys", "music"]}]
        }"#,
    )
    .unwrap();

    let ServerMessage::ReconnectAck(payload) = msg else {
        panic!("expected reconnect_ack, got {msg:?}");
    };
    assert_eq!(
        *payload,
        ReconnectAckPayload {
            player_id: "p1".into(),
            session_token: "t1".into(),
            name: "Ada".into(),
            team: Team::Red,
            state: GameState::RoundPaused,
            remaining_duration: Some(17),
            current_team: Some(Team::Red),
            guesser_id: Some("p1".into()),
            hint_giver_id: Some("p4".into()),
            red_score: 6,
            blue_score: 5,
            words: vec![Word {
                id: 12,
                word: "piano".into(),
                taboo: vec!["keys".into(), "music".into()],
            }],
        }
    );
}

#[test]
fn fixture_reconnect_ack_in_lobby_omits_round_fields() {
    let msg = decode(
        r#"{"type":"reconnect_ack","playerId":"p1","sessionToken":"t1","name":"Ada","team":-1,"state":0}"#,
    )
    .unwrap();
    let ServerMessage::ReconnectAck(payload) = msg else {
        panic!("expected reconnect_ack");
    };
    assert_eq!(payload.state, GameState::InLobby);
    assert_eq!(payload.team, Team::Unassigned);
    assert_eq!(payload.remaining_duration, None);
    assert!(payload.words.is_empty());
    assert_eq!((payload.red_score, payload.blue_score), (0, 0));
}

#[test]
fn fixture_player_list() {
    let msg = decode(
        r#"{"type":"player_list","players":[
            {"id":"p1","name":"Ada","team":0,"isReady":true},
            {"id":"p2","name":"Bob","team":1,"isReady":false,"connected":false}
        ]}"#,
    )
    .unwrap();
    assert_eq!(
        msg,
        ServerMessage::PlayerList {
            players: vec![
                PlayerInfo {
                    id: "p1".into(),
                    name: "Ada".into(),
                    team: Team::Red,
                    is_ready: true,
                    connected: true,
                },
                PlayerInfo {
                    id: "p2".into(),
                    name: "Bob".into(),
                    team: Team::Blue,
                    is_ready: false,
                    connected: false,
                },
            ],
        }
    );
}

#[test]
fn fixture_round_setup() {
    let msg = decode(
        r#"{"type":"round_setup","team":1,"guesserId":"p2","hintGiverId":"p3","duration":45,
            "words":[{"id":1,"word":"apple","taboo":["fruit","red"]}]}"#,
    )
    .unwrap();
    assert_eq!(
        msg,
        ServerMessage::RoundSetup {
            team: Team::Blue,
            guesser_id: "p2".into(),
            hint_giver_id: "p3".into(),
            duration: 45,
            words: vec![Word {
                id: 1,
                word: "apple".into(),
                taboo: vec!["fruit".into(), "red".into()],
            }],
        }
    );
}

#[test]
fn fixture_round_lifecycle() {
    assert_eq!(
        decode(r#"{"type":"game_state_changed","state":1}"#).unwrap(),
        ServerMessage::GameStateChanged {
            state: GameState::InProgress
        }
    );
    assert_eq!(
        decode(r#"{"type":"round_started","playerId":"p3"}"#).unwrap(),
        ServerMessage::RoundStarted {
            player_id: Some("p3".into())
        }
    );
    assert_eq!(
        decode(r#"{"type":"round_paused","remainingDuration":33}"#).unwrap(),
        ServerMessage::RoundPaused {
            remaining_duration: 33
        }
    );
    assert_eq!(
        decode(r#"{"type":"round_resumed"}"#).unwrap(),
        ServerMessage::RoundResumed {
            player_id: None,
            remaining_duration: None,
        }
    );
    assert_eq!(
        decode(r#"{"type":"round_ended"}"#).unwrap(),
        ServerMessage::RoundEnded
    );
    assert_eq!(
        decode(r#"{"type":"game_ended","redScore":7,"blueScore":9}"#).unwrap(),
        ServerMessage::GameEnded {
            red_score: 7,
            blue_score: 9
        }
    );
    assert_eq!(
        decode(r#"{"type":"game_reset"}"#).unwrap(),
        ServerMessage::GameReset { player_ids: None }
    );
}

#[test]
fn fixture_word_events() {
    assert_eq!(
        decode(r#"{"type":"word_guessed","playerId":"p1","redScore":3,"blueScore":2}"#).unwrap(),
        ServerMessage::WordGuessed {
            player_id: "p1".into(),
            red_score: 3,
            blue_score: 2,
        }
    );
    assert_eq!(
        decode(r#"{"type":"word_skipped","playerId":"p1"}"#).unwrap(),
        ServerMessage::WordSkipped {
            player_id: "p1".into()
        }
    );
    let ServerMessage::WordList { words } =
        decode(r#"{"type":"word_list","words":[{"id":4,"word":"cloud"}]}"#).unwrap()
    else {
        panic!("expected word_list");
    };
    assert_eq!(words[0].word, "cloud");
    assert!(words[0].taboo.is_empty());
}

#[test]
fn fixture_error_response() {
    let msg = decode(
        r#"{"type":"error_response","failedType":"start_round","error":"not the hint giver","errorCode":7}"#,
    )
    .unwrap();
    assert_eq!(
        msg,
        ServerMessage::ErrorResponse {
            failed_type: "start_round".into(),
            error: "not the hint giver".into(),
            error_code: Some(ErrorCode::NotHintGiver),
        }
    );

    let msg = decode(r#"{"type":"error_response","failedType":"x","error":"?","errorCode":42}"#)
        .unwrap();
    assert!(matches!(
        msg,
        ServerMessage::ErrorResponse {
            error_code: Some(ErrorCode::Other(42)),
            ..
        }
    ));
}

// ════════════════════════════════════════════════════════════════════
// Rejected frames
// ════════════════════════════════════════════════════════════════════

#[test]
fn decode_failures_are_classified() {
    assert!(matches!(
        decode("{{{").unwrap_err(),
        TabooError::Serialization(_)
    ));
    assert!(matches!(
        decode(r#"{"playerId":"p1"}"#).unwrap_err(),
        TabooError::MissingMessageType
    ));
    assert!(matches!(
        decode(r#"{"type":7}"#).unwrap_err(),
        TabooError::MissingMessageType
    ));
    match decode(r#"{"type":"teleport"}"#).unwrap_err() {
        TabooError::UnknownMessageType(kind) => assert_eq!(kind, "teleport"),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(matches!(
        decode(r#"{"type":"team_changed","playerId":"p1","team":5}"#).unwrap_err(),
        TabooError::Serialization(_)
    ));
    assert!(matches!(
        decode(r#"{"type":"game_state_changed","state":9}"#).unwrap_err(),
        TabooError::Serialization(_)
    ));
}

#[test]
fn server_message_kinds_match_the_wire() {
    let frames = [
        r#"{"type":"name_changed","playerId":"p1","name":"A"}"#,
        r#"{"type":"player_joined","playerId":"p1","name":"A"}"#,
        r#"{"type":"player_left","playerId":"p1"}"#,
        r#"{"type":"player_disconnected","playerId":"p1"}"#,
        r#"{"type":"player_reconnected","playerId":"p1"}"#,
        r#"{"type":"team_changed","playerId":"p1","team":0}"#,
        r#"{"type":"player_ready","playerId":"p1","isReady":false}"#,
    ];
    for frame in frames {
        let wire: Value = serde_json::from_str(frame).unwrap();
        assert_eq!(decode(frame).unwrap().kind(), wire["type"]);
    }
}
