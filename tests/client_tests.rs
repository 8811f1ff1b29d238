#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration tests for the Taboo client engine.
//!
//! Every test drives a real `TabooClient` against the channel-based
//! `MockConnector` from `tests/common`, with tokio's clock paused so
//! reconnect delays and countdowns run instantly and deterministically.

mod common;

use std::time::Duration;

use serde_json::json;
use taboo_client::{
    ConnectionState, ErrorCode, FileSessionStore, GameState, MemorySessionStore, SessionIdentity,
    TabooClient, TabooConfig, TabooEvent, Team,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

use common::{
    connect_ack, game_ended, game_state_changed, player_joined, round_setup, round_started,
    team_changed, word_guessed, MockConnector, MockServer,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn config() -> TabooConfig {
    TabooConfig::new("mock://taboo/ws").with_player_name("Ada")
}

fn stored(player_id: &str, token: &str, name: &str) -> SessionIdentity {
    SessionIdentity {
        player_id: Some(player_id.into()),
        session_token: Some(token.into()),
        name: name.into(),
    }
}

/// Skip events until one matches `pred`. Panics after a minute of
/// (virtual) time.
async fn wait_for(
    events: &mut mpsc::Receiver<TabooEvent>,
    pred: impl Fn(&TabooEvent) -> bool,
) -> TabooEvent {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Start a fresh client and complete the `connect` / `connect_ack`
/// handshake as `p1` / `t1` / Ada.
#[allow(clippy::type_complexity)]
async fn identified() -> (
    TabooClient,
    mpsc::Receiver<TabooEvent>,
    MockConnector,
    mpsc::UnboundedReceiver<MockServer>,
    MockServer,
) {
    let (connector, mut servers) = MockConnector::new();
    let (client, mut events) =
        TabooClient::start(connector.clone(), config(), MemorySessionStore::new());
    let mut server = servers.recv().await.unwrap();
    assert_eq!(
        server.expect_sent().await,
        json!({"type": "connect", "name": "Ada"})
    );
    server.push(connect_ack("p1", "t1", "Ada"));
    wait_for(&mut events, |e| matches!(e, TabooEvent::IdentityAssigned { .. })).await;
    (client, events, connector, servers, server)
}

// ════════════════════════════════════════════════════════════════════
// Handshake & identity
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn connect_ack_persists_identity() {
    let (connector, mut servers) = MockConnector::new();
    let store = MemorySessionStore::new();
    let (mut client, mut events) = TabooClient::start(connector, config(), store.clone());

    let mut server = servers.recv().await.unwrap();
    assert_eq!(
        server.expect_sent().await,
        json!({"type": "connect", "name": "Ada"})
    );
    server.push(connect_ack("p1", "t1", "Ada"));

    let event = wait_for(&mut events, |e| matches!(e, TabooEvent::IdentityAssigned { .. })).await;
    assert_eq!(
        event,
        TabooEvent::IdentityAssigned {
            player_id: "p1".into(),
            name: "Ada".into(),
            resumed: false,
        }
    );
    assert_eq!(store.snapshot(), Some(stored("p1", "t1", "Ada")));

    let me = client.roster().borrow().players[0].clone();
    assert!(me.is_self);
    assert_eq!(me.id.as_deref(), Some("p1"));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn persisted_identity_resumes_with_reconnect() {
    let (connector, mut servers) = MockConnector::new();
    let store = MemorySessionStore::with_identity(stored("p1", "t1", "Ada"));
    let (mut client, mut events) = TabooClient::start(connector, config(), store);

    let mut server = servers.recv().await.unwrap();
    assert_eq!(
        server.expect_sent().await,
        json!({"type": "reconnect", "playerId": "p1", "sessionToken": "t1"})
    );
    server.push(json!({
        "type": "reconnect_ack",
        "playerId": "p1",
        "sessionToken": "t1",
        "name": "Ada",
        "team": 1,
        "state": 2,
        "remainingDuration": 12,
        "currentTeam": 1,
        "guesserId": "p1",
        "hintGiverId": "p2",
        "redScore": 4,
        "blueScore": 7,
        "words": [{"id": 5, "word": "lamp", "taboo": ["light"]}]
    }));

    let event = wait_for(&mut events, |e| matches!(e, TabooEvent::IdentityAssigned { .. })).await;
    assert!(matches!(
        event,
        TabooEvent::IdentityAssigned { resumed: true, .. }
    ));

    let round = client.round().borrow().clone();
    assert_eq!(round.game_state, GameState::InRound);
    assert_eq!((round.red_score, round.blue_score), (4, 7));
    assert_eq!(round.current_team, Some(Team::Blue));
    assert_eq!(round.current_word.map(|w| w.word), Some("lamp".to_string()));

    let countdown = *client.countdown().borrow();
    assert!(countdown.running);
    assert_eq!(countdown.remaining_seconds(), 12);
    assert_eq!(client.roster().borrow().players[0].team, Team::Blue);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rejected_resume_starts_a_new_identity() {
    let (connector, mut servers) = MockConnector::new();
    let store = MemorySessionStore::with_identity(stored("old", "expired", "Ada"));
    let (mut client, mut events) = TabooClient::start(connector, config(), store.clone());

    let mut server = servers.recv().await.unwrap();
    assert_eq!(server.expect_sent().await["type"], "reconnect");
    server.push(connect_ack("p7", "t7", "Ada"));

    let event = wait_for(&mut events, |e| matches!(e, TabooEvent::IdentityAssigned { .. })).await;
    assert!(matches!(
        event,
        TabooEvent::IdentityAssigned { resumed: false, .. }
    ));
    assert_eq!(store.snapshot(), Some(stored("p7", "t7", "Ada")));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn file_store_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let (connector, mut servers) = MockConnector::new();
    let (mut client, mut events) =
        TabooClient::start(connector, config(), FileSessionStore::new(&path));
    let mut server = servers.recv().await.unwrap();
    server.expect_sent().await;
    server.push(connect_ack("p1", "t1", "Ada"));
    wait_for(&mut events, |e| matches!(e, TabooEvent::IdentityAssigned { .. })).await;
    client.shutdown().await;

    let (connector, mut servers) = MockConnector::new();
    let (mut client, _events) =
        TabooClient::start(connector, config(), FileSessionStore::new(&path));
    let mut server = servers.recv().await.unwrap();
    assert_eq!(
        server.expect_sent().await,
        json!({"type": "reconnect", "playerId": "p1", "sessionToken": "t1"})
    );
    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Connection management
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn connect_while_pending_opens_one_socket() {
    let (connector, mut servers) = MockConnector::with_delay(Duration::from_millis(500));
    let (mut client, _events) =
        TabooClient::start(connector.clone(), config(), MemorySessionStore::new());
    client.connect().unwrap();
    client.connect().unwrap();

    let _server = servers.recv().await.unwrap();
    client.connect().unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(connector.attempts(), 1);
    assert!(servers.try_recv().is_err());
    assert!(client.is_connected());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn lost_connection_resumes_after_fixed_delay() {
    let (mut client, mut events, connector, mut servers, mut server) = identified().await;
    let lost_at = Instant::now();
    server.hang_up();

    let event = wait_for(&mut events, |e| matches!(e, TabooEvent::Disconnected { .. })).await;
    assert_eq!(event, TabooEvent::Disconnected { reason: None });
    assert_eq!(*client.connection().borrow(), ConnectionState::Disconnected);

    let mut server = servers.recv().await.unwrap();
    assert!(lost_at.elapsed() >= Duration::from_secs(2));
    assert_eq!(
        server.expect_sent().await,
        json!({"type": "reconnect", "playerId": "p1", "sessionToken": "t1"})
    );
    assert_eq!(connector.attempts(), 2);
    wait_for(&mut events, |e| matches!(e, TabooEvent::Connected)).await;

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_delay_is_fixed() {
    let (connector, mut servers) = MockConnector::new();
    let (mut client, _events) = TabooClient::start(
        connector.clone(),
        config().with_reconnect_delay(Duration::from_secs(3)),
        MemorySessionStore::new(),
    );

    let mut server = servers.recv().await.unwrap();
    for _ in 0..4 {
        let dropped_at = Instant::now();
        server.hang_up();
        server = servers.recv().await.unwrap();
        let waited = dropped_at.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
    }
    assert_eq!(connector.attempts(), 5);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_disconnect_cancels_reconnect() {
    let (mut client, mut events, connector, mut servers, server) = identified().await;

    client.disconnect().unwrap();
    let event = wait_for(&mut events, |e| matches!(e, TabooEvent::Disconnected { .. })).await;
    assert!(matches!(event, TabooEvent::Disconnected { reason: Some(_) }));
    assert!(server.closed_by_client());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.attempts(), 1);
    assert!(!client.is_connected());

    client.connect().unwrap();
    let mut server = servers.recv().await.unwrap();
    assert_eq!(server.expect_sent().await["type"], "reconnect");
    assert_eq!(connector.attempts(), 2);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_during_backoff_stops_retrying() {
    let (mut client, mut events, connector, _servers, mut server) = identified().await;
    server.hang_up();
    wait_for(&mut events, |e| matches!(e, TabooEvent::Disconnected { .. })).await;

    client.disconnect().unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.attempts(), 1);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn requests_while_disconnected_are_not_queued() {
    let (mut client, mut events, _connector, mut servers, _server) = identified().await;
    client.disconnect().unwrap();
    wait_for(&mut events, |e| matches!(e, TabooEvent::Disconnected { .. })).await;

    client.request_ready(true).unwrap();
    client.request_team_change(Team::Blue).unwrap();
    client.connect().unwrap();

    let mut server = servers.recv().await.unwrap();
    assert_eq!(server.expect_sent().await["type"], "reconnect");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(server.nothing_sent());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_transport_and_ends_events() {
    let (mut client, mut events, _connector, _servers, server) = identified().await;
    client.shutdown().await;

    assert!(server.closed_by_client());
    let event = wait_for(&mut events, |e| matches!(e, TabooEvent::Disconnected { .. })).await;
    assert_eq!(
        event,
        TabooEvent::Disconnected {
            reason: Some("client shut down".into())
        }
    );
    assert!(events.recv().await.is_none());
    assert!(client.request_skip().is_err());
}

// ════════════════════════════════════════════════════════════════════
// Inbound messages
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn malformed_frames_do_not_disturb_the_stream() {
    let (mut client, mut events, _connector, _servers, server) = identified().await;
    server.push_raw("{not json");
    server.push(json!({"type": "unheard_of"}));
    server.push(json!({"type": "team_changed", "playerId": "p1"}));
    server.push(player_joined("p2", "Bob"));

    let event = wait_for(&mut events, |e| matches!(e, TabooEvent::PlayerJoined { .. })).await;
    assert_eq!(
        event,
        TabooEvent::PlayerJoined {
            player_id: "p2".into(),
            name: "Bob".into(),
        }
    );
    assert!(client.is_connected());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn roster_lists_self_first_then_by_name() {
    let (mut client, mut events, _connector, _servers, server) = identified().await;
    server.push(player_joined("p3", "Zoe"));
    server.push(player_joined("p2", "Bob"));
    server.push(player_joined("p1", "Ada again"));
    server.push(json!({"type": "player_ready", "playerId": "p2", "isReady": true}));
    server.push(team_changed("p2", 1));
    server.push(json!({"type": "player_disconnected", "playerId": "p3"}));
    wait_for(&mut events, |e| {
        matches!(e, TabooEvent::PlayerDisconnected { .. })
    })
    .await;

    let roster = client.roster().borrow().clone();
    let names: Vec<_> = roster.players.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Ada", "Bob", "Zoe"]);
    assert!(roster.players[0].is_self);
    assert_eq!(roster.players[1].team, Team::Blue);
    assert!(!roster.players[1].is_ready);
    assert!(!roster.players[2].connected);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn server_errors_are_surfaced() {
    let (mut client, mut events, _connector, _servers, mut server) = identified().await;
    client.request_team_change(Team::Red).unwrap();
    assert_eq!(
        server.expect_sent().await,
        json!({"type": "change_team", "playerId": "p1", "team": 0})
    );
    server.push(json!({
        "type": "error_response",
        "failedType": "change_team",
        "error": "team is full",
        "errorCode": 4
    }));

    let event = wait_for(&mut events, |e| matches!(e, TabooEvent::ServerError { .. })).await;
    assert_eq!(
        event,
        TabooEvent::ServerError {
            failed_type: "change_team".into(),
            error: "team is full".into(),
            error_code: Some(ErrorCode::TeamFull),
        }
    );
    assert_eq!(client.roster().borrow().players[0].team, Team::Unassigned);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn change_name_is_applied_locally_and_announced() {
    let (mut client, _events, _connector, _servers, mut server) = identified().await;
    client.change_name("Grace").unwrap();
    assert_eq!(
        server.expect_sent().await,
        json!({"type": "change_name", "playerId": "p1", "name": "Grace"})
    );
    assert_eq!(client.roster().borrow().players[0].name, "Grace");

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Round lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn full_game_flow() {
    let (mut client, mut events, _connector, _servers, mut server) = identified().await;
    server.push(player_joined("p2", "Bob"));
    server.push(team_changed("p1", 0));
    server.push(team_changed("p2", 0));
    server.push(game_state_changed(1));
    server.push(round_setup(0, "p1", "p2", 30));
    server.push(round_started());
    wait_for(&mut events, |e| matches!(e, TabooEvent::RoundStarted)).await;

    let round = client.round().borrow().clone();
    assert_eq!(round.game_state, GameState::InRound);
    assert_eq!(round.current_team, Some(Team::Red));
    assert_eq!(round.guesser_id.as_deref(), Some("p1"));
    assert_eq!(round.hint_giver_id.as_deref(), Some("p2"));
    assert_eq!(round.current_word.map(|w| w.word), Some("apple".to_string()));

    let countdown = client.countdown();
    assert!(countdown.borrow().running);
    assert_eq!(countdown.borrow().remaining_seconds(), 30);
    tokio::time::sleep(Duration::from_secs(10)).await;
    let left = countdown.borrow().remaining_seconds();
    assert!((20..=21).contains(&left), "remaining {left}");

    client.request_guess().unwrap();
    assert_eq!(
        server.expect_sent().await,
        json!({"type": "guess_word", "playerId": "p1"})
    );
    server.push(word_guessed("p1", 3, 2));
    wait_for(&mut events, |e| matches!(e, TabooEvent::WordGuessed { .. })).await;

    let round = client.round().borrow().clone();
    assert_eq!((round.red_score, round.blue_score), (3, 2));
    assert_eq!(round.winner, None);
    assert_eq!(round.current_word.map(|w| w.word), Some("river".to_string()));

    server.push(game_ended(3, 2));
    let event = wait_for(&mut events, |e| matches!(e, TabooEvent::GameEnded { .. })).await;
    assert_eq!(
        event,
        TabooEvent::GameEnded {
            red_score: 3,
            blue_score: 2,
            winner: Some(Team::Red),
        }
    );
    assert!(!client.countdown().borrow().running);
    assert_eq!(client.round().borrow().winner, Some(Team::Red));

    client.request_reset_game().unwrap();
    assert_eq!(server.expect_sent().await["type"], "reset_game");
    server.push(json!({"type": "game_reset", "playerIds": ["p1"]}));
    wait_for(&mut events, |e| matches!(e, TabooEvent::GameReset)).await;

    let round = client.round().borrow().clone();
    assert_eq!(round.game_state, GameState::InLobby);
    assert_eq!((round.red_score, round.blue_score), (0, 0));
    let roster = client.roster().borrow().clone();
    assert_eq!(roster.players.len(), 1);
    assert_eq!(roster.players[0].team, Team::Unassigned);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_keep_remaining_time() {
    let (mut client, mut events, _connector, _servers, server) = identified().await;
    server.push(game_state_changed(1));
    server.push(round_setup(1, "p1", "p2", 30));
    server.push(round_started());
    wait_for(&mut events, |e| matches!(e, TabooEvent::RoundStarted)).await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    server.push(json!({"type": "round_paused", "remainingDuration": 20}));
    wait_for(&mut events, |e| matches!(e, TabooEvent::RoundPaused { .. })).await;
    let countdown = client.countdown();
    assert!(!countdown.borrow().running);
    assert_eq!(countdown.borrow().remaining_seconds(), 20);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(countdown.borrow().remaining_seconds(), 20);

    server.push(json!({"type": "round_resumed", "playerId": "p2"}));
    wait_for(&mut events, |e| matches!(e, TabooEvent::RoundResumed)).await;
    assert!(countdown.borrow().running);
    assert_eq!(countdown.borrow().remaining_seconds(), 20);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn countdown_expiry_is_reported() {
    let (mut client, mut events, _connector, _servers, server) = identified().await;
    server.push(game_state_changed(1));
    server.push(round_setup(0, "p2", "p1", 2));
    server.push(round_started());
    wait_for(&mut events, |e| matches!(e, TabooEvent::RoundStarted)).await;

    let started = Instant::now();
    wait_for(&mut events, |e| matches!(e, TabooEvent::RoundExpired)).await;
    assert!(started.elapsed() >= Duration::from_secs(2));

    let countdown = *client.countdown().borrow();
    assert!(!countdown.running);
    assert_eq!(countdown.remaining, Duration::ZERO);
    // The server, not the timer, ends the round.
    assert_eq!(client.round().borrow().game_state, GameState::InRound);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn round_setup_from_the_lobby_starts_the_round() {
    let (mut client, mut events, _connector, _servers, server) = identified().await;
    server.push(round_setup(1, "p1", "p2", 30));
    server.push(round_started());
    wait_for(&mut events, |e| matches!(e, TabooEvent::RoundStarted)).await;

    let round = client.round().borrow().clone();
    assert_eq!(round.game_state, GameState::InRound);
    assert_eq!(round.current_team, Some(Team::Blue));
    assert_eq!(round.waiting_team(), Some(Team::Red));
    let countdown = *client.countdown().borrow();
    assert!(countdown.running);
    assert_eq!(countdown.remaining_seconds(), 30);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn zero_length_round_expires_right_after_starting() {
    let (mut client, mut events, _connector, _servers, server) = identified().await;
    server.push(round_setup(0, "p1", "p2", 0));
    server.push(round_started());
    wait_for(&mut events, |e| matches!(e, TabooEvent::RoundStarted)).await;

    let next = tokio::time::timeout(Duration::from_millis(10), events.recv())
        .await
        .expect("expiry should follow the start immediately");
    assert_eq!(next, Some(TabooEvent::RoundExpired));
    assert!(!client.countdown().borrow().running);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn lost_connection_stops_the_countdown() {
    let (mut client, mut events, _connector, _servers, mut server) = identified().await;
    server.push(game_state_changed(1));
    server.push(round_setup(0, "p1", "p2", 30));
    server.push(round_started());
    wait_for(&mut events, |e| matches!(e, TabooEvent::RoundStarted)).await;

    server.hang_up();
    wait_for(&mut events, |e| matches!(e, TabooEvent::Disconnected { .. })).await;
    assert!(!client.countdown().borrow().running);

    client.shutdown().await;
}
