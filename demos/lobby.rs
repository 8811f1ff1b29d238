//! # Lobby Example
//!
//! Joins a Taboo server over WebSocket and prints what happens:
//!
//! 1. Connect (or resume a stored session) as `TABOO_NAME`
//! 2. Pick the red team and mark ready
//! 3. Log roster, round and score changes until Ctrl+C
//!
//! ## Running
//!
//! ```sh
//! # Start a Taboo server on localhost:8081, then:
//! cargo run --example lobby
//!
//! # Override the server URL or player name:
//! TABOO_URL=ws://my-server:8081/ws TABOO_NAME=Grace cargo run --example lobby
//! ```

use taboo_client::{
    FileSessionStore, TabooClient, TabooConfig, TabooEvent, Team, WebSocketConnector,
};

/// Session file; delete it to start over with a fresh identity.
const SESSION_FILE: &str = "taboo-session.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=taboo_client=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("TABOO_URL")
        .unwrap_or_else(|_| TabooConfig::websocket_url(false, "localhost:8081", "/ws"));
    let name = std::env::var("TABOO_NAME").unwrap_or_else(|_| "Ada".to_string());
    tracing::info!("Connecting to {url} as {name}");

    let config = TabooConfig::new(url).with_player_name(name);
    let store = FileSessionStore::new(SESSION_FILE);
    let (mut client, mut event_rx) = TabooClient::start(WebSocketConnector::new(), config, store);

    let roster = client.roster();
    let round = client.round();

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed");
                    break;
                };
                match event {
                    TabooEvent::Connected => tracing::info!("Connected"),
                    TabooEvent::Disconnected { reason } => {
                        tracing::warn!(
                            "Disconnected ({}), reconnecting",
                            reason.as_deref().unwrap_or("clean")
                        );
                    }
                    TabooEvent::IdentityAssigned { player_id, name, resumed } => {
                        tracing::info!("Playing as {name} ({player_id}), resumed: {resumed}");
                        if !resumed {
                            client.request_team_change(Team::Red)?;
                            client.request_ready(true)?;
                        }
                    }
                    TabooEvent::PlayerJoined { .. }
                    | TabooEvent::PlayerLeft { .. }
                    | TabooEvent::PlayerDisconnected { .. }
                    | TabooEvent::PlayerReconnected { .. } => {
                        let names: Vec<String> = roster
                            .borrow()
                            .players
                            .iter()
                            .map(|p| format!("{} ({:?})", p.name, p.team))
                            .collect();
                        tracing::info!("Players: {}", names.join(", "));
                    }
                    TabooEvent::RoundSetup { team, guesser_id, hint_giver_id } => {
                        tracing::info!(
                            "Next round: {team:?}, {hint_giver_id} describes to {guesser_id}, {:?} waits",
                            team.opponent()
                        );
                    }
                    TabooEvent::WordGuessed { red_score, blue_score, .. } => {
                        tracing::info!("Score: red {red_score} / blue {blue_score}");
                    }
                    TabooEvent::GameEnded { red_score, blue_score, winner } => {
                        tracing::info!(
                            "Game over {red_score}:{blue_score}, winner: {}",
                            winner.map_or("draw".to_string(), |t| format!("{t:?}"))
                        );
                    }
                    TabooEvent::ServerError { failed_type, error, .. } => {
                        tracing::error!("Server rejected {failed_type}: {error}");
                    }
                    other => {
                        let state = round.borrow().game_state;
                        tracing::info!("{other:?} (game state {state:?})");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
