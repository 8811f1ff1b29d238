//! # Loopback Example
//!
//! Implements [`Connector`] and [`Transport`] over in-process channels and
//! plays one scripted exchange against a fake server. Handy as a template for
//! other backends (TCP, QUIC, WebRTC data channels) or for testing UI code
//! without a server.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};
use taboo_client::{
    Connector, MemorySessionStore, TabooClient, TabooConfig, TabooError, TabooEvent, Transport,
};
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Step 1: A channel-based transport
// ─────────────────────────────────────────────────────────────────────

/// Client half of a loopback connection.
pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Server half: read what the client sent, answer as if from a server.
pub struct LoopbackServer {
    pub rx: mpsc::UnboundedReceiver<String>,
    pub tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), TabooError> {
        self.tx
            .send(message)
            .map_err(|e| TabooError::TransportSend(e.to_string()))
    }

    /// `None` once the server half is dropped. Cancel-safe because
    /// `mpsc::UnboundedReceiver::recv` is.
    async fn recv(&mut self) -> Option<Result<String, TabooError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), TabooError> {
        self.rx.close();
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: A connector that hands the server half to the fake server
// ─────────────────────────────────────────────────────────────────────

pub struct LoopbackConnector {
    servers: mpsc::UnboundedSender<LoopbackServer>,
}

#[async_trait]
impl Connector for LoopbackConnector {
    type Transport = LoopbackTransport;

    async fn connect(&self, url: &str) -> Result<LoopbackTransport, TabooError> {
        tracing::debug!("Opening loopback connection for {url}");
        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();
        self.servers
            .send(LoopbackServer {
                rx: server_rx,
                tx: server_tx,
            })
            .map_err(|_| TabooError::TransportClosed)?;
        Ok(LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: A fake server that answers the handshake and plays one word
// ─────────────────────────────────────────────────────────────────────

async fn fake_server(mut servers: mpsc::UnboundedReceiver<LoopbackServer>) {
    while let Some(mut conn) = servers.recv().await {
        while let Some(text) = conn.rx.recv().await {
            let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                continue;
            };
            tracing::info!("Server received: {text}");
            let replies = match frame["type"].as_str() {
                Some("connect") => vec![
                    json!({"type": "connect_ack", "playerId": "p1", "sessionToken": "tok-1",
                           "name": frame["name"]}),
                    json!({"type": "player_joined", "playerId": "p2", "name": "Bob"}),
                ],
                Some("change_team") => vec![
                    json!({"type": "team_changed", "playerId": frame["playerId"],
                           "team": frame["team"]}),
                    json!({"type": "game_state_changed", "state": 1}),
                    json!({"type": "round_setup", "team": 0, "guesserId": "p1",
                           "hintGiverId": "p2", "duration": 30,
                           "words": [{"id": 1, "word": "lighthouse",
                                      "taboo": ["sea", "light", "tower"]}]}),
                    json!({"type": "round_started"}),
                ],
                Some("guess_word") => vec![
                    json!({"type": "word_guessed", "playerId": frame["playerId"],
                           "redScore": 1, "blueScore": 0}),
                    json!({"type": "game_ended", "redScore": 1, "blueScore": 0}),
                    json!({"type": "game_state_changed", "state": 4}),
                ],
                _ => Vec::new(),
            };
            for reply in replies {
                if conn.tx.send(reply.to_string()).is_err() {
                    return;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (servers_tx, servers_rx) = mpsc::unbounded_channel();
    tokio::spawn(fake_server(servers_rx));

    let connector = LoopbackConnector {
        servers: servers_tx,
    };
    let config = TabooConfig::new("loopback://local").with_player_name("Ada");
    let (mut client, mut event_rx) =
        TabooClient::start(connector, config, MemorySessionStore::new());
    let round = client.round();

    while let Some(event) = event_rx.recv().await {
        match &event {
            TabooEvent::IdentityAssigned { .. } => {
                client.request_team_change(taboo_client::Team::Red)?;
            }
            TabooEvent::RoundStarted => {
                let word = round.borrow().current_word.clone();
                if let Some(word) = word {
                    tracing::info!("Describe '{}' without {:?}", word.word, word.taboo);
                }
                client.request_guess()?;
            }
            TabooEvent::GameEnded { winner, .. } => {
                tracing::info!("Game over, winner: {winner:?}");
                break;
            }
            _ => {}
        }
        tracing::info!("Event: {event:?}");
    }

    client.shutdown().await;
    tracing::info!("Done");
    Ok(())
}
