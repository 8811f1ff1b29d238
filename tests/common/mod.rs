#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Taboo client integration tests.
//!
//! [`MockConnector`] hands out channel-based [`MockTransport`]s. For every
//! connection it opens, the test receives the other end as a [`MockServer`]
//! that can read what the client sent, push frames, or hang up.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use taboo_client::{Connector, TabooError, Transport};
use tokio::sync::mpsc;

// ── MockTransport ───────────────────────────────────────────────────

/// Client end of one mock connection.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), TabooError> {
        self.outgoing
            .send(message)
            .map_err(|_| TabooError::TransportSend("mock server gone".into()))
    }

    async fn recv(&mut self) -> Option<Result<String, TabooError>> {
        // `None` once the server end hung up.
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), TabooError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ── MockServer ──────────────────────────────────────────────────────

/// Server end of one mock connection.
pub struct MockServer {
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl MockServer {
    /// Next frame the client sent, parsed as JSON.
    pub async fn expect_sent(&mut self) -> Value {
        let text = self
            .from_client
            .recv()
            .await
            .expect("client end dropped before sending");
        serde_json::from_str(&text).expect("client sent invalid JSON")
    }

    /// `true` if the client has sent nothing further so far.
    pub fn nothing_sent(&mut self) -> bool {
        self.from_client.try_recv().is_err()
    }

    pub fn push(&self, frame: Value) {
        self.push_raw(frame.to_string());
    }

    pub fn push_raw(&self, text: impl Into<String>) {
        if let Some(tx) = &self.to_client {
            tx.send(text.into()).expect("client end dropped");
        }
    }

    /// Close the connection from the server side.
    pub fn hang_up(&mut self) {
        self.to_client = None;
    }

    /// Whether the client called `close()` on its end.
    pub fn closed_by_client(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ── MockConnector ───────────────────────────────────────────────────

struct Shared {
    attempts: AtomicUsize,
    delay: Duration,
    servers: mpsc::UnboundedSender<MockServer>,
}

/// Connector that opens a fresh channel pair per attempt. Clones share the
/// attempt counter.
#[derive(Clone)]
pub struct MockConnector {
    shared: Arc<Shared>,
}

impl MockConnector {
    /// Returns the connector and a receiver yielding the server end of every
    /// connection it opens.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MockServer>) {
        Self::with_delay(Duration::ZERO)
    }

    /// Like [`new`](Self::new) but every attempt takes `delay` to complete.
    pub fn with_delay(delay: Duration) -> (Self, mpsc::UnboundedReceiver<MockServer>) {
        let (servers, servers_rx) = mpsc::unbounded_channel();
        let connector = Self {
            shared: Arc::new(Shared {
                attempts: AtomicUsize::new(0),
                delay,
                servers,
            }),
        };
        (connector, servers_rx)
    }

    pub fn attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, _url: &str) -> Result<MockTransport, TabooError> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.shared.delay.is_zero() {
            tokio::time::sleep(self.shared.delay).await;
        }
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let server = MockServer {
            to_client: Some(to_client),
            from_client,
            closed: Arc::clone(&closed),
        };
        self.shared
            .servers
            .send(server)
            .map_err(|_| TabooError::TransportClosed)?;
        Ok(MockTransport {
            incoming,
            outgoing,
            closed,
        })
    }
}

// ── JSON helper functions ───────────────────────────────────────────

pub fn connect_ack(player_id: &str, token: &str, name: &str) -> Value {
    json!({"type": "connect_ack", "playerId": player_id, "sessionToken": token, "name": name})
}

pub fn player_joined(player_id: &str, name: &str) -> Value {
    json!({"type": "player_joined", "playerId": player_id, "name": name})
}

pub fn team_changed(player_id: &str, team: i8) -> Value {
    json!({"type": "team_changed", "playerId": player_id, "team": team})
}

pub fn game_state_changed(state: u8) -> Value {
    json!({"type": "game_state_changed", "state": state})
}

pub fn round_setup(team: i8, guesser_id: &str, hint_giver_id: &str, duration: u32) -> Value {
    json!({
        "type": "round_setup",
        "team": team,
        "guesserId": guesser_id,
        "hintGiverId": hint_giver_id,
        "duration": duration,
        "words": [
            {"id": 1, "word": "apple", "taboo": ["fruit", "red", "tree"]},
            {"id": 2, "word": "river", "taboo": ["water", "flow", "bank"]}
        ]
    })
}

pub fn round_started() -> Value {
    json!({"type": "round_started"})
}

pub fn word_guessed(player_id: &str, red_score: u32, blue_score: u32) -> Value {
    json!({"type": "word_guessed", "playerId": player_id, "redScore": red_score, "blueScore": blue_score})
}

pub fn game_ended(red_score: u32, blue_score: u32) -> Value {
    json!({"type": "game_ended", "redScore": red_score, "blueScore": blue_score})
}
