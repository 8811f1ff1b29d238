//! # Taboo Client
//!
//! Connection and game-state synchronization engine for the Taboo
//! word-guessing game.
//!
//! The crate owns the single live connection to a Taboo server, reconnects it
//! on its own, resumes an interrupted session with a durable token, and keeps
//! a local mirror of the roster, the round and the countdown in step with the
//! server's announcements. Rendering is left to the embedding application,
//! which reads snapshots and events and sends intents.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Connector`] and [`Transport`] for any backend
//! - **Self-healing**: fixed-delay reconnect, forever, with session resume
//! - **WebSocket built-in**: the default `transport-websocket` feature provides
//!   `WebSocketConnector`
//! - **Observable**: `tokio::sync::watch` snapshots plus typed [`TabooEvent`]s
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use taboo_client::{FileSessionStore, TabooClient, TabooConfig, TabooEvent, WebSocketConnector};
//!
//! # async fn example() {
//! let url = TabooConfig::websocket_url(false, "localhost:8081", "/ws");
//! let config = TabooConfig::new(url).with_player_name("Ada");
//! let store = FileSessionStore::new("taboo-session.json");
//! let (mut client, mut events) = TabooClient::start(WebSocketConnector::new(), config, store);
//!
//! let round = client.round();
//! while let Some(event) = events.recv().await {
//!     if let TabooEvent::WordGuessed { .. } = event {
//!         let snapshot = round.borrow();
//!         println!("red {} : blue {}", snapshot.red_score, snapshot.blue_score);
//!     }
//! }
//! client.shutdown().await;
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod countdown;
pub mod dispatch;
pub mod error;
pub mod error_codes;
pub mod event;
pub mod protocol;
pub mod roster;
pub mod round;
pub mod session;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use client::{TabooClient, TabooConfig};
pub use countdown::CountdownSnapshot;
pub use error::TabooError;
pub use error_codes::ErrorCode;
pub use event::{ConnectionState, TabooEvent};
pub use protocol::{ClientMessage, GameState, PlayerId, ServerMessage, Team, Word};
pub use roster::{RosterEntry, RosterSnapshot};
pub use round::RoundSnapshot;
pub use session::{FileSessionStore, MemorySessionStore, SessionIdentity, SessionStore};
pub use transport::{Connector, Transport};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
