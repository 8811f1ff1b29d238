//! Concrete [`Transport`](crate::Transport) implementations, each behind a
//! Cargo feature:
//!
//! | Feature                | Connector / transport                           |
//! |------------------------|-------------------------------------------------|
//! | `transport-websocket`  | [`WebSocketConnector`] / [`WebSocketTransport`] |

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};
