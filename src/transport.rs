//! Transport abstraction for the Taboo protocol.
//!
//! The [`Transport`] trait is a bidirectional text message channel between the
//! client and server. Every call to [`send`](Transport::send) carries one JSON
//! frame and every call to [`recv`](Transport::recv) yields one.
//!
//! # Connection Setup
//!
//! Because the client reconnects on its own, it does not take a connected
//! transport but a [`Connector`]: a factory that opens a fresh transport for
//! every (re)connect attempt.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use taboo_client::error::TabooError;
//! use taboo_client::transport::{Connector, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), TabooError> {
//!         // Send the JSON text frame over your transport
//!         Ok(())
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, TabooError>> {
//!         // Receive the next JSON text frame
//!         // Return None when the connection is closed cleanly
//!         None
//!     }
//!
//!     async fn close(&mut self) -> Result<(), TabooError> {
//!         Ok(())
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     type Transport = MyTransport;
//!
//!     async fn connect(&self, url: &str) -> Result<MyTransport, TabooError> {
//!         Ok(MyTransport {})
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::TabooError;

/// A bidirectional text message transport.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it is used
/// inside `tokio::select!`. If `recv` is cancelled before completion, calling it
/// again must not lose data. Channel-based implementations (e.g., wrapping
/// `mpsc::Receiver`) are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`TabooError::TransportSend`] if the message could not be sent
    /// (e.g., connection broken, write buffer full).
    async fn send(&mut self, message: String) -> Result<(), TabooError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: a transport error occurred (e.g., [`TabooError::TransportReceive`])
    /// - `None`: the connection was closed cleanly by the server
    ///
    /// # Cancel Safety
    ///
    /// This method **MUST** be cancel-safe (see [trait documentation](Transport)).
    async fn recv(&mut self) -> Option<Result<String, TabooError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations should
    /// still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<(), TabooError>;
}

/// Opens transports to a server endpoint.
///
/// The client calls [`connect`](Connector::connect) once per connection
/// attempt and never holds more than one transport at a time.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport produced by this connector.
    type Transport: Transport;

    /// Open a new connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established. The client
    /// treats this like a dropped connection and retries after its backoff.
    async fn connect(&self, url: &str) -> Result<Self::Transport, TabooError>;
}
