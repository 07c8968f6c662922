//! Transport abstraction for the session push channel.
//!
//! The [`Transport`] trait is a bidirectional text message channel between
//! the client and the scoring service. Push frames are JSON text, so every
//! implementation handles message framing internally.
//!
//! # Connection Setup
//!
//! Opening a transport is the job of a [`Connector`], which turns a
//! session-scoped push URL into a connected [`Transport`]. The
//! [`RemoteApp`](crate::RemoteApp) asks its connector for exactly one
//! transport per successful join.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use pickleball_remote::error::RemoteError;
//! use pickleball_remote::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), RemoteError> {
//!         // Send the JSON text frame
//!         unimplemented!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, RemoteError>> {
//!         // Receive the next JSON text frame, `None` on clean close
//!         unimplemented!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), RemoteError> {
//!         unimplemented!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::RemoteError;

/// A bidirectional text message transport for the push channel.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON frame.
/// Each call to [`recv`](Transport::recv) returns one complete JSON frame.
///
/// # Object Safety
///
/// This trait is object-safe, so `Box<dyn Transport>` works for dynamic
/// dispatch and itself implements [`Transport`].
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because it is used
/// inside `tokio::select!`. If `recv` is cancelled before completion, calling
/// it again must not lose data.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::TransportSend`] if the frame could not be sent,
    /// or [`RemoteError::TransportClosed`] after [`close`](Transport::close).
    async fn send(&mut self, message: String) -> Result<(), RemoteError>;

    /// Receive the next JSON text frame from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete frame was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the connection was closed cleanly
    async fn recv(&mut self) -> Option<Result<String, RemoteError>>;

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations still
    /// release their resources in that case.
    async fn close(&mut self) -> Result<(), RemoteError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&mut self, message: String) -> Result<(), RemoteError> {
        (**self).send(message).await
    }

    async fn recv(&mut self) -> Option<Result<String, RemoteError>> {
        (**self).recv().await
    }

    async fn close(&mut self) -> Result<(), RemoteError> {
        (**self).close().await
    }
}

/// Opens push-channel transports.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport this connector produces.
    type Transport: Transport;

    /// Connect to the session-scoped push URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established. The caller
    /// does not retry.
    async fn connect(&self, url: &str) -> Result<Self::Transport, RemoteError>;
}
