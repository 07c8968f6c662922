//! # Pickleball Remote
//!
//! Async remote-control client for a live pickleball scoreboard.
//!
//! The client joins a scoring *session* hosted by a remote service, mirrors
//! the session's game state onto a display surface, applies optimistic point
//! changes, and reconciles with the state the server pushes back. All scoring
//! rules (set and match completion, serve rotation) live on the server.
//!
//! ## Features
//!
//! - **Pluggable edges**: [`SessionApi`] for the HTTP lifecycle calls,
//!   [`Transport`]/[`Connector`] for the push channel, [`Surface`] for display
//! - **Typed wire format**: inbound pushes decode into the closed
//!   [`InboundMessage`] enum with defaults filled in at the boundary
//! - **Batteries included**: `transport-websocket` provides
//!   [`WebSocketConnector`], `http-reqwest` provides [`HttpSessionApi`]
//!   (both on by default)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), pickleball_remote::RemoteError> {
//! use pickleball_remote::{
//!     HttpSessionApi, MemorySurface, RemoteApp, RemoteConfig, ScoreAction, Side,
//!     WebSocketConnector,
//! };
//!
//! let config = RemoteConfig::new("http://localhost:8001")?;
//! let api = HttpSessionApi::new(config.clone());
//! let mut app = RemoteApp::new(config, api, WebSocketConnector::new(), MemorySurface::new());
//!
//! app.join("ABC123").await?;
//! app.update_score(Side::A, ScoreAction::Add);
//!
//! while let Some(event) = app.recv_push().await {
//!     app.handle_push_event(event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod error;
#[cfg(feature = "http-reqwest")]
pub mod http;
pub mod protocol;
pub mod push;
pub mod state;
pub mod transport;
pub mod transports;
pub mod view;

// Re-export primary types for ergonomic imports.
pub use api::SessionApi;
pub use app::RemoteApp;
pub use config::RemoteConfig;
pub use error::RemoteError;
#[cfg(feature = "http-reqwest")]
pub use http::HttpSessionApi;
pub use protocol::{InboundMessage, OutboundMessage, Side};
pub use push::{PushChannel, PushEvent};
pub use state::{GameState, ScoreAction};
pub use transport::{Connector, Transport};
#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
pub use view::{Element, MemorySurface, ScoreView, Surface};
