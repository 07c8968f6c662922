//! Request/response boundary with the scoring service's HTTP API.
//!
//! Implementations return the parsed JSON body as-is. They do not interpret
//! `success`; that is left to [`RemoteApp`](crate::RemoteApp), so that an
//! application-level rejection stays distinguishable from a transport
//! failure.

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::protocol::{EndSetRequest, EndSetResponse, JoinResponse, NewSetResponse};

/// The three session lifecycle calls.
#[async_trait]
pub trait SessionApi: Send + Sync + 'static {
    /// `POST /api/session/{id}/join`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON of the
    /// expected shape.
    async fn join(&self, session_id: &str) -> Result<JoinResponse, RemoteError>;

    /// `POST /api/session/{id}/end-set` with `{ "winner": ... }`.
    ///
    /// # Errors
    ///
    /// Same as [`join`](SessionApi::join).
    async fn end_set(
        &self,
        session_id: &str,
        request: EndSetRequest,
    ) -> Result<EndSetResponse, RemoteError>;

    /// `POST /api/session/{id}/new-set` without a body.
    ///
    /// # Errors
    ///
    /// Same as [`join`](SessionApi::join).
    async fn new_set(&self, session_id: &str) -> Result<NewSetResponse, RemoteError>;
}
