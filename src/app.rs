//! The remote session client.
//!
//! [`RemoteApp`] is the application context: it owns the [`GameState`], the
//! display [`Surface`], the session API and the push channel, and composes
//! them into the join → score → reconcile flow.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = RemoteConfig::from_env()?;
//! let api = HttpSessionApi::new(config.clone());
//! let mut app = RemoteApp::new(config, api, WebSocketConnector::new(), MemorySurface::new());
//!
//! app.join("ABC123").await?;
//! app.update_score(Side::A, ScoreAction::Add);
//!
//! while let Some(event) = app.recv_push().await {
//!     app.handle_push_event(event);
//! }
//! ```

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::SessionApi;
use crate::config::RemoteConfig;
use crate::error::{RemoteError, Result};
use crate::protocol::{
    EndSetRequest, EndSetResponse, InboundMessage, MatchCompletePayload, NewSetResponse,
    SetCompletePayload, Side,
};
use crate::push::{PushChannel, PushEvent};
use crate::state::{GameState, ScoreAction};
use crate::transport::Connector;
use crate::view::{render_view, show_scoring, ScoreView, Surface};

/// Remote-control client for one scoreboard session.
///
/// All methods take `&mut self`, so the state is only ever touched by one
/// caller at a time. Pushes and HTTP responses are applied in the order the
/// caller hands them in; the last write wins.
pub struct RemoteApp<A, C, S> {
    config: RemoteConfig,
    api: A,
    connector: C,
    surface: S,
    session_id: Option<String>,
    state: Option<GameState>,
    push: Option<PushChannel>,
    push_events: Option<mpsc::Receiver<PushEvent>>,
}

impl<A, C, S> RemoteApp<A, C, S>
where
    A: SessionApi,
    C: Connector,
    S: Surface,
{
    /// Create a client that has not joined any session yet.
    pub fn new(config: RemoteConfig, api: A, connector: C, surface: S) -> Self {
        Self {
            config,
            api,
            connector,
            surface,
            session_id: None,
            state: None,
            push: None,
            push_events: None,
        }
    }

    // ── Session join ────────────────────────────────────────────────

    /// Join the session named by `input` (surrounding whitespace ignored).
    ///
    /// On success the state is replaced by the server snapshot, the scoring
    /// section is shown and rendered, and one push channel is opened. A push
    /// connection failure is logged and does not fail the join.
    ///
    /// # Errors
    ///
    /// - [`RemoteError::EmptySessionId`] if `input` is blank.
    /// - [`RemoteError::Api`] if the server did not report success.
    /// - Any transport or decode error of the request.
    ///
    /// Every failure is also shown to the user, and leaves the previous
    /// state and push channel untouched.
    pub async fn join(&mut self, input: &str) -> Result<()> {
        let session_id = input.trim();
        if session_id.is_empty() {
            self.surface.alert("Session join failed: empty session id");
            return Err(RemoteError::EmptySessionId);
        }
        debug!(session_id, "joining session");

        let response = match self.api.join(session_id).await {
            Ok(response) => response,
            Err(e) => {
                error!(session_id, "join request failed: {e}");
                self.surface.alert(&format!("Connection error: {e}"));
                return Err(e);
            }
        };

        let snapshot = match response.into_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let message = match &e {
                    RemoteError::Api { message } => message.clone(),
                    other => other.to_string(),
                };
                warn!(session_id, "session join rejected: {message}");
                self.surface
                    .alert(&format!("Session join failed: {message}"));
                return Err(e);
            }
        };

        info!(session_id, "session joined");
        self.session_id = Some(session_id.to_string());
        self.state = Some(GameState::from_snapshot(session_id, snapshot));
        show_scoring(&mut self.surface);
        self.render();
        self.open_push_channel(session_id).await;
        Ok(())
    }

    /// Open the push channel for `session_id`, replacing any previous one.
    async fn open_push_channel(&mut self, session_id: &str) {
        if self.push.is_some() {
            debug!("closing push channel of previous join");
        }
        self.shutdown().await;

        let url = match self.config.push_url(session_id) {
            Ok(url) => url,
            Err(e) => {
                error!("cannot build push url: {e}");
                return;
            }
        };
        match self.connector.connect(url.as_str()).await {
            Ok(transport) => {
                let (channel, events) = PushChannel::open(transport, &self.config);
                self.push = Some(channel);
                self.push_events = Some(events);
            }
            Err(e) => error!(url = %url, "push channel connect failed: {e}"),
        }
    }

    // ── Local score mutation ────────────────────────────────────────

    /// Optimistically change the score of `side` and forward it.
    ///
    /// Renders immediately. If the push channel is open the new scores and
    /// serve are sent for the server to reconcile; otherwise the change stays
    /// local. Nothing is queued or retried.
    ///
    /// Returns `false` (and does nothing) when no session is joined.
    pub fn update_score(&mut self, side: Side, action: ScoreAction) -> bool {
        if self.session_id.is_none() {
            debug!("score change ignored: no session joined");
            return false;
        }
        let Some(state) = self.state.as_mut() else {
            debug!("score change ignored: no game state");
            return false;
        };

        let score = state.apply_score_action(side, action);
        let message = state.score_update_message();
        debug!(%side, ?action, score, "local score change");
        self.render();

        match self.push.as_ref() {
            Some(push) if push.is_open() => {
                if let Err(e) = push.send(message) {
                    warn!("score update not sent: {e}");
                }
            }
            _ => debug!("push channel not open, score update stays local"),
        }
        true
    }

    // ── Push handling ───────────────────────────────────────────────

    /// Wait for the next push event.
    ///
    /// Pending forever while no push channel is open, so this can sit in a
    /// `tokio::select!` next to user input. Returns `None` once, after the
    /// channel's final event has been consumed.
    pub async fn recv_push(&mut self) -> Option<PushEvent> {
        let Some(events) = self.push_events.as_mut() else {
            return std::future::pending().await;
        };
        let event = events.recv().await;
        if event.is_none() {
            self.push_events = None;
        }
        event
    }

    /// Apply one push-channel event.
    pub fn handle_push_event(&mut self, event: PushEvent) {
        match event {
            PushEvent::Opened => debug!("push channel open"),
            PushEvent::Message(msg) => self.handle_push_message(msg),
            PushEvent::Malformed { error, raw } => {
                error!("dropping malformed push frame: {error}; raw: {raw}");
            }
            PushEvent::Closed { reason } => {
                info!(
                    "push channel closed: {}",
                    reason.as_deref().unwrap_or("closed by server")
                );
            }
        }
    }

    /// Apply one decoded server push to the local state.
    pub fn handle_push_message(&mut self, msg: InboundMessage) {
        match msg {
            InboundMessage::ScoreUpdate(update) => {
                let Some(state) = self.state.as_mut() else {
                    debug!("score_update ignored: no game state");
                    return;
                };
                state.apply_score_update(&update);
                self.render();
            }
            InboundMessage::SetComplete(payload) => self.on_set_complete(&payload),
            InboundMessage::MatchComplete(payload) => self.on_match_complete(&payload),
            InboundMessage::Unrecognized { kind } => {
                debug!(kind = %kind, "ignoring unrecognized push message");
            }
        }
    }

    fn on_set_complete(&mut self, payload: &SetCompletePayload) {
        let Some(state) = self.state.as_mut() else {
            debug!("set_complete ignored: no game state");
            return;
        };
        state.apply_set_complete(payload);
        let winner = payload.set_winner.map_or("?", Side::as_str);
        let message = format!(
            "Satz beendet! Gewinner: Team {winner}\nStand: {}-{}",
            state.sets_won_a, state.sets_won_b
        );
        info!(current_set = state.current_set, "set complete");
        self.surface.alert(&message);
        self.render();
    }

    fn on_match_complete(&mut self, payload: &MatchCompletePayload) {
        let Some(state) = self.state.as_mut() else {
            debug!("match_complete ignored: no game state");
            return;
        };
        match payload.winner {
            Some(winner) => {
                state.mark_match_complete(winner);
                info!(%winner, "match complete");
            }
            None => warn!("match_complete without winner, match state left open"),
        }
        let winner = payload.winner.map_or("?", Side::as_str);
        let final_score = payload.final_score.as_deref().unwrap_or("?");
        self.surface.alert(&format!(
            "Match beendet!\nGewinner: Team {winner}\nEndstand: {final_score}"
        ));
    }

    // ── Set / match lifecycle ───────────────────────────────────────

    /// Declare `winner` of the set in progress.
    ///
    /// On success the authoritative set index and tally are applied, both
    /// scores reset to 0, the view is rendered and the user is told whether
    /// the set or the whole match ended.
    ///
    /// # Errors
    ///
    /// - [`RemoteError::NotJoined`] without a session (nothing is sent).
    /// - [`RemoteError::Api`] if the server did not report success.
    /// - Any transport or decode error of the request.
    ///
    /// On error the state is unchanged and, except for `NotJoined`, the user
    /// is notified.
    pub async fn end_current_set(&mut self, winner: Side) -> Result<EndSetResponse> {
        let session_id = self.session_id.clone().ok_or(RemoteError::NotJoined)?;

        let response = match self
            .api
            .end_set(&session_id, EndSetRequest { winner })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("error ending set: {e}");
                self.surface.alert("Fehler beim Beenden des Satzes");
                return Err(e);
            }
        };
        if !response.success {
            let message = response
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!("end-set rejected: {message}");
            self.surface
                .alert(&format!("Fehler beim Beenden des Satzes: {message}"));
            return Err(RemoteError::Api { message });
        }

        let Some(state) = self.state.as_mut() else {
            return Err(RemoteError::NotJoined);
        };
        // The set that ended is the one before the server's new index, or
        // the local one when the server does not send an index.
        let ended_set = response
            .current_set
            .map_or(state.current_set, |next| next.saturating_sub(1));
        state.apply_end_set(&response);
        let match_winner = state.match_winner();
        self.render();

        let message = match (response.match_complete, match_winner) {
            (true, Some(match_winner)) => format!("Match beendet! Gewinner: Team {match_winner}"),
            (true, None) => "Match beendet!".to_string(),
            (false, _) => format!("Satz {ended_set} beendet. Team {winner} gewinnt den Satz!"),
        };
        info!(%winner, match_complete = response.match_complete, "set ended");
        self.surface.alert(&message);
        Ok(response)
    }

    /// Ask the server to start a new set.
    ///
    /// On success both scores reset to 0, serve goes back to side A, the
    /// view is rendered and the user is told the new set number.
    ///
    /// # Errors
    ///
    /// Same as [`end_current_set`](Self::end_current_set).
    pub async fn start_new_set(&mut self) -> Result<NewSetResponse> {
        let session_id = self.session_id.clone().ok_or(RemoteError::NotJoined)?;

        let response = match self.api.new_set(&session_id).await {
            Ok(response) => response,
            Err(e) => {
                error!("error starting new set: {e}");
                self.surface.alert("Fehler beim Starten des neuen Satzes");
                return Err(e);
            }
        };
        if !response.success {
            let message = response
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!("new-set rejected: {message}");
            self.surface
                .alert(&format!("Fehler beim Starten des neuen Satzes: {message}"));
            return Err(RemoteError::Api { message });
        }

        let Some(state) = self.state.as_mut() else {
            return Err(RemoteError::NotJoined);
        };
        state.reset_for_new_set(response.current_set);
        let set_number = state.current_set;
        self.render();

        info!(set_number, "new set started");
        self.surface
            .alert(&format!("Neuer Satz {set_number} gestartet!"));
        Ok(response)
    }

    // ── Rendering & accessors ───────────────────────────────────────

    /// Project the current state onto the surface. No-op before a join.
    pub fn render(&mut self) {
        if let Some(state) = self.state.as_ref() {
            render_view(&mut self.surface, &ScoreView::project(state));
        }
    }

    /// Identifier of the joined session.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Local game state, once joined.
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// The display surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The display surface, mutably.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Whether a push channel is currently open.
    pub fn is_push_open(&self) -> bool {
        self.push.as_ref().is_some_and(PushChannel::is_open)
    }

    /// Gracefully close the push channel, if any.
    ///
    /// Pending push events are discarded. The event receiver is dropped
    /// first, so the loop never waits on a full queue nobody reads.
    pub async fn shutdown(&mut self) {
        self.push_events = None;
        if let Some(mut push) = self.push.take() {
            push.shutdown().await;
        }
    }
}

impl<A, C, S> std::fmt::Debug for RemoteApp<A, C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteApp")
            .field("session_id", &self.session_id)
            .field("state", &self.state)
            .field("push", &self.push)
            .finish_non_exhaustive()
    }
}
