#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for pickleball remote integration tests.
//!
//! Provides a channel-driven [`MockTransport`], a [`MockConnector`] that
//! records every push connection, a scripted [`MockApi`], and JSON helpers
//! for common push frames.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use pickleball_remote::protocol::{
    EndSetRequest, EndSetResponse, GameSnapshot, JoinResponse, NewSetResponse,
};
use pickleball_remote::{
    Connector, MemorySurface, PushEvent, RemoteApp, RemoteConfig, RemoteError, Side, Transport,
};
use tokio::sync::mpsc;

type Frame = Option<Result<String, RemoteError>>;

// ── MockTransport ───────────────────────────────────────────────────

/// A push transport fed by a [`PushHandle`].
///
/// Frames queued on the handle are returned by `recv()` in order. A queued
/// `None` scripts a clean close. Sent frames are recorded on the handle.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Frame>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), RemoteError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, RemoteError>> {
        match self.incoming.recv().await {
            Some(frame) => frame,
            // Handle dropped: stay quiet until shutdown.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), RemoteError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Test-side end of one [`MockTransport`].
#[derive(Clone)]
pub struct PushHandle {
    pub url: String,
    tx: mpsc::UnboundedSender<Frame>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl PushHandle {
    /// Deliver a text frame to the client.
    pub fn push(&self, frame: impl Into<String>) {
        self.tx.send(Some(Ok(frame.into()))).unwrap();
    }

    /// Close the connection from the server side.
    pub fn close(&self) {
        self.tx.send(None).unwrap();
    }

    /// Fail the connection with a receive error.
    pub fn fail(&self, reason: &str) {
        self.tx
            .send(Some(Err(RemoteError::TransportReceive(reason.into()))))
            .unwrap();
    }

    /// Frames the client has sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Sent frames parsed as JSON.
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    /// Wait until at least `count` frames were sent, or one second passed.
    pub async fn wait_for_sent(&self, count: usize) -> Vec<serde_json::Value> {
        for _ in 0..100 {
            if self.sent.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent_json()
    }

    /// Whether the client closed the transport.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// Connector handing out [`MockTransport`]s and recording each connection.
#[derive(Clone, Default)]
pub struct MockConnector {
    connections: Arc<StdMutex<Vec<PushHandle>>>,
    refuse: Arc<AtomicBool>,
}

impl MockConnector {
    /// Make subsequent connection attempts fail.
    pub fn refuse_connections(&self) {
        self.refuse.store(true, Ordering::Release);
    }

    /// Every connection opened so far, oldest first.
    pub fn connections(&self) -> Vec<PushHandle> {
        self.connections.lock().unwrap().clone()
    }

    /// The most recent connection.
    pub fn last(&self) -> PushHandle {
        self.connections()
            .pop()
            .expect("no push connection was opened")
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, url: &str) -> Result<MockTransport, RemoteError> {
        if self.refuse.load(Ordering::Acquire) {
            return Err(RemoteError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            )));
        }
        let (tx, incoming) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        self.connections.lock().unwrap().push(PushHandle {
            url: url.to_string(),
            tx,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        });
        Ok(MockTransport {
            incoming,
            sent,
            closed,
        })
    }
}

// ── MockApi ─────────────────────────────────────────────────────────

/// A recorded session API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Join(String),
    EndSet(String, Side),
    NewSet(String),
}

#[derive(Default)]
struct Script {
    join: VecDeque<Result<JoinResponse, RemoteError>>,
    end_set: VecDeque<Result<EndSetResponse, RemoteError>>,
    new_set: VecDeque<Result<NewSetResponse, RemoteError>>,
    calls: Vec<ApiCall>,
}

/// Session API answering from scripted responses.
///
/// Clones share the script, so a test keeps one clone to script and inspect
/// while the app owns another. An unscripted call fails with
/// [`RemoteError::Http`].
#[derive(Clone, Default)]
pub struct MockApi {
    script: Arc<StdMutex<Script>>,
}

impl MockApi {
    pub fn script_join(&self, response: Result<JoinResponse, RemoteError>) {
        self.script.lock().unwrap().join.push_back(response);
    }

    pub fn script_end_set(&self, response: Result<EndSetResponse, RemoteError>) {
        self.script.lock().unwrap().end_set.push_back(response);
    }

    pub fn script_new_set(&self, response: Result<NewSetResponse, RemoteError>) {
        self.script.lock().unwrap().new_set.push_back(response);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.script.lock().unwrap().calls.clone()
    }
}

fn unscripted<T>() -> Result<T, RemoteError> {
    Err(RemoteError::Http("no scripted response".into()))
}

#[async_trait]
impl pickleball_remote::SessionApi for MockApi {
    async fn join(&self, session_id: &str) -> Result<JoinResponse, RemoteError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(ApiCall::Join(session_id.to_string()));
        script.join.pop_front().unwrap_or_else(unscripted)
    }

    async fn end_set(
        &self,
        session_id: &str,
        request: EndSetRequest,
    ) -> Result<EndSetResponse, RemoteError> {
        let mut script = self.script.lock().unwrap();
        script
            .calls
            .push(ApiCall::EndSet(session_id.to_string(), request.winner));
        script.end_set.pop_front().unwrap_or_else(unscripted)
    }

    async fn new_set(&self, session_id: &str) -> Result<NewSetResponse, RemoteError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(ApiCall::NewSet(session_id.to_string()));
        script.new_set.pop_front().unwrap_or_else(unscripted)
    }
}

// ── App helpers ─────────────────────────────────────────────────────

pub type TestApp = RemoteApp<MockApi, MockConnector, MemorySurface>;

/// Config pointing at a fake host, with a short shutdown timeout.
pub fn test_config() -> RemoteConfig {
    RemoteConfig::new("http://scores.test:8001")
        .unwrap()
        .with_shutdown_timeout(Duration::from_millis(200))
}

/// A fresh, unjoined app plus the test-side handles of its collaborators.
pub fn start_app() -> (TestApp, MockApi, MockConnector) {
    start_app_with(test_config())
}

/// Like [`start_app`], with a custom config.
pub fn start_app_with(config: RemoteConfig) -> (TestApp, MockApi, MockConnector) {
    let api = MockApi::default();
    let connector = MockConnector::default();
    let app = RemoteApp::new(
        config,
        api.clone(),
        connector.clone(),
        MemorySurface::new(),
    );
    (app, api, connector)
}

/// The snapshot used by the reference scenario: 0:0, Red vs Blue, A serving.
pub fn red_blue_snapshot() -> GameSnapshot {
    serde_json::from_value(serde_json::json!({
        "scoreA": 0,
        "scoreB": 0,
        "teamA": "Red",
        "teamB": "Blue",
        "server": "A"
    }))
    .unwrap()
}

pub fn join_ok(snapshot: GameSnapshot) -> Result<JoinResponse, RemoteError> {
    Ok(JoinResponse {
        success: true,
        session: Some(snapshot),
        error: None,
    })
}

/// An app joined to `ABC123` with the red/blue snapshot, and its push handle.
pub async fn joined_app() -> (TestApp, MockApi, MockConnector, PushHandle) {
    let (mut app, api, connector) = start_app();
    api.script_join(join_ok(red_blue_snapshot()));
    app.join("ABC123").await.unwrap();
    let push = connector.last();
    (app, api, connector, push)
}

/// Receive push events until a non-`Opened` one arrives, apply it and return
/// it. Panics after one second.
pub async fn apply_next_push(app: &mut TestApp) -> PushEvent {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let event = app.recv_push().await.expect("push channel ended");
            if event == PushEvent::Opened {
                continue;
            }
            app.handle_push_event(event.clone());
            return event;
        }
    })
    .await
    .expect("timed out waiting for push event")
}

// ── JSON helpers ────────────────────────────────────────────────────

pub fn score_update_json(data: serde_json::Value) -> String {
    serde_json::json!({ "type": "score_update", "data": data }).to_string()
}

pub fn set_complete_json(data: serde_json::Value) -> String {
    serde_json::json!({ "type": "set_complete", "data": data }).to_string()
}

pub fn match_complete_json(winner: &str, final_score: &str) -> String {
    serde_json::json!({
        "type": "match_complete",
        "data": { "winner": winner, "final_score": final_score }
    })
    .to_string()
}
