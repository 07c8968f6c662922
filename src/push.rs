//! Session-scoped push channel.
//!
//! [`PushChannel`] is a thin handle that talks to a background loop task over
//! an unbounded MPSC channel. The loop owns the [`Transport`], decodes
//! inbound frames into [`InboundMessage`]s and emits them as [`PushEvent`]s
//! on a bounded channel returned from [`PushChannel::open`].
//!
//! There is no reconnect: once the transport closes or fails, the channel
//! stays closed and a final [`PushEvent::Closed`] is delivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::config::RemoteConfig;
use crate::error::{RemoteError, Result};
use crate::protocol::{InboundMessage, OutboundMessage};
use crate::transport::Transport;

/// Something that happened on the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// Synthetic first event once the loop is running.
    Opened,
    /// A decoded server push.
    Message(InboundMessage),
    /// A frame that could not be decoded. The channel stays open.
    Malformed {
        /// Decoder error.
        error: String,
        /// The offending frame.
        raw: String,
    },
    /// The channel is closed for good. Always the last event.
    Closed {
        /// Why, if known. `None` for a clean close by the server.
        reason: Option<String>,
    },
}

/// Handle to a running push channel.
pub struct PushChannel {
    /// Sender half of the command channel to the push loop.
    cmd_tx: mpsc::UnboundedSender<OutboundMessage>,
    /// Cleared by the push loop once the transport is gone.
    open: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl PushChannel {
    /// Start the push loop over a connected `transport`.
    ///
    /// Returns the handle and the receiver of [`PushEvent`]s. The receiver
    /// yields `None` once the loop has exited.
    #[must_use = "the event receiver must be used to receive push events"]
    pub fn open(
        transport: impl Transport,
        config: &RemoteConfig,
    ) -> (Self, mpsc::Receiver<PushEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        // tokio panics on a zero-capacity channel.
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<PushEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let open = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(push_loop(
            transport,
            cmd_rx,
            event_tx,
            Arc::clone(&open),
            shutdown_rx,
        ));

        let channel = Self {
            cmd_tx,
            open,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (channel, event_rx)
    }

    /// Returns `true` while the transport is believed to be open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Queue `msg` for the push loop. Returns once queued.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotConnected`] if the channel has closed.
    pub fn send(&self, msg: OutboundMessage) -> Result<()> {
        if !self.is_open() {
            return Err(RemoteError::NotConnected);
        }
        self.cmd_tx
            .send(msg)
            .map_err(|_| RemoteError::NotConnected)
    }

    /// Close the transport and stop the push loop.
    ///
    /// The loop gets `shutdown_timeout` to close gracefully and emit
    /// [`PushEvent::Closed`]; after that the task is aborted. A receiver that
    /// is kept but not read can hold the loop on a full queue until then;
    /// drop it first if the final event is not wanted.
    pub async fn shutdown(&mut self) {
        debug!("push channel: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("push loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("push loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("push loop aborted: {join_err}");
                    }
                }
            }
        }

        self.open.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for PushChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushChannel")
            .field("open", &self.is_open())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        // No executor to drive a graceful close from here.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Push loop ───────────────────────────────────────────────────────

/// Background loop multiplexing outbound sends and inbound frames.
///
/// Exits when the command channel closes, on shutdown, when the transport
/// returns `None`, or on a transport error.
async fn push_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    event_tx: mpsc::Sender<PushEvent>,
    open: Arc<AtomicBool>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("push loop started");
    emit_event(&event_tx, PushEvent::Opened);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(msg) = cmd else {
                    debug!("command channel closed, shutting down push loop");
                    let _ = transport.close().await;
                    emit_closed(&event_tx, &open, Some("client shut down".into())).await;
                    break;
                };
                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        debug!(frame = %json, "sending push frame");
                        if let Err(e) = transport.send(json).await {
                            error!("push send error: {e}");
                            emit_closed(&event_tx, &open, Some(format!("transport send error: {e}"))).await;
                            break;
                        }
                    }
                    Err(e) => error!("failed to serialize outbound message: {e}"),
                }
            }

            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_closed(&event_tx, &open, Some("client shut down".into())).await;
                break;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match InboundMessage::decode(&text) {
                        Ok(msg) => {
                            debug!(kind = msg.kind(), "push message received");
                            emit_event(&event_tx, PushEvent::Message(msg));
                        }
                        Err(e) => {
                            error!("malformed push frame: {e}; raw: {text}");
                            emit_event(&event_tx, PushEvent::Malformed {
                                error: e.to_string(),
                                raw: text,
                            });
                        }
                    },
                    Some(Err(e)) => {
                        error!("push receive error: {e}");
                        emit_closed(&event_tx, &open, Some(format!("transport receive error: {e}"))).await;
                        break;
                    }
                    None => {
                        debug!("push channel closed by server");
                        emit_closed(&event_tx, &open, None).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("push loop exited");
}

/// Emit without blocking the loop. A full channel drops the event.
fn emit_event(event_tx: &mpsc::Sender<PushEvent>, event: PushEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("push event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("push event channel closed, receiver dropped");
        }
    }
}

/// Mark the channel closed and deliver [`PushEvent::Closed`].
///
/// Waits for capacity instead of dropping: `Closed` is always the last event
/// and must arrive.
async fn emit_closed(event_tx: &mpsc::Sender<PushEvent>, open: &AtomicBool, reason: Option<String>) {
    open.store(false, Ordering::Release);
    if event_tx.send(PushEvent::Closed { reason }).await.is_err() {
        debug!("push event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::{ScoreUpdatePayload, Side};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// Records sent frames and replays scripted inbound frames.
    struct MockTransport {
        incoming: VecDeque<Option<std::result::Result<String, RemoteError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(
            incoming: Vec<Option<std::result::Result<String, RemoteError>>>,
        ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                incoming: VecDeque::from(incoming),
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            };
            (transport, sent, closed)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), RemoteError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, RemoteError>> {
            match self.incoming.pop_front() {
                // `None` entries script a clean close.
                Some(item) => item,
                // Script exhausted: stay alive until shutdown.
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> std::result::Result<(), RemoteError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    fn config() -> RemoteConfig {
        RemoteConfig::new("http://127.0.0.1:8001")
            .unwrap()
            .with_shutdown_timeout(Duration::from_millis(200))
    }

    fn score_frame(score_a: u32) -> String {
        serde_json::json!({ "type": "score_update", "data": { "scoreA": score_a } }).to_string()
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn opened_is_first_event() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut channel, mut events) = PushChannel::open(transport, &config());

        assert_eq!(events.recv().await.unwrap(), PushEvent::Opened);
        assert!(channel.is_open());

        channel.shutdown().await;
    }

    #[tokio::test]
    async fn inbound_frames_are_decoded_in_order() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok(score_frame(1))),
            Some(Ok(score_frame(2))),
        ]);
        let (mut channel, mut events) = PushChannel::open(transport, &config());

        let _ = events.recv().await; // Opened
        for expected in [1, 2] {
            match events.recv().await.unwrap() {
                PushEvent::Message(InboundMessage::ScoreUpdate(payload)) => {
                    assert_eq!(payload.score_a, expected);
                }
                other => panic!("expected ScoreUpdate, got {other:?}"),
            }
        }

        channel.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_frame_does_not_close_channel() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok("{not json".into())),
            Some(Ok(score_frame(5))),
        ]);
        let (mut channel, mut events) = PushChannel::open(transport, &config());

        let _ = events.recv().await; // Opened
        let event = events.recv().await.unwrap();
        assert!(
            matches!(&event, PushEvent::Malformed { raw, .. } if raw == "{not json"),
            "got {event:?}"
        );
        let event = events.recv().await.unwrap();
        assert!(matches!(event, PushEvent::Message(_)));
        assert!(channel.is_open());

        channel.shutdown().await;
    }

    #[tokio::test]
    async fn send_writes_flat_score_update_frame() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (mut channel, mut events) = PushChannel::open(transport, &config());
        let _ = events.recv().await; // Opened

        channel
            .send(OutboundMessage::ScoreUpdate {
                score_a: 3,
                score_b: 1,
                server: Side::B,
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let frames = sent.lock().unwrap();
            assert_eq!(frames.len(), 1);
            let value: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
            assert_eq!(
                value,
                serde_json::json!({ "type": "score_update", "scoreA": 3, "scoreB": 1, "server": "B" })
            );
        }

        channel.shutdown().await;
    }

    #[tokio::test]
    async fn clean_close_emits_closed_without_reason() {
        let (transport, _sent, _closed) = MockTransport::new(vec![None]);
        let (mut channel, mut events) = PushChannel::open(transport, &config());

        let _ = events.recv().await; // Opened
        assert_eq!(
            events.recv().await.unwrap(),
            PushEvent::Closed { reason: None }
        );
        assert!(!channel.is_open());
        assert!(events.recv().await.is_none());

        channel.shutdown().await;
    }

    #[tokio::test]
    async fn receive_error_emits_closed_with_reason() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Err(
            RemoteError::TransportReceive("boom".into()),
        ))]);
        let (mut channel, mut events) = PushChannel::open(transport, &config());

        let _ = events.recv().await; // Opened
        match events.recv().await.unwrap() {
            PushEvent::Closed { reason } => assert!(reason.unwrap().contains("boom")),
            other => panic!("expected Closed, got {other:?}"),
        }

        channel.shutdown().await;
    }

    #[tokio::test]
    async fn send_after_close_is_not_connected() {
        let (transport, _sent, _closed) = MockTransport::new(vec![None]);
        let (mut channel, mut events) = PushChannel::open(transport, &config());

        while let Some(event) = events.recv().await {
            if matches!(event, PushEvent::Closed { .. }) {
                break;
            }
        }
        let err = channel
            .send(OutboundMessage::ScoreUpdate {
                score_a: 1,
                score_b: 0,
                server: Side::A,
            })
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotConnected));

        channel.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_transport_and_emits_closed() {
        let (transport, _sent, closed) = MockTransport::new(vec![]);
        let (mut channel, mut events) = PushChannel::open(transport, &config());
        let _ = events.recv().await; // Opened

        channel.shutdown().await;

        assert!(closed.load(Ordering::Acquire));
        assert!(!channel.is_open());
        assert!(matches!(
            events.recv().await.unwrap(),
            PushEvent::Closed { .. }
        ));
    }

    #[tokio::test]
    async fn unrecognized_type_is_delivered_not_dropped() {
        let frame = serde_json::json!({ "type": "heartbeat", "data": {} }).to_string();
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(frame))]);
        let (mut channel, mut events) = PushChannel::open(transport, &config());

        let _ = events.recv().await; // Opened
        assert_eq!(
            events.recv().await.unwrap(),
            PushEvent::Message(InboundMessage::Unrecognized {
                kind: "heartbeat".into()
            })
        );

        channel.shutdown().await;
    }

    #[tokio::test]
    async fn full_event_channel_drops_messages_but_not_closed() {
        let mut incoming: Vec<Option<std::result::Result<String, RemoteError>>> =
            (0..20).map(|n| Some(Ok(score_frame(n)))).collect();
        incoming.push(None);
        let (transport, _sent, _closed) = MockTransport::new(incoming);

        let config = config().with_event_channel_capacity(1);
        let (mut channel, mut events) = PushChannel::open(transport, &config);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut received = Vec::new();
        while let Some(event) = events.recv().await {
            received.push(event);
        }
        assert!(received.len() < 22, "expected drops, got {}", received.len());
        assert!(matches!(
            received.last(),
            Some(PushEvent::Closed { reason: None })
        ));

        channel.shutdown().await;
    }

    /// Transport whose `close()` never returns.
    struct HangingCloseTransport {
        dropped: Arc<AtomicBool>,
    }

    impl Drop for HangingCloseTransport {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::Release);
        }
    }

    #[async_trait]
    impl Transport for HangingCloseTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), RemoteError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, RemoteError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), RemoteError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn shutdown_timeout_aborts_stuck_loop() {
        let dropped = Arc::new(AtomicBool::new(false));
        let transport = HangingCloseTransport {
            dropped: Arc::clone(&dropped),
        };
        let config = config().with_shutdown_timeout(Duration::from_millis(20));
        let (mut channel, mut events) = PushChannel::open(transport, &config);
        let _ = events.recv().await; // Opened

        channel.shutdown().await;

        assert!(dropped.load(Ordering::Acquire));
        assert!(!channel.is_open());
    }

    #[tokio::test]
    async fn boxed_transport_works() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(score_frame(7)))]);
        let boxed: Box<dyn Transport> = Box::new(transport);
        let (mut channel, mut events) = PushChannel::open(boxed, &config());

        let _ = events.recv().await; // Opened
        assert_eq!(
            events.recv().await.unwrap(),
            PushEvent::Message(InboundMessage::ScoreUpdate(ScoreUpdatePayload {
                score_a: 7,
                ..ScoreUpdatePayload::default()
            }))
        );

        channel.shutdown().await;
    }
}
