//! [`SessionApi`] over HTTP using `reqwest`.
//!
//! Only available with the `http-reqwest` feature (on by default).

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::api::SessionApi;
use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::protocol::{EndSetRequest, EndSetResponse, JoinResponse, NewSetResponse};

/// HTTP client for the scoring service's session endpoints.
///
/// Response bodies are parsed as JSON whatever the HTTP status. The server
/// reports failures through `success`/`error`, not through status codes.
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpSessionApi {
    /// Create a client for the API described by `config`.
    pub fn new(config: RemoteConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, config: RemoteConfig) -> Self {
        Self { client, config }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        session_id: &str,
        action: &str,
        body: Option<&EndSetRequest>,
    ) -> Result<T, RemoteError> {
        let url = self.config.api_url(session_id, action)?;
        tracing::debug!(url = %url, "session api request");

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        tracing::debug!(%status, action, "session api response");

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn join(&self, session_id: &str) -> Result<JoinResponse, RemoteError> {
        self.post(session_id, "join", None).await
    }

    async fn end_set(
        &self,
        session_id: &str,
        request: EndSetRequest,
    ) -> Result<EndSetResponse, RemoteError> {
        self.post(session_id, "end-set", Some(&request)).await
    }

    async fn new_set(&self, session_id: &str) -> Result<NewSetResponse, RemoteError> {
        self.post(session_id, "new-set", None).await
    }
}

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
    use crate::protocol::Side;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One captured HTTP request.
    #[derive(Debug)]
    struct Captured {
        head: String,
        body: String,
    }

    /// Serve exactly one HTTP request with `status` and `body`, then report
    /// what was received.
    async fn start_mock_api(
        status: &'static str,
        body: &'static str,
    ) -> (RemoteConfig, tokio::sync::oneshot::Receiver<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (captured_tx, captured_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (mut tcp, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0_u8; 1024];
            let head_end = loop {
                let n = tcp.read(&mut chunk).await.unwrap();
                assert!(n > 0, "client hung up mid-request");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            while buf.len() < head_end + content_length {
                let n = tcp.read(&mut chunk).await.unwrap();
                assert!(n > 0, "client hung up mid-body");
                buf.extend_from_slice(&chunk[..n]);
            }
            let body_in =
                String::from_utf8_lossy(&buf[head_end..head_end + content_length]).to_string();

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            tcp.write_all(response.as_bytes()).await.unwrap();
            tcp.shutdown().await.unwrap();
            let _ = captured_tx.send(Captured {
                head,
                body: body_in,
            });
        });

        let config = RemoteConfig::new(&format!("http://{addr}")).unwrap();
        (config, captured_rx)
    }

    #[tokio::test]
    async fn join_posts_json_and_parses_snapshot() {
        let (config, captured) = start_mock_api(
            "200 OK",
            r#"{"success":true,"session":{"scoreA":2,"scoreB":1,"teamA":"Red","server":"B"}}"#,
        )
        .await;
        let api = HttpSessionApi::new(config);

        let response = api.join("ABC123").await.unwrap();
        assert!(response.success);
        let snapshot = response.session.unwrap();
        assert_eq!(snapshot.score_a, 2);
        assert_eq!(snapshot.server, Side::B);

        let captured = captured.await.unwrap();
        assert!(captured
            .head
            .starts_with("POST /api/session/ABC123/join HTTP/1.1"));
        assert!(captured
            .head
            .to_ascii_lowercase()
            .contains("content-type: application/json"));
        assert!(captured.body.is_empty());
    }

    #[tokio::test]
    async fn end_set_sends_winner_body() {
        let (config, captured) = start_mock_api(
            "200 OK",
            r#"{"success":true,"current_set":2,"sets_won_A":0,"sets_won_B":1}"#,
        )
        .await;
        let api = HttpSessionApi::new(config);

        let response = api
            .end_set("S1", EndSetRequest { winner: Side::B })
            .await
            .unwrap();
        assert_eq!(response.current_set, Some(2));
        assert_eq!(response.sets_won_b, Some(1));

        let captured = captured.await.unwrap();
        assert!(captured
            .head
            .starts_with("POST /api/session/S1/end-set HTTP/1.1"));
        let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(body, serde_json::json!({ "winner": "B" }));
    }

    #[tokio::test]
    async fn new_set_has_no_body() {
        let (config, captured) =
            start_mock_api("200 OK", r#"{"success":true,"current_set":3}"#).await;
        let api = HttpSessionApi::new(config);

        let response = api.new_set("S1").await.unwrap();
        assert!(response.success);
        assert_eq!(response.current_set, Some(3));

        let captured = captured.await.unwrap();
        assert!(captured
            .head
            .starts_with("POST /api/session/S1/new-set HTTP/1.1"));
        assert!(captured.body.is_empty());
    }

    #[tokio::test]
    async fn error_status_body_is_still_parsed() {
        let (config, _captured) = start_mock_api(
            "404 Not Found",
            r#"{"success":false,"error":"Session not found"}"#,
        )
        .await;
        let api = HttpSessionApi::new(config);

        let response = api.join("missing").await.unwrap();
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Session not found"));
    }

    #[tokio::test]
    async fn non_json_body_is_a_serialization_error() {
        let (config, _captured) = start_mock_api("502 Bad Gateway", "<html>oops</html>").await;
        let api = HttpSessionApi::new(config);

        let err = api.join("S1").await.unwrap_err();
        assert!(matches!(err, RemoteError::Serialization(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_an_http_error() {
        let config = RemoteConfig::new("http://127.0.0.1:1").unwrap();
        let api = HttpSessionApi::new(config);

        let err = api.join("S1").await.unwrap_err();
        assert!(matches!(err, RemoteError::Http(_)));
    }
}
