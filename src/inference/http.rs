use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::errors::InferenceError;
use super::traits::InferenceClient;
use super::types::{InferenceRequest, PredictResponse};
use crate::ensemble::ActionChunk;

/// How often a failed call is repeated. The default never retries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            backoff: Duration::from_millis(100),
        }
    }
}

/// Talks JSON over HTTP to a policy server's `/predict_action` endpoint.
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    endpoint: String,
    agent: ureq::Agent,
    retry: RetryPolicy,
}

impl HttpInferenceClient {
    pub fn new(base_url: &str, timeout: Option<Duration>, retry: RetryPolicy) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Self {
            endpoint: format!("{}/predict_action", base_url.trim_end_matches('/')),
            agent: builder.build(),
            retry,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post(
        agent: &ureq::Agent,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<ActionChunk, InferenceError> {
        let response = agent.post(endpoint).send_json(body).map_err(|err| match err {
            ureq::Error::Status(status, response) => InferenceError::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => InferenceError::Transport(transport.to_string()),
        })?;

        let parsed: PredictResponse = response
            .into_json()
            .map_err(|err| InferenceError::InvalidResponse(err.to_string()))?;
        Ok(parsed.actions)
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn predict_action(
        &self,
        request: &InferenceRequest,
    ) -> Result<ActionChunk, InferenceError> {
        let body = serde_json::to_value(request)?;
        let mut attempt = 0;

        loop {
            let agent = self.agent.clone();
            let endpoint = self.endpoint.clone();
            let payload = body.clone();
            let result =
                tokio::task::spawn_blocking(move || Self::post(&agent, &endpoint, &payload))
                    .await
                    .map_err(|err| InferenceError::Worker(err.to_string()))?;

            match result {
                Ok(chunk) => {
                    debug!(horizon = chunk.horizon(), attempt, "received action chunk");
                    return Ok(chunk);
                }
                Err(err) if err.is_retryable() && attempt < self.retry.retries => {
                    attempt += 1;
                    warn!(error = %err, attempt, "inference call failed, retrying");
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::*;
    use crate::observation::Snapshot;

    /// Answers one connection per canned reply and hands back the request bodies.
    async fn serve(replies: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut bodies = Vec::new();
            for (status, body) in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                bodies.push(read_body(&mut stream).await);
                let reply = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
            bodies
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_body(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return String::new();
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let start = end + 4;
            if buf.len() >= start + length {
                return String::from_utf8_lossy(&buf[start..start + length]).into_owned();
            }
        }
    }

    fn request() -> InferenceRequest {
        InferenceRequest {
            language_instruction: "pick up the cup".to_string(),
            observation: Snapshot::new(),
        }
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = HttpInferenceClient::new("http://host:8000/", None, RetryPolicy::default());
        assert_eq!(client.endpoint(), "http://host:8000/predict_action");
    }

    #[tokio::test]
    async fn test_predict_action_round_trip() {
        let (url, server) = serve(vec![(200, r#"{"actions": [[0.5, 1.5], [2.5, 3.5]]}"#)]).await;
        let client = HttpInferenceClient::new(&url, Some(Duration::from_secs(5)), RetryPolicy::default());

        let chunk = client.predict_action(&request()).await.unwrap();
        assert_eq!(chunk.to_rows(), vec![vec![0.5, 1.5], vec![2.5, 3.5]]);

        let bodies = server.await.unwrap();
        let sent: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
        assert_eq!(sent["language_instruction"], "pick up the cup");
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let (url, server) = serve(vec![(503, r#"{"detail": "warming up"}"#)]).await;
        let client = HttpInferenceClient::new(&url, Some(Duration::from_secs(5)), RetryPolicy::default());

        let err = client.predict_action(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Status { status: 503, .. }));
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let (url, server) = serve(vec![
            (503, r#"{"detail": "warming up"}"#),
            (200, r#"{"actions": [[1.0]]}"#),
        ])
        .await;
        let retry = RetryPolicy {
            retries: 2,
            backoff: Duration::from_millis(1),
        };
        let client = HttpInferenceClient::new(&url, Some(Duration::from_secs(5)), retry);

        let chunk = client.predict_action(&request()).await.unwrap();
        assert_eq!(chunk.row(0), &[1.0]);
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let (url, server) = serve(vec![(422, r#"{"detail": "bad observation"}"#)]).await;
        let retry = RetryPolicy {
            retries: 3,
            backoff: Duration::from_millis(1),
        };
        let client = HttpInferenceClient::new(&url, Some(Duration::from_secs(5)), retry);

        let err = client.predict_action(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Status { status: 422, .. }));
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let (url, _server) = serve(vec![(200, r#"{"actions": [[1.0], [2.0, 3.0]]}"#)]).await;
        let client = HttpInferenceClient::new(&url, Some(Duration::from_secs(5)), RetryPolicy::default());

        let err = client.predict_action(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::InvalidResponse(_)));
    }
}
