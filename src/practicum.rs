use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::error::TransportError;

/// Source of homework status snapshots.
#[async_trait]
pub trait StatusApi: Send + Sync {
    /// Fetch the raw status payload for homeworks updated since `from_date`
    /// (unix seconds; `0` means "now").
    async fn homework_statuses(&self, from_date: i64) -> Result<Value, TransportError>;
}

#[derive(Clone)]
pub struct PracticumClient {
    http: Client,
    endpoint: Url,
    token: String,
}

impl fmt::Debug for PracticumClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticumClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl PracticumClient {
    pub fn new(token: String, endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent("homework-bot/0.1")
            .no_proxy()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint,
            token,
        })
    }

    pub fn build_request(&self, from_date: i64) -> Result<reqwest::Request, TransportError> {
        let from_date = effective_from_date(from_date, chrono::Utc::now().timestamp());
        let request = self
            .http
            .get(self.endpoint.clone())
            .header("Authorization", format!("OAuth {}", self.token))
            .query(&[("from_date", from_date)])
            .build()?;
        Ok(request)
    }
}

#[async_trait]
impl StatusApi for PracticumClient {
    #[instrument(skip_all)]
    async fn homework_statuses(&self, from_date: i64) -> Result<Value, TransportError> {
        let request = self.build_request(from_date)?;
        info!(url = %request.url(), "requesting homework statuses");
        let res = self.http.execute(request).await?;

        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            debug!(%status, body = %body, "status API returned an error");
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(res.json::<Value>().await?)
    }
}

/// A zero or negative lower bound falls back to `now`.
pub fn effective_from_date(from_date: i64, now: i64) -> i64 {
    if from_date > 0 {
        from_date
    } else {
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ENDPOINT;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response on a loopback port and return the
    /// endpoint URL pointing at it.
    async fn serve_once(status_line: &'static str, body: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        Url::parse(&format!("http://{}/api/user_api/homework_statuses/", addr)).unwrap()
    }

    fn local_client(endpoint: Url) -> PracticumClient {
        PracticumClient::new("secret".into(), endpoint, Duration::from_secs(5)).unwrap()
    }

    fn client() -> PracticumClient {
        PracticumClient::new(
            "secret".into(),
            Url::parse(DEFAULT_ENDPOINT).unwrap(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn from_date_falls_back_to_now() {
        assert_eq!(effective_from_date(0, 1_700_000_000), 1_700_000_000);
        assert_eq!(effective_from_date(-5, 1_700_000_000), 1_700_000_000);
        assert_eq!(effective_from_date(42, 1_700_000_000), 42);
    }

    #[test]
    fn build_request_sets_auth_and_query() {
        let request = client().build_request(1_549_962_000).unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/api/user_api/homework_statuses/");
        assert_eq!(request.url().query(), Some("from_date=1549962000"));
        assert_eq!(
            request
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "OAuth secret"
        );
    }

    #[test]
    fn build_request_without_timestamp_uses_now() {
        let before = chrono::Utc::now().timestamp();
        let request = client().build_request(0).unwrap();
        let (_, value) = request
            .url()
            .query_pairs()
            .find(|(k, _)| k == "from_date")
            .unwrap();
        let ts: i64 = value.parse().unwrap();
        assert!(ts >= before);
    }

    #[test]
    fn debug_hides_token() {
        assert!(!format!("{:?}", client()).contains("secret"));
    }

    #[tokio::test]
    async fn non_ok_status_is_transport_error() {
        let client = local_client(serve_once("500 Internal Server Error", "{}").await);
        let err = client.homework_statuses(1).await.unwrap_err();
        assert!(matches!(err, TransportError::Status(500)));
        assert_eq!(err.to_string(), "status API responded with HTTP 500");
    }

    #[tokio::test]
    async fn malformed_body_is_transport_error() {
        let client = local_client(serve_once("200 OK", "notjs").await);
        let err = client.homework_statuses(1).await.unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }

    #[tokio::test]
    async fn ok_body_is_returned_as_json() {
        let client = local_client(serve_once("200 OK", r#"{"homeworks":[]}"#).await);
        let body = client.homework_statuses(1).await.unwrap();
        assert_eq!(body, json!({"homeworks": []}));
    }
}
