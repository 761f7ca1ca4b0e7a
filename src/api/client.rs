//! Single-shot JSON POST client for the Jerry backend.
//!
//! Every call is one POST with a JSON body. Responses are classified by
//! their `Content-Type`: JSON bodies become [`Payload::Json`], everything
//! else is kept verbatim as [`Payload::Text`]. Transport failures and
//! non-success statuses share one error type so callers surface both through
//! the same channel.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use super::{endpoint_url, Endpoint};

const GENERIC_SERVER_ERROR: &str = "Server error";

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// Returns the string value stored under `field` in a JSON object body.
    pub fn string_field(&self, field: &str) -> Option<&str> {
        match self {
            Payload::Json(value) => value.get(field).and_then(Value::as_str),
            Payload::Text(_) => None,
        }
    }
}

/// Failure of a backend call.
///
/// `status` is `None` when the request never produced an HTTP response
/// (DNS failure, refused connection, timeout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    status: Option<u16>,
    message: String,
}

impl HttpError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_transport(&self) -> bool {
        self.status.is_none()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for HttpError {}

/// Anything able to deliver a POST to a backend endpoint.
///
/// [`HttpClient`] is the production implementation; tests substitute a
/// recording double.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn send(
        &self,
        endpoint: Endpoint,
        body: Value,
        token: Option<&str>,
    ) -> Result<Payload, HttpError>;
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Build a client whose transport gives up after `timeout`.
    ///
    /// With `None` the transport default applies (no overall deadline).
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, HttpError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| HttpError::transport(err.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Backend for HttpClient {
    async fn send(
        &self,
        endpoint: Endpoint,
        body: Value,
        token: Option<&str>,
    ) -> Result<Payload, HttpError> {
        let url = endpoint_url(&self.base_url, endpoint);
        let token = token.filter(|token| !token.is_empty());
        debug!(
            endpoint = endpoint.name(),
            authenticated = token.is_some(),
            "sending request"
        );

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|err| {
            debug!(endpoint = endpoint.name(), error = %err, "transport failure");
            HttpError::transport(err.to_string())
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response
            .text()
            .await
            .map_err(|err| HttpError::transport(err.to_string()))?;
        let payload = parse_payload(&content_type, text);

        if !status.is_success() {
            let message = error_message(&payload);
            debug!(
                endpoint = endpoint.name(),
                status = status.as_u16(),
                "backend rejected request"
            );
            return Err(HttpError::status(status.as_u16(), message));
        }

        debug!(endpoint = endpoint.name(), status = status.as_u16(), "request completed");
        Ok(payload)
    }
}

fn parse_payload(content_type: &str, text: String) -> Payload {
    if content_type.contains("application/json") {
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            return Payload::Json(value);
        }
    }
    Payload::Text(text)
}

/// Pick the message for a failed response.
///
/// Preference order: a string `error` field (or `error.message`), then the
/// raw text body, then a generic fallback.
pub fn error_message(payload: &Payload) -> String {
    match payload {
        Payload::Json(value) => value
            .get("error")
            .and_then(|error| match error {
                Value::String(text) => Some(text.as_str()),
                Value::Object(map) => map.get("message").and_then(Value::as_str),
                _ => None,
            })
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| GENERIC_SERVER_ERROR.to_string()),
        Payload::Text(text) if !text.trim().is_empty() => text.trim().to_string(),
        Payload::Text(_) => GENERIC_SERVER_ERROR.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{closed_port_base_url, serve_once};
    use serde_json::json;

    #[test]
    fn error_message_prefers_structured_error_field() {
        let payload = Payload::Json(json!({ "error": "quota exceeded", "detail": "x" }));
        assert_eq!(error_message(&payload), "quota exceeded");

        let nested = Payload::Json(json!({ "error": { "message": "model overloaded" } }));
        assert_eq!(error_message(&nested), "model overloaded");
    }

    #[test]
    fn error_message_falls_back_to_text_then_generic() {
        assert_eq!(
            error_message(&Payload::Text("Bad Gateway\n".to_string())),
            "Bad Gateway"
        );
        assert_eq!(error_message(&Payload::Text("  ".to_string())), "Server error");
        assert_eq!(
            error_message(&Payload::Json(json!({ "status": "failed" }))),
            "Server error"
        );
    }

    #[test]
    fn json_content_type_with_invalid_body_is_kept_as_text() {
        let payload = parse_payload("application/json; charset=utf-8", "{oops".to_string());
        assert_eq!(payload, Payload::Text("{oops".to_string()));

        let payload = parse_payload("application/json", r#"{"answer":"4"}"#.to_string());
        assert_eq!(payload.string_field("answer"), Some("4"));
    }

    #[tokio::test]
    async fn send_posts_json_with_bearer_token() {
        let (base_url, server) =
            serve_once("200 OK", "application/json", r#"{"answer":"4"}"#).await;
        let client = HttpClient::new(base_url);

        let payload = client
            .send(Endpoint::AskAi, json!({ "prompt": "2+2" }), Some("secret"))
            .await
            .expect("request succeeds");
        assert_eq!(payload.string_field("answer"), Some("4"));

        let captured = server.await.expect("server task").expect("captured request");
        assert!(captured.request_line.starts_with("POST /api/ask-ai "));
        assert_eq!(captured.header("authorization"), Some("Bearer secret"));
        assert_eq!(captured.json_body(), json!({ "prompt": "2+2" }));
    }

    #[tokio::test]
    async fn send_omits_authorization_without_token() {
        let (base_url, server) = serve_once("200 OK", "text/plain", "pong").await;
        let client = HttpClient::new(base_url);

        let payload = client
            .send(Endpoint::GenerateImage, json!({ "prompt": "cat" }), None)
            .await
            .expect("request succeeds");
        assert_eq!(payload, Payload::Text("pong".to_string()));

        let captured = server.await.expect("server task").expect("captured request");
        assert!(captured.header("authorization").is_none());
    }

    #[tokio::test]
    async fn non_success_status_uses_error_field() {
        let (base_url, server) = serve_once(
            "429 Too Many Requests",
            "application/json",
            r#"{"error":"quota exceeded"}"#,
        )
        .await;
        let client = HttpClient::new(base_url);

        let err = client
            .send(Endpoint::GenerateImage, json!({ "prompt": "cat" }), None)
            .await
            .expect_err("request fails");
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.message(), "quota exceeded");
        server.await.expect("server task").expect("captured request");
    }

    #[tokio::test]
    async fn non_success_status_uses_plain_text_body() {
        let (base_url, server) =
            serve_once("502 Bad Gateway", "text/html", "upstream unavailable").await;
        let client = HttpClient::new(base_url);

        let err = client
            .send(Endpoint::AskAi, json!({ "prompt": "hi" }), None)
            .await
            .expect_err("request fails");
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(err.to_string(), "upstream unavailable");
        server.await.expect("server task").expect("captured request");
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let base_url = closed_port_base_url().await;
        let client = HttpClient::new(base_url);

        let err = client
            .send(Endpoint::AskAi, json!({ "prompt": "hi" }), None)
            .await
            .expect_err("connection refused");
        assert!(err.is_transport());
        assert!(!err.message().is_empty());
    }
}
