//! JSON-RPC transport to the remote tool service.
//!
//! One logical session per run: `handshake` sends the protocol `initialize`
//! call and captures the session id the service hands back; every later call
//! replays it. The transport is shared read-only across workers, so the
//! session slot sits behind an `RwLock` and is written exactly once.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::registry::ToolDescriptor;

const SESSION_HEADER: &str = "Mcp-Session-Id";
const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint url: {0}")]
    InvalidEndpoint(String),
    #[error("failed to reach tool service: {0}")]
    Network(String),
    #[error("call timed out")]
    Timeout,
    #[error("tool service returned http {code}: {body}")]
    HttpStatus { code: u16, body: String },
    #[error("malformed payload from tool service: {0}")]
    MalformedPayload(String),
    #[error("MCP error {code}: {message}")]
    Remote { code: i64, message: String },
}

/// Connection parameters shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub endpoint: String,
    pub oid: String,
    pub api_key: String,
    pub uid: Option<String>,
}

impl ConnectionParams {
    /// Key as safe for display and logs; never print the raw key.
    pub fn masked_key(&self) -> String {
        mask_key(&self.api_key)
    }
}

/// Mask a secret for display, keeping only the first and last 4 characters.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    /// Per-call ceiling; generation calls are slow, but must never hang.
    pub request_timeout: Duration,
    /// Ceiling for plain resource downloads (`fetch_resource`).
    pub resource_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            resource_timeout: Duration::from_secs(30),
        }
    }
}

/// Request/response seam to the remote service. Implementations must be safe
/// for concurrent use; retry policy belongs to callers, not here.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Establish the session. Called once, before discovery.
    async fn handshake(&self) -> Result<(), TransportError>;
    /// Enumerate the callable operations the service exposes.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError>;
    /// Invoke one operation and return its decoded result value.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, TransportError>;
    /// Plain download of an out-of-band resource the service linked to.
    async fn fetch_resource(&self, url: &str) -> Result<String, TransportError>;
}

#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    params: ConnectionParams,
    settings: TransportSettings,
    request_id: AtomicI64,
    session: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(
        params: ConnectionParams,
        settings: TransportSettings,
    ) -> Result<Self, TransportError> {
        url::Url::parse(&params.endpoint)
            .map_err(|err| TransportError::InvalidEndpoint(err.to_string()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;

        Ok(Self {
            client,
            params,
            settings,
            request_id: AtomicI64::new(0),
            session: RwLock::new(None),
        })
    }

    fn session_id(&self) -> Option<String> {
        self.session.read().ok().and_then(|guard| guard.clone())
    }

    fn remember_session(&self, id: &str) {
        if let Ok(mut guard) = self.session.write() {
            if guard.is_none() {
                *guard = Some(id.to_string());
            }
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed) + 1;
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut request = self
            .client
            .post(&self.params.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}:{}", self.params.api_key, self.params.oid),
            )
            .header("x-lc-oid", &self.params.oid)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream");
        if let Some(uid) = &self.params.uid {
            request = request.header("x-lc-uid", uid);
        }
        if let Some(session) = self.session_id() {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request
            .json(&payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if let Some(session) = response.headers().get(SESSION_HEADER) {
            if let Ok(session) = session.to_str() {
                self.remember_session(session);
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                code: status.as_u16(),
                body,
            });
        }

        let envelope = if content_type.starts_with("text/event-stream") {
            sse_payload(&body)?
        } else {
            serde_json::from_str::<Value>(&body)
                .map_err(|err| TransportError::MalformedPayload(err.to_string()))?
        };
        unwrap_envelope(envelope)
    }
}

#[async_trait]
impl ToolTransport for HttpTransport {
    async fn handshake(&self) -> Result<(), TransportError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "rulesmith",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        self.rpc("initialize", params).await?;
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError> {
        let result = self.rpc("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                TransportError::MalformedPayload("tools/list result has no tools array".into())
            })?;
        Ok(tools.iter().filter_map(ToolDescriptor::from_value).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, TransportError> {
        self.rpc(
            "tools/call",
            json!({ "name": name, "arguments": arguments }),
        )
        .await
    }

    async fn fetch_resource(&self, url: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(self.settings.resource_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                code: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Extract the terminal JSON-RPC envelope from an SSE body. Frames look like
/// `data: {json}`; the one carrying `result` or `error` is the payload.
fn sse_payload(body: &str) -> Result<Value, TransportError> {
    for line in body.lines() {
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let Ok(frame) = serde_json::from_str::<Value>(data.trim()) else {
            continue;
        };
        if frame.get("result").is_some() || frame.get("error").is_some() {
            return Ok(frame);
        }
    }
    Err(TransportError::MalformedPayload(
        "event stream ended without a result frame".into(),
    ))
}

/// Split a decoded envelope into its result, or the remote error it carries.
fn unwrap_envelope(envelope: Value) -> Result<Value, TransportError> {
    if let Some(error) = envelope.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(TransportError::Remote { code, message });
    }
    envelope
        .get("result")
        .cloned()
        .ok_or_else(|| TransportError::MalformedPayload("response has no result".into()))
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    TransportError::Network(err.to_string())
}
