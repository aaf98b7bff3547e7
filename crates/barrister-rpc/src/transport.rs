//! Transports carry one JSON value (a request or a batch array) to the
//! server and one back.

use crate::error::RpcError;
use crate::error::ERR_PARSE;
use crate::error::ERR_UNKNOWN;
use crate::server::Server;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub trait Transport: Send + Sync {
    /// Submit one JSON-RPC request (or batch array) and await the
    /// response. Transport-layer failures surface as [`RpcError`]s with
    /// code −32000.
    fn request(&self, req: &Value) -> Result<Value, RpcError>;
}

/// Calls straight into a [`Server`] living in the same process, with no
/// serialization beyond what the server already performs.
pub struct InProcTransport {
    server: Arc<Server>,
}

impl InProcTransport {
    pub fn new(server: Arc<Server>) -> Self {
        Self { server }
    }
}

impl Transport for InProcTransport {
    fn request(&self, req: &Value) -> Result<Value, RpcError> {
        Ok(self.server.call(req))
    }
}

/// POSTs JSON-RPC over HTTP.
///
/// All requests go to one fixed URL as UTF-8 JSON with
/// `Content-Type: application/json`, reusing the agent's connection pool.
pub struct HttpTransport {
    agent: ureq::Agent,
    url: String,
    headers: Vec<(String, String)>,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            agent,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a custom header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl Transport for HttpTransport {
    fn request(&self, req: &Value) -> Result<Value, RpcError> {
        let body = serde_json::to_string(req).map_err(|e| {
            RpcError::new(ERR_UNKNOWN, format!("request serialization failed: {e}"))
        })?;

        debug!(url = %self.url, bytes = body.len(), "posting request");
        let mut post = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json");
        for (name, value) in &self.headers {
            post = post.set(name, value);
        }

        let response = post.send_string(&body).map_err(|e| match e {
            ureq::Error::Status(code, _) => {
                RpcError::new(ERR_UNKNOWN, format!("HTTP status {code} from {}", self.url))
            }
            ureq::Error::Transport(t) => {
                RpcError::new(ERR_UNKNOWN, format!("HTTP transport failure: {t}"))
            }
        })?;

        let text = response.into_string().map_err(|e| {
            RpcError::new(ERR_UNKNOWN, format!("failed reading HTTP response: {e}"))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| RpcError::new(ERR_PARSE, format!("Malformed JSON payload: {e}")))
    }
}
