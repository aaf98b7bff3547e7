use serde_json::Value;

// JSON-RPC 2.0 standard error codes

/// Malformed JSON payload.
pub const ERR_PARSE: i64 = -32700;
/// Invalid request: missing method, empty batch, or not an object.
pub const ERR_INVALID_REQ: i64 = -32600;
/// Method or interface not found.
pub const ERR_METHOD_NOT_FOUND: i64 = -32601;
/// Invalid params: arity, type, or struct/enum validation failure.
pub const ERR_INVALID_PARAMS: i64 = -32602;
/// Internal error.
pub const ERR_INTERNAL: i64 = -32603;

// Barrister extensions

/// Unknown or wrapped unexpected failure.
pub const ERR_UNKNOWN: i64 = -32000;
/// The server returned a value violating the contract, or a batch
/// response was malformed.
pub const ERR_INVALID_RESP: i64 = -32001;

/// The typed RPC error carried across the wire.
///
/// Handlers may return any `RpcError` — including application-specific
/// positive codes — and the `(code, message, data)` triple is propagated
/// through server and client verbatim.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("RpcError: code={code} message={message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    /// Create a new instance of `RpcError` without auxiliary data.
    pub fn new<S: Into<String>>(code: i64, message: S) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new instance of `RpcError` carrying auxiliary data.
    pub fn with_data<S: Into<String>>(code: i64, message: S, data: Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }
}
