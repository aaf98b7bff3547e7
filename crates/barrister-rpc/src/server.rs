//! JSON-RPC 2.0 dispatch over a contract.

use crate::contract::Contract;
use crate::error::RpcError;
use crate::error::ERR_INTERNAL;
use crate::error::ERR_INVALID_REQ;
use crate::error::ERR_METHOD_NOT_FOUND;
use crate::error::ERR_PARSE;
use crate::error::ERR_UNKNOWN;
use crate::jsonrpc::unpack_method;
use crate::jsonrpc::Response;
use crate::jsonrpc::IDL_METHOD;
use serde_json::Map;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::debug;

/// A user-supplied implementation of one interface.
///
/// The server routes `Interface.Function` calls to the handler registered
/// for `Interface`, passing the function name and positional params. A
/// returned [`RpcError`] is propagated to the caller verbatim, so handlers
/// are free to use application-specific positive codes.
pub trait Handler: Send + Sync {
    fn call(&self, function: &str, params: &[Value]) -> Result<Value, RpcError>;
}

/// Dispatches parsed JSON-RPC messages against a contract and a registry
/// of interface handlers.
///
/// The contract and registry are written only at setup and read
/// thereafter, so one server may be shared across threads as long as the
/// handlers themselves are safe.
pub struct Server {
    contract: Arc<Contract>,
    handlers: HashMap<String, Box<dyn Handler>>,
    validate_request: bool,
    validate_response: bool,
}

impl Server {
    /// Create a new instance of `Server` with request and response
    /// validation enabled.
    pub fn new(contract: Arc<Contract>) -> Self {
        Self {
            contract,
            handlers: HashMap::new(),
            validate_request: true,
            validate_response: true,
        }
    }

    /// Configure whether incoming params are validated against the
    /// contract before handlers run.
    pub fn validate_request(mut self, validate: bool) -> Self {
        self.validate_request = validate;
        self
    }

    /// Configure whether handler return values are validated against the
    /// contract before responses go out.
    pub fn validate_response(mut self, validate: bool) -> Self {
        self.validate_response = validate;
        self
    }

    pub fn contract(&self) -> &Arc<Contract> {
        &self.contract
    }

    /// Register the implementation of an interface. The interface must
    /// exist in the contract.
    pub fn add_handler(
        &mut self,
        iface_name: &str,
        handler: Box<dyn Handler>,
    ) -> Result<(), RpcError> {
        if !self.contract.has_interface(iface_name) {
            return Err(RpcError::new(
                ERR_INVALID_REQ,
                format!("Unknown interface: '{iface_name}'"),
            ));
        }
        self.handlers.insert(iface_name.to_string(), handler);
        Ok(())
    }

    /// Handle one parsed JSON-RPC message: a single request object or a
    /// batch array. Always produces a response value; errors are encoded
    /// per the JSON-RPC error taxonomy rather than returned.
    pub fn call(&self, req: &Value) -> Value {
        match req {
            Value::Array(batch) => {
                if batch.is_empty() {
                    return error_value(
                        Value::Null,
                        RpcError::new(ERR_INVALID_REQ, "Invalid Request. Empty batch."),
                    );
                }
                debug!(calls = batch.len(), "handling batch");
                Value::Array(batch.iter().map(|r| self.call_one(r)).collect())
            }
            _ => self.call_one(req),
        }
    }

    /// Raw-body convenience entry: parse request bytes, dispatch, and
    /// serialize the response. Invalid JSON yields a −32700 response.
    pub fn handle_bytes(&self, body: &[u8]) -> Vec<u8> {
        let response = match serde_json::from_slice::<Value>(body) {
            Ok(req) => self.call(&req),
            Err(e) => error_value(
                Value::Null,
                RpcError::new(ERR_PARSE, format!("Malformed JSON payload: {e}")),
            ),
        };
        serde_json::to_vec(&response).expect("a JSON value always serializes")
    }

    fn call_one(&self, req: &Value) -> Value {
        let Some(obj) = req.as_object() else {
            return error_value(
                Value::Null,
                RpcError::new(
                    ERR_INVALID_REQ,
                    format!("Invalid Request. {req} is not an object."),
                ),
            );
        };

        let id = obj.get("id").cloned().unwrap_or(Value::Null);
        match self.dispatch(obj) {
            Ok(result) => response_value(Response::result(id, result)),
            Err(e) => {
                debug!(code = e.code, message = %e.message, "call failed");
                error_value(id, e)
            }
        }
    }

    fn dispatch(&self, req: &Map<String, Value>) -> Result<Value, RpcError> {
        let method = req
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(ERR_INVALID_REQ, "Invalid Request. No 'method'."))?;
        debug!(method, "dispatching");

        if method == IDL_METHOD {
            return serde_json::to_value(self.contract.document())
                .map_err(|e| RpcError::new(ERR_INTERNAL, e.to_string()));
        }

        let (iface_name, func_name) = unpack_method(method)?;
        let handler = self.handlers.get(iface_name).ok_or_else(|| {
            RpcError::new(
                ERR_METHOD_NOT_FOUND,
                format!("No implementation of '{iface_name}' found"),
            )
        })?;
        let function = self.contract.function(iface_name, func_name)?;

        let params: Vec<Value> = match req.get("params") {
            None => Vec::new(),
            Some(Value::Array(params)) => params.clone(),
            Some(other) => {
                return Err(RpcError::new(
                    ERR_INVALID_REQ,
                    format!("Invalid Request. 'params' must be an array, got {other}."),
                ))
            }
        };

        if self.validate_request {
            self.contract.validate_request(iface_name, func_name, &params)?;
        }

        let result = match catch_unwind(AssertUnwindSafe(|| handler.call(func_name, &params))) {
            Ok(result) => result?,
            Err(panic) => {
                return Err(RpcError::new(
                    ERR_UNKNOWN,
                    format!(
                        "handler for '{method}' panicked: {}",
                        panic_message(&panic)
                    ),
                ))
            }
        };

        // notifications are invoked but always answered with a null result
        if function.returns.is_none() {
            return Ok(Value::Null);
        }

        if self.validate_response {
            self.contract
                .validate_response(iface_name, func_name, &result)?;
        }
        Ok(result)
    }
}

fn response_value(response: Response) -> Value {
    serde_json::to_value(response).expect("a response always serializes")
}

fn error_value(id: Value, error: RpcError) -> Value {
    response_value(Response::error(id, error))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    eprintln!("DEBUG type_id={:?}", panic.type_id());
    eprintln!("DEBUG strtype_id={:?}", std::any::TypeId::of::<&str>());
    eprintln!("DEBUG is_str={}", panic.downcast_ref::<&str>().is_some());
    eprintln!("DEBUG is_string={}", panic.downcast_ref::<String>().is_some());
    eprintln!("DEBUG is_cow={}", panic.downcast_ref::<std::borrow::Cow<'static, str>>().is_some());
    eprintln!("DEBUG is_boxstr={}", panic.downcast_ref::<Box<str>>().is_some());
    eprintln!("DEBUG is_unit={}", panic.downcast_ref::<()>().is_some());
    eprintln!("DEBUG is_args={}", panic.downcast_ref::<std::fmt::Arguments>().is_some());
    eprintln!("DEBUG is_boxdyn_error={}", panic.downcast_ref::<Box<dyn std::error::Error + Send>>().is_some());
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "opaque panic payload"
    }
}
