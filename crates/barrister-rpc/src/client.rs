//! Contract-fetching client with per-interface proxies.

use crate::batch::Batch;
use crate::contract::Contract;
use crate::error::RpcError;
use crate::error::ERR_INVALID_RESP;
use crate::idgen::IdGenerator;
use crate::idgen::RandomId;
use crate::jsonrpc::ErrorObject;
use crate::jsonrpc::Request;
use crate::jsonrpc::IDL_METHOD;
use crate::jsonrpc::JSONRPC_VERSION;
use crate::transport::Transport;
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A connected Barrister client.
///
/// On construction the client issues one `barrister-idl` call through its
/// transport and builds its [`Contract`] from the result, so every proxy
/// call can be validated locally before it touches the wire.
///
/// ## Example
/// ```rust,no_run
/// use barrister_rpc::{Client, HttpTransport};
/// use serde_json::json;
///
/// let client = Client::connect(HttpTransport::new("http://localhost:8080/api"))?;
/// let calc = client.interface("Calculator")?;
/// let sum = calc.call("add", vec![json!(2), json!(3)])?;
/// assert_eq!(sum, json!(5));
/// # Ok::<(), barrister_rpc::RpcError>(())
/// ```
pub struct Client {
    transport: Box<dyn Transport>,
    contract: Arc<Contract>,
    validate_request: bool,
    validate_response: bool,
    id_gen: Box<dyn IdGenerator>,
}

impl Client {
    /// Connect with the default options: validation on, random ids.
    pub fn connect(transport: impl Transport + 'static) -> Result<Self, RpcError> {
        Self::builder(transport).connect()
    }

    pub fn builder(transport: impl Transport + 'static) -> ClientBuilder {
        ClientBuilder {
            transport: Box::new(transport),
            validate_request: true,
            validate_response: true,
            id_gen: Box::new(RandomId),
        }
    }

    pub fn contract(&self) -> &Arc<Contract> {
        &self.contract
    }

    /// A proxy for one interface of the contract.
    pub fn interface(&self, name: &str) -> Result<InterfaceProxy<'_>, RpcError> {
        self.contract.interface(name)?;
        Ok(InterfaceProxy {
            client: self,
            iface_name: name.to_string(),
        })
    }

    /// Start collecting calls to submit as one batch.
    pub fn start_batch(&self) -> Batch<'_> {
        Batch::new(self)
    }

    /// Invoke `Interface.Function` with positional params.
    pub fn call(
        &self,
        iface_name: &str,
        func_name: &str,
        params: Vec<Value>,
    ) -> Result<Value, RpcError> {
        let request = self.to_request(iface_name, func_name, params)?;
        debug!(method = %request.method, "calling");
        let request = serde_json::to_value(&request)
            .expect("a request always serializes");
        let response = self.transport.request(&request)?;
        self.to_result(iface_name, func_name, &response)
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn to_request(
        &self,
        iface_name: &str,
        func_name: &str,
        params: Vec<Value>,
    ) -> Result<Request, RpcError> {
        if self.validate_request {
            self.contract
                .validate_request(iface_name, func_name, &params)?;
        }
        Ok(Request::new(
            Value::String(self.id_gen.next_id()),
            format!("{iface_name}.{func_name}"),
            params,
        ))
    }

    /// Turn one response into the call result, surfacing a typed error
    /// verbatim and optionally revalidating the result locally.
    pub(crate) fn to_result(
        &self,
        iface_name: &str,
        func_name: &str,
        response: &Value,
    ) -> Result<Value, RpcError> {
        let obj = response.as_object().ok_or_else(|| {
            RpcError::new(
                ERR_INVALID_RESP,
                format!("response is not an object: {response}"),
            )
        })?;

        if let Some(error) = obj.get("error") {
            let error: ErrorObject = serde_json::from_value(error.clone()).map_err(|e| {
                RpcError::new(ERR_INVALID_RESP, format!("malformed error object: {e}"))
            })?;
            return Err(error.into());
        }

        let result = obj.get("result").ok_or_else(|| {
            RpcError::new(
                ERR_INVALID_RESP,
                "response has neither 'result' nor 'error'",
            )
        })?;

        if self.validate_response {
            self.contract
                .validate_response(iface_name, func_name, result)?;
        }
        Ok(result.clone())
    }
}

pub struct ClientBuilder {
    transport: Box<dyn Transport>,
    validate_request: bool,
    validate_response: bool,
    id_gen: Box<dyn IdGenerator>,
}

impl ClientBuilder {
    /// Configure whether params are validated locally before sending.
    pub fn validate_request(mut self, validate: bool) -> Self {
        self.validate_request = validate;
        self
    }

    /// Configure whether results are validated against the contract.
    pub fn validate_response(mut self, validate: bool) -> Self {
        self.validate_response = validate;
        self
    }

    /// Swap the request id strategy (default: [`RandomId`]).
    pub fn id_generator(mut self, id_gen: impl IdGenerator + 'static) -> Self {
        self.id_gen = Box::new(id_gen);
        self
    }

    /// Fetch the contract over the transport and build the client.
    pub fn connect(self) -> Result<Client, RpcError> {
        let request = json!({
            "jsonrpc": JSONRPC_VERSION,
            "method": IDL_METHOD,
            "id": "1",
        });
        let response = self.transport.request(&request)?;

        if let Some(error) = response.get("error") {
            let error: ErrorObject = serde_json::from_value(error.clone()).map_err(|e| {
                RpcError::new(ERR_INVALID_RESP, format!("malformed error object: {e}"))
            })?;
            return Err(error.into());
        }
        let result = response.get("result").ok_or_else(|| {
            RpcError::new(ERR_INVALID_RESP, "barrister-idl returned no result")
        })?;
        let document = serde_json::from_value(result.clone()).map_err(|e| {
            RpcError::new(ERR_INVALID_RESP, format!("malformed contract JSON: {e}"))
        })?;
        debug!("contract fetched");

        Ok(Client {
            transport: self.transport,
            contract: Arc::new(Contract::from_document(document)),
            validate_request: self.validate_request,
            validate_response: self.validate_response,
            id_gen: self.id_gen,
        })
    }
}

/// Proxy for one interface; function calls become JSON-RPC requests.
pub struct InterfaceProxy<'a> {
    client: &'a Client,
    iface_name: String,
}

impl std::fmt::Debug for InterfaceProxy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceProxy")
            .field("iface_name", &self.iface_name)
            .finish()
    }
}

impl InterfaceProxy<'_> {
    pub fn name(&self) -> &str {
        &self.iface_name
    }

    pub fn call(&self, func_name: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.client.call(&self.iface_name, func_name, params)
    }
}
