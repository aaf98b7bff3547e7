//! Batched calls: collect requests, send once, read results in request
//! order.

use crate::client::Client;
use crate::error::RpcError;
use crate::error::ERR_INVALID_REQ;
use crate::error::ERR_INVALID_RESP;
use crate::jsonrpc::Request;
use serde_json::Value;
use std::collections::HashMap;

/// Accumulates requests without sending them.
///
/// Ids are assigned by the client's id generator as calls are added;
/// [`send`] submits the whole array through the transport. A batch can be
/// sent once, and no calls can be added afterwards.
///
/// [`send`]: Batch::send
pub struct Batch<'a> {
    client: &'a Client,
    requests: Vec<Request>,
    methods: Vec<(String, String)>,
    sent: bool,
}

impl<'a> Batch<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self {
            client,
            requests: Vec::new(),
            methods: Vec::new(),
            sent: false,
        }
    }

    /// Queue one call, returning its assigned request id.
    pub fn add(
        &mut self,
        iface_name: &str,
        func_name: &str,
        params: Vec<Value>,
    ) -> Result<Value, RpcError> {
        if self.sent {
            return Err(RpcError::new(
                ERR_INVALID_REQ,
                "Batch already sent. Cannot add more calls.",
            ));
        }
        let request = self.client.to_request(iface_name, func_name, params)?;
        let id = request.id.clone().unwrap_or(Value::Null);
        self.methods
            .push((iface_name.to_string(), func_name.to_string()));
        self.requests.push(request);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Submit the accumulated requests as one JSON-RPC batch array.
    pub fn send(&mut self) -> Result<BatchResult<'a>, RpcError> {
        if self.sent {
            return Err(RpcError::new(
                ERR_INVALID_REQ,
                "Batch already sent. Cannot send() again.",
            ));
        }
        self.sent = true;

        let request =
            serde_json::to_value(&self.requests).expect("requests always serialize");
        let response = self.client.transport().request(&request)?;

        let Value::Array(responses) = response else {
            return Err(RpcError::new(
                ERR_INVALID_RESP,
                format!("batch response is not an array: {response}"),
            ));
        };
        if responses.len() != self.requests.len() {
            return Err(RpcError::new(
                ERR_INVALID_RESP,
                format!(
                    "Batch response length {} != request {}",
                    responses.len(),
                    self.requests.len()
                ),
            ));
        }

        // index responses by id, then walk the requests so results come
        // back in request order with every id accounted for
        let mut by_id: HashMap<String, Value> = responses
            .into_iter()
            .map(|r| (id_key(r.get("id")), r))
            .collect();
        let mut ordered = Vec::with_capacity(self.requests.len());
        for request in &self.requests {
            let id = request.id.clone().unwrap_or(Value::Null);
            let Some(resp) = by_id.remove(&id_key(Some(&id))) else {
                return Err(RpcError::new(
                    ERR_INVALID_RESP,
                    format!("Batch response missing result for request id: {id}"),
                ));
            };
            ordered.push(resp);
        }

        Ok(BatchResult {
            client: self.client,
            responses: ordered,
            methods: std::mem::take(&mut self.methods),
        })
    }
}

/// Results of a sent batch, indexed positionally in request order.
pub struct BatchResult<'a> {
    client: &'a Client,
    responses: Vec<Value>,
    methods: Vec<(String, String)>,
}

impl std::fmt::Debug for BatchResult<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchResult")
            .field("responses", &self.responses)
            .field("methods", &self.methods)
            .finish()
    }
}

impl BatchResult<'_> {
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// The result of the i-th queued call. Response validation is applied
    /// per the called function, and typed errors surface here.
    pub fn get(&self, i: usize) -> Result<Value, RpcError> {
        let response = self.responses.get(i).ok_or_else(|| {
            RpcError::new(
                ERR_INVALID_RESP,
                format!("{i} >= result size: {}", self.responses.len()),
            )
        })?;
        let (iface_name, func_name) = &self.methods[i];
        self.client.to_result(iface_name, func_name, response)
    }
}

/// Ids may be any JSON value; key the index by their canonical encoding.
fn id_key(id: Option<&Value>) -> String {
    id.unwrap_or(&Value::Null).to_string()
}
