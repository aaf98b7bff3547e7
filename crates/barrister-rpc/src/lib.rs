#![doc = include_str!("../README.md")]

mod batch;
mod client;
mod contract;
mod error;
mod idgen;
mod jsonrpc;
mod server;
mod transport;

pub use crate::batch::Batch;
pub use crate::batch::BatchResult;
pub use crate::client::Client;
pub use crate::client::ClientBuilder;
pub use crate::client::InterfaceProxy;
pub use crate::contract::Contract;
pub use crate::error::RpcError;
pub use crate::error::ERR_INTERNAL;
pub use crate::error::ERR_INVALID_PARAMS;
pub use crate::error::ERR_INVALID_REQ;
pub use crate::error::ERR_INVALID_RESP;
pub use crate::error::ERR_METHOD_NOT_FOUND;
pub use crate::error::ERR_PARSE;
pub use crate::error::ERR_UNKNOWN;
pub use crate::idgen::IdGenerator;
pub use crate::idgen::RandomId;
pub use crate::idgen::SequenceId;
pub use crate::jsonrpc::ErrorObject;
pub use crate::jsonrpc::Request;
pub use crate::jsonrpc::Response;
pub use crate::jsonrpc::IDL_METHOD;
pub use crate::jsonrpc::JSONRPC_VERSION;
pub use crate::server::Handler;
pub use crate::server::Server;
pub use crate::transport::HttpTransport;
pub use crate::transport::InProcTransport;
pub use crate::transport::Transport;
