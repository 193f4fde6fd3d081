//! JSON-RPC 2.0 message types shared by the stdio transport and the test server.

pub mod types;

pub use types::{
    INVALID_PARAMS, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR, RpcError,
    RpcRequest, RpcResponse,
};
