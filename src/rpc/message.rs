//! JSON-RPC 2.0 message shapes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::RpcError;

pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

/// Error object carried in a JSON-RPC error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: format!("method not found: {method}"),
            data: None,
        }
    }

    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: format!("invalid params: {detail}"),
            data: None,
        }
    }
}

impl From<RpcErrorObject> for RpcError {
    fn from(e: RpcErrorObject) -> Self {
        Self::Remote {
            code: e.code,
            message: e.message,
        }
    }
}

/// One decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Answer to one of our requests.
    Response {
        id: i64,
        result: Result<Value, RpcErrorObject>,
    },
    /// Peer-initiated call that expects an answer.
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    /// Peer-initiated fire-and-forget message.
    Notification { method: String, params: Value },
}

impl Incoming {
    /// Classify a decoded JSON value.
    pub fn parse(body: &[u8]) -> Result<Self, RpcError> {
        let mut value: Value = serde_json::from_slice(body)?;
        let Some(object) = value.as_object_mut() else {
            return Err(RpcError::Protocol("message is not a JSON object".into()));
        };

        let id = object.remove("id").filter(|id| !id.is_null());
        let params = object.remove("params").unwrap_or(Value::Null);

        if let Some(method) = object.get("method").and_then(Value::as_str) {
            let method = method.to_string();
            return Ok(match id {
                Some(id) => Self::Request { id, method, params },
                None => Self::Notification { method, params },
            });
        }

        let Some(id) = id.as_ref().and_then(Value::as_i64) else {
            return Err(RpcError::Protocol(
                "response without a numeric id".to_string(),
            ));
        };
        if let Some(error) = object.remove("error") {
            let error: RpcErrorObject = serde_json::from_value(error)?;
            return Ok(Self::Response {
                id,
                result: Err(error),
            });
        }
        let result = object.remove("result").unwrap_or(Value::Null);
        Ok(Self::Response {
            id,
            result: Ok(result),
        })
    }
}

pub fn request_body(id: i64, method: &str, params: Value) -> Result<Vec<u8>, RpcError> {
    Ok(serde_json::to_vec(&json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    }))?)
}

pub fn response_body(id: Value, result: Result<Value, RpcErrorObject>) -> Result<Vec<u8>, RpcError> {
    let message = match result {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(error) => json!({ "jsonrpc": "2.0", "id": id, "error": error }),
    };
    Ok(serde_json::to_vec(&message)?)
}
