use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, InvalidResponseError, Result, RpcFaultError};
use crate::jsonrpc::{JsonRpcError, JsonRpcRequest, RequestId, JSONRPC_VERSION};

/// JSON-RPC protocol revision spoken by a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "1.0")]
    V1,
    #[default]
    #[serde(rename = "2.0")]
    V2,
}

impl Protocol {
    /// Build a request expecting a response with the given id.
    pub fn request(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
        id: RequestId,
    ) -> JsonRpcRequest {
        match self {
            Self::V1 => JsonRpcRequest {
                jsonrpc: None,
                method: method.into(),
                params: Some(params.unwrap_or_else(|| Value::Array(Vec::new()))),
                id: Some(id),
            },
            Self::V2 => JsonRpcRequest::new(method, params, id),
        }
    }

    /// Build a notification, for which the server sends no response.
    pub fn notification(&self, method: impl Into<String>, params: Option<Value>) -> JsonRpcRequest {
        match self {
            Self::V1 => JsonRpcRequest {
                jsonrpc: None,
                method: method.into(),
                params: Some(params.unwrap_or_else(|| Value::Array(Vec::new()))),
                id: Some(RequestId::Null),
            },
            Self::V2 => JsonRpcRequest::notification(method, params),
        }
    }

    pub fn encode(&self, request: &JsonRpcRequest) -> Result<Vec<u8>> {
        serde_json::to_vec(request).map_err(Error::Encode)
    }

    /// Validate a raw response and extract its result.
    ///
    /// Structural problems and id mismatches yield
    /// [`InvalidResponseError`]; a well-formed error response yields
    /// [`RpcFaultError`].
    pub fn decode_response(&self, bytes: &[u8], expected_id: &RequestId) -> Result<Value> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| {
            InvalidResponseError::with_source(format!("Failed to decode response: {e}"), e)
        })?;

        let Value::Object(mut object) = value else {
            return Err(invalid("Response is not a JSON object"));
        };

        if *self == Self::V2 {
            if let Some(version) = object.get("jsonrpc") {
                if version.as_str() != Some(JSONRPC_VERSION) {
                    return Err(invalid(format!(
                        "Unsupported jsonrpc version in response: {version}"
                    )));
                }
            }
        }

        let error = object.remove("error").filter(|e| !e.is_null());
        let result = object.remove("result");

        if let Err(mismatch) = check_id(&object, expected_id) {
            // A server that could not read the request id answers with a
            // null id, which is only valid on an error response.
            let unread_request = error.is_some()
                && !result.as_ref().is_some_and(|r| !r.is_null())
                && object.get("id") == Some(&Value::Null);
            if !unread_request {
                return Err(mismatch);
            }
        }

        match (error, result) {
            (Some(_), Some(result)) if !result.is_null() => {
                Err(invalid("Response contains both result and error"))
            }
            (Some(error), _) => Err(self.fault(error)?.into()),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(invalid("Response contains neither result nor error")),
        }
    }

    /// Turn a non-null `error` member into a fault.
    fn fault(&self, error: Value) -> Result<RpcFaultError> {
        match self {
            Self::V2 => serde_json::from_value::<JsonRpcError>(error)
                .map(RpcFaultError::from)
                .map_err(|e| {
                    InvalidResponseError::with_source(format!("Malformed error object: {e}"), e)
                        .into()
                }),
            // 1.0 leaves the shape of `error` up to the server.
            Self::V1 => match serde_json::from_value::<JsonRpcError>(error.clone()) {
                Ok(err) => Ok(err.into()),
                Err(_) => {
                    let message = match &error {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    Ok(RpcFaultError::new(0, message, Some(error)))
                }
            },
        }
    }
}

fn check_id(object: &Map<String, Value>, expected: &RequestId) -> Result<()> {
    let raw = object
        .get("id")
        .ok_or_else(|| invalid("Response is missing an id"))?;
    let id = RequestId::from_value(raw)
        .ok_or_else(|| invalid(format!("Response id has an invalid type: {raw}")))?;

    if id != *expected {
        return Err(invalid(format!(
            "Response id mismatch: expected {expected}, got {id}"
        )));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> Error {
    InvalidResponseError::new(message).into()
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("1.0"),
            Self::V2 => f.write_str("2.0"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "1" | "1.0" => Ok(Self::V1),
            "2" | "2.0" => Ok(Self::V2),
            other => Err(format!("Unknown JSON-RPC version: {other}. Supported: 1.0, 2.0")),
        }
    }
}
