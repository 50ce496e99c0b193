//! Request/response envelopes exchanged with the data-access layer.
//!
//! A request names a dot-namespaced method and carries flat params plus a
//! correlation id. The response echoes that id and carries exactly one of a
//! result or an error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error codes used in [`RpcError`].
pub mod codes {
    pub const INVALID_PARAMS: i32 = -32602;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Data-store methods understood by the executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    PropertiesSearch,
    PropertiesCreate,
    PropertiesUpdate,
    PropertiesDelete,
    ResidentsSearch,
    ResidentsCreate,
    ResidentsUpdate,
    ResidentsDelete,
}

impl Method {
    pub const ALL: [Method; 8] = [
        Method::PropertiesSearch,
        Method::PropertiesCreate,
        Method::PropertiesUpdate,
        Method::PropertiesDelete,
        Method::ResidentsSearch,
        Method::ResidentsCreate,
        Method::ResidentsUpdate,
        Method::ResidentsDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::PropertiesSearch => "properties.search",
            Method::PropertiesCreate => "properties.create",
            Method::PropertiesUpdate => "properties.update",
            Method::PropertiesDelete => "properties.delete",
            Method::ResidentsSearch => "residents.search",
            Method::ResidentsCreate => "residents.create",
            Method::ResidentsUpdate => "residents.update",
            Method::ResidentsDelete => "residents.delete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| RpcError::method_not_found(s))
    }
}

/// Structured error carried by a [`ResponseEnvelope`].
///
/// `detail` is opaque diagnostic data for logs and is never shown to end users.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl RpcError {
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: codes::METHOD_NOT_FOUND,
            message: format!("Method not found: {}", method),
            detail: None,
        }
    }

    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self {
            code: codes::INVALID_PARAMS,
            message: "Invalid params".to_string(),
            detail: Some(Value::String(reason.into())),
        }
    }

    pub fn internal(detail: impl fmt::Display) -> Self {
        Self {
            code: codes::INTERNAL_ERROR,
            message: "Internal error".to_string(),
            detail: Some(Value::String(detail.to_string())),
        }
    }
}

/// A request to the data-access executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,
    pub correlation_id: String,
}

impl RequestEnvelope {
    pub fn new(
        method: impl Into<String>,
        params: serde_json::Map<String, Value>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            params,
            correlation_id: correlation_id.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Outcome {
    Result(Value),
    Error(RpcError),
}

/// The executor's reply to a [`RequestEnvelope`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    #[serde(flatten)]
    outcome: Outcome,
    pub correlation_id: String,
}

impl ResponseEnvelope {
    pub fn success(result: Value, correlation_id: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Result(result),
            correlation_id: correlation_id.into(),
        }
    }

    pub fn failure(error: RpcError, correlation_id: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Error(error),
            correlation_id: correlation_id.into(),
        }
    }

    pub fn from_result(
        result: Result<Value, RpcError>,
        correlation_id: impl Into<String>,
    ) -> Self {
        match result {
            Ok(value) => Self::success(value, correlation_id),
            Err(error) => Self::failure(error, correlation_id),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(v) => Some(v),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&RpcError> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(e) => Some(e),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }

    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.outcome {
            Outcome::Result(v) => Ok(v),
            Outcome::Error(e) => Err(e),
        }
    }
}
