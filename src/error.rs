use ethers::types::H256;
use serde::Deserialize;
use serde_json::Value;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the library reports.
///
/// Callers can match broadly (`Err(e)`) or narrowly on the variant, e.g. to tell an
/// unreachable bundler (`Transport`) apart from a rejected operation (`JsonRpc`).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never completed (DNS, connection refused, invalid URL, ...).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response without a JSON-RPC error object.
    #[error("HTTP error! status: {status}, message: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(transparent)]
    JsonRpc(#[from] JsonRpcError),

    /// The estimation call succeeded but its content is unusable.
    #[error("gas estimation failed: {0}")]
    GasEstimation(String),

    /// A vendor-specific sanity check failed before estimation was attempted.
    #[error("{vendor}: {message}")]
    VendorPrecondition {
        vendor: &'static str,
        message: String,
    },

    /// The call succeeded but the payload could not be decoded.
    #[error("invalid response to {method}: {message}")]
    InvalidResponse { method: String, message: String },

    #[error("operation builder failed: {0}")]
    Account(#[source] anyhow::Error),

    #[error("paymaster builder failed: {0}")]
    Paymaster(#[source] anyhow::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("waiting for receipt of user operation {0:?} was cancelled")]
    Cancelled(H256),
}

impl Error {
    pub(crate) fn invalid_response(method: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            method: method.to_string(),
            message: message.into(),
        }
    }

    /// True when the failure happened before any response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// The server's JSON-RPC error, if that is what this is.
    pub fn as_json_rpc(&self) -> Option<&JsonRpcError> {
        match self {
            Self::JsonRpc(e) => Some(e),
            _ => None,
        }
    }
}

/// A JSON-RPC `error` object, tagged with the method that produced it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonRpcError {
    #[serde(skip)]
    pub method: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
    /// Vendor-specific diagnostics (Alchemy, Pimlico, ...).
    #[serde(default)]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(
                f,
                "JSON-RPC Error: {} ({}): {}",
                self.method, code, self.message
            )?,
            None => write!(f, "JSON-RPC Error: {}: {}", self.method, self.message)?,
        }
        if let Some(data) = self.data.as_ref().filter(|d| !d.is_null()) {
            write!(f, " - {data}")?;
        }
        Ok(())
    }
}

impl std::error::Error for JsonRpcError {}

impl JsonRpcError {
    /// Decode a JSON-RPC `error` member. Non-object values become the message.
    pub(crate) fn from_value(method: &str, value: &Value) -> Self {
        let mut err = serde_json::from_value::<JsonRpcError>(value.clone()).unwrap_or_else(|_| {
            JsonRpcError {
                method: String::new(),
                code: None,
                message: value.to_string(),
                data: None,
            }
        });
        err.method = method.to_string();
        err
    }
}
