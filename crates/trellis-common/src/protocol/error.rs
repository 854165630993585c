use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed error type returned by filters, handlers and transports.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Open key-value map carried in the `data` member of an error.
pub type ErrorData = serde_json::Map<String, serde_json::Value>;

/// Parse error - the request body is not valid JSON
pub const PARSE_ERROR: i32 = -32700;

/// Method not implemented by the service
pub const NOT_IMPLEMENTED: i32 = -32601;

/// Invalid params - the body decoded but does not fit the params type or failed validation
pub const INVALID_PARAMS: i32 = -32602;

/// Internal error - any other failure raised while handling the call
pub const INTERNAL_ERROR: i32 = -32603;

/// Structured error carried in the `error` member of a response envelope.
///
/// Negative codes are reserved for protocol faults; positive codes are
/// declared per service. Two errors are equal when their codes are equal,
/// so callers can classify a failure without caring about its details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "ErrorData::is_empty")]
    pub data: ErrorData,
    /// HTTP-equivalent status declared with the code. Never sent on the wire.
    #[serde(skip)]
    pub status_code: u16,
}

impl RpcError {
    /// Creates an error with the given code, fixed message and status tag.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis_common::protocol::RpcError;
    ///
    /// let err = RpcError::new(1000, "something wrong", 500);
    /// assert_eq!(err.code, 1000);
    /// assert!(err.details.is_empty());
    /// ```
    pub fn new(code: i32, message: impl Into<String>, status_code: u16) -> Self {
        Self {
            code,
            message: message.into(),
            details: String::new(),
            data: ErrorData::new(),
            status_code,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "parse error", 400)
    }

    pub fn invalid_params() -> Self {
        Self::new(INVALID_PARAMS, "invalid params", 422)
    }

    pub fn internal_error() -> Self {
        Self::new(INTERNAL_ERROR, "internal error", 500)
    }

    pub fn not_implemented() -> Self {
        Self::new(NOT_IMPLEMENTED, "not implemented", 501)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.set_data(key, value);
        self
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Returns true for codes in the reserved protocol band.
    pub fn is_protocol_error(&self) -> bool {
        self.code < 0
    }
}

impl PartialEq for RpcError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for RpcError {}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)?;
        if !self.details.is_empty() {
            write!(f, ": {}", self.details)?;
        }
        Ok(())
    }
}

impl StdError for RpcError {}

/// Walks `err` and its `source()` chain looking for an [`RpcError`] with
/// the same code as `target`.
///
/// # Example
///
/// ```
/// use trellis_common::protocol::{error_is, RpcError};
///
/// let err = RpcError::invalid_params().with_details("theField: value > 999");
/// assert!(error_is(&err, &RpcError::invalid_params()));
/// assert!(!error_is(&err, &RpcError::parse_error()));
/// ```
pub fn error_is(err: &(dyn StdError + 'static), target: &RpcError) -> bool {
    find_rpc_error(err).map_or(false, |found| found == target)
}

/// Returns the first [`RpcError`] found in the error chain, if any.
pub fn find_rpc_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a RpcError> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(rpc_error) = err.downcast_ref::<RpcError>() {
            return Some(rpc_error);
        }
        current = err.source();
    }
    None
}

/// A panic recovered at the dispatch boundary.
#[derive(Error, Debug)]
#[error("panic: {message}")]
pub struct PanicError {
    pub message: String,
    pub stack_trace: String,
}

impl PanicError {
    /// Builds a `PanicError` from the payload returned by `catch_unwind`,
    /// capturing the backtrace of the recovering frame.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_owned()
        };
        Self {
            message,
            stack_trace: Backtrace::force_capture().to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum TrellisError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Unexpected HTTP status: {0}")]
    UnexpectedStatus(u16),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid results: {0}")]
    InvalidResults(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(&'static str),

    #[error("Duplicate route: {0}")]
    DuplicateRoute(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Call to {full_method_name} failed (trace_id={trace_id:?}): {source}")]
    Call {
        full_method_name: &'static str,
        trace_id: String,
        #[source]
        source: BoxError,
    },
}

impl TrellisError {
    /// The protocol or application error carried by a failed call, if any.
    pub fn rpc_error(&self) -> Option<&RpcError> {
        find_rpc_error(self)
    }
}

pub type Result<T> = std::result::Result<T, TrellisError>;
