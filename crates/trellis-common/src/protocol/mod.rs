pub mod envelope;
pub mod error;
pub mod method;


pub use envelope::{decode_response, encode_internal_error, encode_response, ResponseEnvelope};
pub use error::{
    error_is, find_rpc_error, BoxError, ErrorData, PanicError, Result, RpcError, TrellisError,
    INTERNAL_ERROR, INVALID_PARAMS, NOT_IMPLEMENTED, PARSE_ERROR,
};
pub use method::{MethodInfo, MethodSelector, ANY_METHOD};
