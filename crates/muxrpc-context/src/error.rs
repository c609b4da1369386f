//! Context error types.

use thiserror::Error;

use crate::headers;

/// Errors raised when decoding reserved header values.
///
/// Construction and plain header access never fail. These only surface when
/// a caller asks for a typed reserved value that some layer stored in a
/// form the framework cannot route with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("invalid operation id {value:?} in `{header}`: {reason}", header = headers::OP_ID)]
    InvalidOpId { value: String, reason: String },

    #[error("operation id header `{header}` is missing", header = headers::OP_ID)]
    MissingOpId,

    #[error("invalid timeout {value:?} in `{header}`: {reason}", header = headers::TIMEOUT)]
    InvalidTimeout { value: String, reason: String },

    #[error("response operation id {actual} does not match request operation id {expected}")]
    OpIdMismatch { expected: u64, actual: u64 },
}

impl ContextError {
    /// Whether the error means a response cannot be routed to its caller.
    pub fn is_routing_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidOpId { .. } | Self::MissingOpId | Self::OpIdMismatch { .. }
        )
    }
}
