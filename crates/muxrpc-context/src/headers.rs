//! Reserved header names and the header map type.
//!
//! These keys are owned by the framework. Transports and multiplexers must
//! use them verbatim to stay wire-compatible; every other key is
//! application metadata and is carried through untouched.

use std::collections::HashMap;

/// Header map carried on either side of a call.
pub type Headers = HashMap<String, String>;

/// Correlation id (opaque string).
pub const CORRELATION_ID: &str = "_cid";

/// Operation id (decimal string encoding a `u64`).
pub const OP_ID: &str = "_opid";

/// Request timeout in milliseconds (decimal string).
pub const TIMEOUT: &str = "_timeout";

/// Timeout carried by a fresh context unless configured otherwise.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// All request-side keys backed by typed fields.
pub const RESERVED: [&str; 3] = [CORRELATION_ID, OP_ID, TIMEOUT];

pub fn is_reserved(key: &str) -> bool {
    RESERVED.contains(&key)
}
