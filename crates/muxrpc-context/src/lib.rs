//! muxrpc request context
//!
//! Per-call context for a multiplexed RPC framework. A context carries the
//! correlation id that ties one logical call together across hops, the
//! operation id the multiplexer uses to route an out-of-order response back
//! to its caller, and the request/response header maps that transport both.
//!
//! The context does no I/O. Transports and multiplexers read and write its
//! headers; the reserved key names live in [`headers`].

pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod headers;
pub mod sequence;
pub mod shared;
pub mod snapshot;

pub use config::ContextConfig;
pub use context::RequestContext;
pub use error::ContextError;
pub use generator::{CorrelationIdGenerator, UuidGenerator};
pub use headers::Headers;
pub use sequence::{OpIdSequence, UNASSIGNED_OP_ID};
pub use shared::SharedContext;
pub use snapshot::ContextSnapshot;
