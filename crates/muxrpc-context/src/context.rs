//! Request context: per-call state threaded through every hop of an RPC.
//!
//! A [`RequestContext`] is created once by the code that originates a call
//! and handed to every layer the call crosses. Layers append headers on the
//! way out (request side) and on the way back (response side). The
//! multiplexer reads the operation id to tag outgoing frames and to route the
//! matching response back to the waiting caller.
//!
//! The reserved request keys (`_cid`, `_opid`, `_timeout`) live in typed
//! fields rather than in the generic map. They are merged into the map view
//! on read, and writes through [`RequestContext::add_request_header`] with a
//! reserved key land in the typed field, so the accessor and the header view
//! can never disagree.

use std::borrow::Cow;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ContextConfig;
use crate::error::ContextError;
use crate::generator::{CorrelationIdGenerator, UuidGenerator};
use crate::headers::{self, DEFAULT_TIMEOUT_MS, Headers};
use crate::snapshot::ContextSnapshot;

/// Numeric reserved header value.
///
/// Canonical decimals are held as numbers. Anything else is held verbatim so
/// the header view reports exactly what was set; decoding it fails on read.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Numeric {
    Value(u64),
    Raw(String),
}

impl Numeric {
    fn from_header(value: &str) -> Self {
        match decode_decimal(value) {
            Ok(n) if n.to_string() == value => Self::Value(n),
            _ => Self::Raw(value.to_owned()),
        }
    }

    fn render(&self) -> Cow<'_, str> {
        match self {
            Self::Value(n) => Cow::Owned(n.to_string()),
            Self::Raw(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Returns the offending value and the reason on failure.
    fn decode(&self) -> Result<u64, (String, String)> {
        match self {
            Self::Value(n) => Ok(*n),
            Self::Raw(s) => decode_decimal(s).map_err(|reason| (s.clone(), reason)),
        }
    }
}

/// Strict unsigned decimal: ASCII digits only, no sign, no whitespace.
fn decode_decimal(value: &str) -> Result<u64, String> {
    if value.is_empty() {
        return Err("empty value".into());
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err("not an unsigned decimal integer".into());
    }
    value.parse::<u64>().map_err(|e| e.to_string())
}

fn duration_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// Context for a single logical RPC call.
///
/// Not synchronized. Wrap it in a [`SharedContext`](crate::SharedContext)
/// when another task needs to read headers while the call is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Correlation id, exposed as `_cid`.
    correlation_id: String,
    /// Operation id, exposed as `_opid`. `0` until the multiplexer assigns one.
    op_id: Numeric,
    /// Timeout in milliseconds, exposed as `_timeout`.
    timeout: Numeric,
    /// Application request headers (reserved keys excluded)
    request_headers: Headers,
    /// Response headers, no reserved keys.
    response_headers: Headers,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("")
    }
}

impl RequestContext {
    /// Create a context. An empty `correlation_id` is replaced by a random
    /// UUID.
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self::build(
            correlation_id.into(),
            &UuidGenerator,
            Duration::from_millis(DEFAULT_TIMEOUT_MS),
        )
    }

    /// Create a context, drawing an id from `generator` if `correlation_id`
    /// is empty.
    pub fn with_generator(
        correlation_id: impl Into<String>,
        generator: &dyn CorrelationIdGenerator,
    ) -> Self {
        Self::build(
            correlation_id.into(),
            generator,
            Duration::from_millis(DEFAULT_TIMEOUT_MS),
        )
    }

    pub fn with_config(correlation_id: impl Into<String>, config: &ContextConfig) -> Self {
        Self::build(
            correlation_id.into(),
            &*config.generator,
            config.default_timeout,
        )
    }

    fn build(
        correlation_id: String,
        generator: &dyn CorrelationIdGenerator,
        timeout: Duration,
    ) -> Self {
        let correlation_id = if correlation_id.is_empty() {
            let generated = generator.generate();
            debug!("Generated correlation id: {generated}");
            generated
        } else {
            correlation_id
        };

        Self {
            correlation_id,
            op_id: Numeric::Value(0),
            timeout: Numeric::Value(duration_millis(timeout)),
            request_headers: Headers::new(),
            response_headers: Headers::new(),
        }
    }

    /// Rebuild a context on the receiving side from the request headers that
    /// arrived with a frame.
    ///
    /// The request must carry a valid `_opid`. It is echoed into the response
    /// headers together with `_cid` so the caller's multiplexer can route the
    /// reply. A missing or empty `_cid` is generated from `config`.
    pub fn from_request_headers(
        mut incoming: Headers,
        config: &ContextConfig,
    ) -> Result<Self, ContextError> {
        let op_id = match incoming.get(headers::OP_ID) {
            Some(raw) => decode_decimal(raw).map_err(|reason| ContextError::InvalidOpId {
                value: raw.clone(),
                reason,
            })?,
            None => return Err(ContextError::MissingOpId),
        };

        let correlation_id = incoming
            .remove(headers::CORRELATION_ID)
            .unwrap_or_default();
        let mut ctx = Self::with_config(correlation_id, config);
        ctx.add_request_headers(incoming);

        let correlation_id = ctx.correlation_id.clone();
        ctx.set_response_op_id(op_id)
            .add_response_header(headers::CORRELATION_ID, correlation_id);
        Ok(ctx)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reserved values
    // ─────────────────────────────────────────────────────────────────────

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Decode the request operation id.
    ///
    /// Fails when `_opid` was set to something that is not an unsigned 64-bit
    /// decimal. Never falls back to zero.
    pub fn op_id(&self) -> Result<u64, ContextError> {
        self.op_id
            .decode()
            .map_err(|(value, reason)| ContextError::InvalidOpId { value, reason })
    }

    /// Assign the request operation id. Called by the multiplexer.
    pub fn set_op_id(&mut self, op_id: u64) -> &mut Self {
        self.op_id = Numeric::Value(op_id);
        self
    }

    pub fn timeout(&self) -> Result<Duration, ContextError> {
        self.timeout_ms().map(Duration::from_millis)
    }

    /// Timeout as carried in `_timeout`, in whole milliseconds.
    pub fn timeout_ms(&self) -> Result<u64, ContextError> {
        self.timeout
            .decode()
            .map_err(|(value, reason)| ContextError::InvalidTimeout { value, reason })
    }

    /// Set the timeout carried to the peer. Sub-millisecond precision is
    /// truncated.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Numeric::Value(duration_millis(timeout));
        self
    }

    /// Decode the operation id echoed in the response headers.
    pub fn response_op_id(&self) -> Result<u64, ContextError> {
        let raw = self
            .response_headers
            .get(headers::OP_ID)
            .ok_or(ContextError::MissingOpId)?;
        decode_decimal(raw).map_err(|reason| ContextError::InvalidOpId {
            value: raw.clone(),
            reason,
        })
    }

    pub fn set_response_op_id(&mut self, op_id: u64) -> &mut Self {
        self.response_headers
            .insert(headers::OP_ID.to_string(), op_id.to_string());
        self
    }

    // ─────────────────────────────────────────────────────────────────────
    // Request headers
    // ─────────────────────────────────────────────────────────────────────

    /// Insert or overwrite a request header.
    ///
    /// Reserved keys rebind the typed values: `_cid` changes
    /// [`correlation_id`](Self::correlation_id), `_opid` changes
    /// [`op_id`](Self::op_id), `_timeout` changes [`timeout`](Self::timeout).
    pub fn add_request_header(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            headers::CORRELATION_ID => self.correlation_id = value,
            headers::OP_ID => {
                self.op_id = Numeric::from_header(&value);
                if let Err((value, reason)) = self.op_id.decode() {
                    warn!("Malformed operation id stored in {}: {value:?} ({reason})", headers::OP_ID);
                }
            }
            headers::TIMEOUT => {
                self.timeout = Numeric::from_header(&value);
                if let Err((value, reason)) = self.timeout.decode() {
                    warn!("Malformed timeout stored in {}: {value:?} ({reason})", headers::TIMEOUT);
                }
            }
            _ => {
                self.request_headers.insert(key, value);
            }
        }
        self
    }

    pub fn add_request_headers<I, K, V>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in entries {
            self.add_request_header(key, value);
        }
        self
    }

    /// Look up a request header. `None` means absent; an empty string means
    /// present but empty.
    pub fn request_header(&self, key: &str) -> Option<Cow<'_, str>> {
        match key {
            headers::CORRELATION_ID => Some(Cow::Borrowed(self.correlation_id.as_str())),
            headers::OP_ID => Some(self.op_id.render()),
            headers::TIMEOUT => Some(self.timeout.render()),
            _ => self.request_headers.get(key).map(|v| Cow::Borrowed(v.as_str())),
        }
    }

    /// Snapshot of all request headers, reserved keys included.
    ///
    /// The returned map is a copy; mutating it does not affect the context.
    pub fn request_headers(&self) -> Headers {
        let mut all = self.request_headers.clone();
        all.insert(headers::CORRELATION_ID.to_string(), self.correlation_id.clone());
        all.insert(headers::OP_ID.to_string(), self.op_id.render().into_owned());
        all.insert(headers::TIMEOUT.to_string(), self.timeout.render().into_owned());
        all
    }

    // ─────────────────────────────────────────────────────────────────────
    // Response headers
    // ─────────────────────────────────────────────────────────────────────

    /// Insert or overwrite a response header. No key is reserved here.
    pub fn add_response_header(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.response_headers.insert(key.into(), value.into());
        self
    }

    pub fn response_header(&self, key: &str) -> Option<&str> {
        self.response_headers.get(key).map(String::as_str)
    }

    /// Snapshot of all response headers.
    pub fn response_headers(&self) -> Headers {
        self.response_headers.clone()
    }

    /// Apply the response headers that came back with a reply.
    ///
    /// If the reply carries `_opid` it must match this call's operation id,
    /// otherwise the multiplexer delivered someone else's response and
    /// nothing is merged.
    pub fn merge_response_headers(&mut self, incoming: Headers) -> Result<(), ContextError> {
        if let Some(raw) = incoming.get(headers::OP_ID) {
            let actual = decode_decimal(raw).map_err(|reason| ContextError::InvalidOpId {
                value: raw.clone(),
                reason,
            })?;
            let expected = self.op_id()?;
            if actual != expected {
                warn!(
                    "Response op id mismatch for {}: expected {expected}, got {actual}",
                    self.correlation_id
                );
                return Err(ContextError::OpIdMismatch { expected, actual });
            }
        }
        self.response_headers.extend(incoming);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Derived contexts
    // ─────────────────────────────────────────────────────────────────────

    /// Copy of this context for a retried call.
    ///
    /// Keeps the correlation id, timeout and application request headers.
    /// The operation id goes back to `0` so the multiplexer assigns a fresh
    /// one, and the response side starts empty.
    pub fn fork(&self) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            op_id: Numeric::Value(0),
            timeout: self.timeout.clone(),
            request_headers: self.request_headers.clone(),
            response_headers: Headers::new(),
        }
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            request_headers: self.request_headers().into_iter().collect(),
            response_headers: self.response_headers.clone().into_iter().collect(),
        }
    }
}
