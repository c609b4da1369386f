//! Context configuration: generator and defaults shared by every context a
//! component creates.

use std::sync::Arc;
use std::time::Duration;

use crate::context::RequestContext;
use crate::generator::{CorrelationIdGenerator, UuidGenerator};
use crate::headers::DEFAULT_TIMEOUT_MS;

/// Configuration applied when constructing a [`RequestContext`].
///
/// Cheap to clone; the generator is shared.
#[derive(Clone)]
pub struct ContextConfig {
    /// Source of correlation ids for contexts created without one
    pub generator: Arc<dyn CorrelationIdGenerator>,
    /// Timeout written into `_timeout` on new contexts
    pub default_timeout: Duration,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            generator: Arc::new(UuidGenerator),
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl std::fmt::Debug for ContextConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextConfig")
            .field("generator", &"<dyn CorrelationIdGenerator>")
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generator<G: CorrelationIdGenerator + 'static>(mut self, generator: G) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Create a context under this configuration.
    pub fn new_context(&self, correlation_id: &str) -> RequestContext {
        RequestContext::with_config(correlation_id, self)
    }
}
