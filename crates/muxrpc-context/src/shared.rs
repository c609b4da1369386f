//! Shared handle for contexts read by more than one task.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::RequestContext;
use crate::error::ContextError;
use crate::headers::Headers;
use crate::snapshot::ContextSnapshot;

/// Cloneable, lock-protected [`RequestContext`].
///
/// Reads hand out copies so no lock is held past the call. Uses
/// `parking_lot::RwLock` (sync) so it works from both sync and async code;
/// never hold the guard from [`SharedContext::update`] across an await.
#[derive(Debug, Clone)]
pub struct SharedContext {
    inner: Arc<RwLock<RequestContext>>,
}

impl SharedContext {
    pub fn new(ctx: RequestContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ctx)),
        }
    }

    pub fn correlation_id(&self) -> String {
        self.inner.read().correlation_id().to_owned()
    }

    pub fn op_id(&self) -> Result<u64, ContextError> {
        self.inner.read().op_id()
    }

    pub fn add_request_header(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.write().add_request_header(key, value);
    }

    pub fn add_response_header(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.write().add_response_header(key, value);
    }

    pub fn request_header(&self, key: &str) -> Option<String> {
        self.inner.read().request_header(key).map(|v| v.into_owned())
    }

    pub fn response_header(&self, key: &str) -> Option<String> {
        self.inner.read().response_header(key).map(str::to_owned)
    }

    pub fn request_headers(&self) -> Headers {
        self.inner.read().request_headers()
    }

    pub fn response_headers(&self) -> Headers {
        self.inner.read().response_headers()
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        self.inner.read().snapshot()
    }

    /// Run `f` with exclusive access to the context.
    pub fn update<R>(&self, f: impl FnOnce(&mut RequestContext) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Copy of the current context.
    pub fn to_context(&self) -> RequestContext {
        self.inner.read().clone()
    }
}

impl From<RequestContext> for SharedContext {
    fn from(ctx: RequestContext) -> Self {
        Self::new(ctx)
    }
}
