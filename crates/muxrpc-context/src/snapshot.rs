//! Serializable view of a context's headers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ContextConfig;
use crate::context::RequestContext;
use crate::headers;

/// Both header maps of a context, sorted by key.
///
/// Used for logging a call's headers and for carrying a captured context
/// through JSON tooling. Request headers include the reserved keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub response_headers: BTreeMap<String, String>,
}

impl ContextSnapshot {
    /// Rebuild a context from a captured snapshot.
    ///
    /// Every entry is applied through the normal header operations, so a
    /// malformed `_opid` is carried over and reported when decoded. A missing
    /// or empty `_cid` is generated from `config`.
    pub fn into_context(self, config: &ContextConfig) -> RequestContext {
        let mut request_headers = self.request_headers;
        let correlation_id = request_headers
            .remove(headers::CORRELATION_ID)
            .unwrap_or_default();
        let mut ctx = RequestContext::with_config(correlation_id, config);
        ctx.add_request_headers(request_headers);
        for (key, value) in self.response_headers {
            ctx.add_response_header(key, value);
        }
        ctx
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
