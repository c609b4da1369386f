//! Operation id allocation for one multiplexed connection.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::RequestContext;

/// Operation id that marks a context as not yet assigned.
pub const UNASSIGNED_OP_ID: u64 = 0;

/// Monotonic operation id source, one per connection.
///
/// Ids start at 1 and never repeat for the lifetime of the sequence, so two
/// outstanding requests on the same connection can't share an id. Wrapping
/// past `u64::MAX` is not handled.
#[derive(Debug)]
pub struct OpIdSequence {
    next_id: AtomicU64,
}

impl OpIdSequence {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(UNASSIGNED_OP_ID + 1),
        }
    }

    pub fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Draw the next id and write it into the context's `_opid`.
    pub fn assign(&self, ctx: &mut RequestContext) -> u64 {
        let op_id = self.next();
        ctx.set_op_id(op_id);
        op_id
    }
}

impl Default for OpIdSequence {
    fn default() -> Self {
        Self::new()
    }
}
