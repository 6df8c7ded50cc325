// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

use rand::Rng;
use serde::Serialize;

use super::transaction_id::TransactionId;

/// Sentinel `parent_span_id` marking a root span with no upstream parent.
pub const NO_PARENT_SPAN_ID: i64 = -1;

/// Identity of this process's span within one distributed trace.
///
/// `span_id` names the span this process records; `parent_span_id` links back
/// to the span in the upstream process, or holds [`NO_PARENT_SPAN_ID`] when
/// the trace was rooted here. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceId {
    pub transaction_id: TransactionId,
    pub span_id: i64,
    pub parent_span_id: i64,
    pub flag: i32,
}

impl TraceId {
    /// Trace id for a transaction rooted in this process.
    pub fn new_root(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            span_id: next_span_id(),
            parent_span_id: NO_PARENT_SPAN_ID,
            flag: 0,
        }
    }

    /// Trace id continuing a transaction begun upstream. `span_id` is the id
    /// the upstream process chose for this process's span.
    pub fn continued(
        transaction_id: TransactionId,
        span_id: i64,
        parent_span_id: i64,
        flag: i32,
    ) -> Self {
        Self {
            transaction_id,
            span_id,
            parent_span_id,
            flag,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_span_id == NO_PARENT_SPAN_ID
    }
}

/// Random positive span id, unique enough within one transaction.
pub fn next_span_id() -> i64 {
    rand::thread_rng().gen_range(1..i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::{next_span_id, TraceId, NO_PARENT_SPAN_ID};
    use crate::context::transaction_id::TransactionId;

    fn transaction_id() -> TransactionId {
        TransactionId {
            agent_id: "agent".to_string(),
            agent_start_time: 1000,
            sequence: 0,
        }
    }

    #[test]
    fn test_root_has_no_parent() {
        let trace_id = TraceId::new_root(transaction_id());
        assert!(trace_id.is_root());
        assert_eq!(trace_id.parent_span_id, NO_PARENT_SPAN_ID);
        assert!(trace_id.span_id > 0);
    }

    #[test]
    fn test_continued_keeps_upstream_identity() {
        let trace_id = TraceId::continued(transaction_id(), 2, 3, 0);
        assert!(!trace_id.is_root());
        assert_eq!(trace_id.span_id, 2);
        assert_eq!(trace_id.parent_span_id, 3);
    }

    #[test]
    fn test_span_ids_are_positive() {
        for _ in 0..64 {
            assert!(next_span_id() > 0);
        }
    }
}
