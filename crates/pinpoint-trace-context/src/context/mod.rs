// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

//! Trace data model: identifiers, spans, recorders, and the per-request trace
//! object driven by instrumentation call sites.

use std::time::{SystemTime, UNIX_EPOCH};

pub mod method_descriptor;
pub mod service_type;
pub mod span;
pub mod span_event_recorder;
pub mod trace;
pub mod trace_context;
pub mod trace_id;
pub mod transaction_id;

/// Wall-clock time in epoch milliseconds.
///
/// Span timing is millisecond-granular wall-clock time so that spans from
/// different processes line up on one timeline.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
