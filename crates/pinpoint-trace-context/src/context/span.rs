// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

//! Finished-span data model handed to the transport layer.

use serde::Serialize;

use super::service_type;
use super::trace_id::TraceId;
use crate::config::Config;

/// Captured application error, recorded as trace metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    pub error_kind: String,
    pub message: String,
}

/// One timed unit of work inside a span: a single instrumented call.
///
/// Exclusively owned by its [`Span`]. `sequence` is the event's position in
/// the owning span's event list and doubles as its index there. `end_elapsed`
/// is `None` while the event is open; an event still open when the span is
/// finalized keeps the `None` sentinel and the span is flagged incomplete.
#[derive(Debug, Clone, Serialize)]
pub struct SpanEvent {
    pub sequence: u32,
    /// Nesting level, taken from the trace's call depth at creation time.
    pub depth: i32,
    pub start_time: i64,
    pub end_elapsed: Option<i64>,
    pub service_type: i32,
    pub api_id: Option<i32>,
    /// Free-form call-site description, used when no method descriptor could
    /// be resolved (dynamic or anonymous call sites).
    pub api_desc: Option<String>,
    pub exception_info: Option<ExceptionInfo>,
}

impl SpanEvent {
    pub(crate) fn open(sequence: u32, depth: i32, start_time: i64) -> Self {
        Self {
            sequence,
            depth,
            start_time,
            end_elapsed: None,
            service_type: service_type::UNKNOWN,
            api_id: None,
            api_desc: None,
            exception_info: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.end_elapsed.is_some()
    }
}

/// Root timing and identity record for one traced transaction in this
/// process.
///
/// Created when the trace begins, mutated only by appending and closing span
/// events, and finalized into an immutable value when the outermost block
/// ends. The finalized span is what crosses the transport seam.
#[derive(Debug, Clone, Serialize)]
pub struct Span {
    pub trace_id: TraceId,
    pub agent_id: String,
    pub application_name: String,
    pub service_type: i32,
    pub rpc: Option<String>,
    pub end_point: Option<String>,
    pub remote_address: Option<String>,
    pub parent_application_name: Option<String>,
    pub parent_application_type: Option<i32>,
    pub start_time: i64,
    pub elapsed_time: i64,
    pub span_events: Vec<SpanEvent>,
    /// True once any recorded exception was flagged as failing the request.
    pub err: bool,
    /// True when the trace was abandoned with open events or its event stack
    /// was found corrupted.
    pub incomplete: bool,
}

impl Span {
    pub(crate) fn new(trace_id: TraceId, config: &Config, start_time: i64) -> Self {
        Self {
            trace_id,
            agent_id: config.agent_id.clone(),
            application_name: config.application_name.clone(),
            service_type: config.service_type,
            rpc: None,
            end_point: None,
            remote_address: None,
            parent_application_name: None,
            parent_application_type: None,
            start_time,
            elapsed_time: 0,
            span_events: Vec::new(),
            err: false,
            incomplete: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SpanEvent;

    #[test]
    fn test_open_event_has_no_elapsed_time() {
        let event = SpanEvent::open(0, 0, 1000);
        assert!(!event.is_closed());
        assert_eq!(event.sequence, 0);
        assert_eq!(event.depth, 0);
    }
}
