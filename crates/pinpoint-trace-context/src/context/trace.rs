// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

//! Per-request trace object and the block-nesting primitive.
//!
//! Instrumentation call sites wrap the code they instrument between
//! [`Trace::trace_block_begin`] and [`Trace::trace_block_end`], regardless of
//! success or failure, and run inside hot request paths they must never
//! break. Everything here therefore degrades instead of panicking: mismatched
//! ends are logged and absorbed, and an abandoned trace is finalized with its
//! open events left unterminated rather than failing.
//!
//! A `Trace` is owned exclusively by the call chain of its originating
//! request and is carried through that request's execution explicitly. It is
//! `Send` so a block may begin and end on different workers, as long as the
//! per-request ordering is preserved.

use tracing::warn;

use super::now_millis;
use super::span::Span;
use super::span_event_recorder::{ActiveRecorder, SpanEventRecorder};
use super::trace_id::TraceId;

/// Per-request trace scope.
///
/// `Disabled` stands in when sampling turned the request away; its
/// operations are all no-ops and its recorders are inert.
#[derive(Debug)]
pub enum Trace {
    Sampled(SampledTrace),
    Disabled,
}

/// State of an actively recorded trace.
#[derive(Debug)]
pub struct SampledTrace {
    span: Span,
    /// Sequences of currently open span events, innermost last.
    call_stack: Vec<u32>,
    current_depth: i32,
}

impl Trace {
    pub(crate) fn sampled(span: Span) -> Self {
        Self::Sampled(SampledTrace {
            span,
            call_stack: Vec::new(),
            current_depth: 0,
        })
    }

    pub fn is_sampled(&self) -> bool {
        matches!(self, Self::Sampled(_))
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        match self {
            Self::Sampled(trace) => Some(&trace.span.trace_id),
            Self::Disabled => None,
        }
    }

    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::Sampled(trace) => Some(&trace.span),
            Self::Disabled => None,
        }
    }

    pub fn current_depth(&self) -> i32 {
        match self {
            Self::Sampled(trace) => trace.current_depth,
            Self::Disabled => 0,
        }
    }

    /// Opens a span event at the current call depth and returns the recorder
    /// bound to it. On a disabled trace this is a safe no-op returning an
    /// inert recorder.
    pub fn trace_block_begin(&mut self) -> SpanEventRecorder {
        match self {
            Self::Sampled(trace) => trace.block_begin(),
            Self::Disabled => SpanEventRecorder::inactive(),
        }
    }

    /// Closes the span event bound to `recorder`: marks its elapsed time,
    /// applies the recorder's buffered mutations, and pops the event stack.
    ///
    /// Caller-contract violations degrade instead of failing the request: an
    /// end with no open event is logged and ignored, and an end whose
    /// recorder does not match the top of the stack closes the top-of-stack
    /// event anyway and flags the span incomplete.
    pub fn trace_block_end(&mut self, recorder: SpanEventRecorder) {
        match self {
            Self::Sampled(trace) => trace.block_end(recorder),
            Self::Disabled => {}
        }
    }

    /// Finalizes the trace and yields the finished span, or `None` for a
    /// disabled trace. Open events keep their unterminated sentinel and flag
    /// the span incomplete.
    pub fn close(self) -> Option<Span> {
        match self {
            Self::Sampled(mut trace) => {
                trace.span.elapsed_time = (now_millis() - trace.span.start_time).max(0);
                if !trace.call_stack.is_empty() {
                    warn!(
                        open_events = trace.call_stack.len(),
                        "trace closed with unterminated span events"
                    );
                    trace.span.incomplete = true;
                }
                Some(trace.span)
            }
            Self::Disabled => None,
        }
    }
}

impl SampledTrace {
    fn block_begin(&mut self) -> SpanEventRecorder {
        let sequence = self.span.span_events.len() as u32;
        let start_time = now_millis();
        self.span
            .span_events
            .push(super::span::SpanEvent::open(
                sequence,
                self.current_depth,
                start_time,
            ));
        self.call_stack.push(sequence);
        self.current_depth += 1;
        SpanEventRecorder::active(sequence, start_time)
    }

    fn block_end(&mut self, recorder: SpanEventRecorder) {
        let mut rec = match recorder {
            SpanEventRecorder::Active(rec) => rec,
            SpanEventRecorder::Inactive => {
                // A recorder from a begin that saw no trace; nothing to close.
                return;
            }
        };

        let Some(top) = self.call_stack.pop() else {
            warn!("trace block end without a matching begin");
            return;
        };
        self.current_depth = (self.current_depth - 1).max(0);

        if rec.end_elapsed.is_none() {
            rec.end_elapsed = Some((now_millis() - rec.start_time).max(0));
        }

        if top != rec.sequence {
            warn!(
                expected = top,
                got = rec.sequence,
                "span event stack mismatch, closing top of stack"
            );
            self.span.incomplete = true;
            self.close_event_unconditionally(top);
            return;
        }

        self.apply_recorder(top, rec);
    }

    /// Event sequence equals its index in `span_events`; both are assigned
    /// from the list length at open time.
    fn apply_recorder(&mut self, sequence: u32, rec: ActiveRecorder) {
        let Some(event) = self.span.span_events.get_mut(sequence as usize) else {
            warn!(sequence, "open span event missing from its span");
            return;
        };
        if let Some(service_type) = rec.service_type {
            event.service_type = service_type;
        }
        if rec.api_id.is_some() {
            event.api_id = rec.api_id;
        }
        if rec.api_desc.is_some() {
            event.api_desc = rec.api_desc;
        }
        if rec.exception.is_some() {
            event.exception_info = rec.exception;
        }
        if rec.failed {
            self.span.err = true;
        }
        event.end_elapsed = rec.end_elapsed;
    }

    fn close_event_unconditionally(&mut self, sequence: u32) {
        let Some(event) = self.span.span_events.get_mut(sequence as usize) else {
            warn!(sequence, "open span event missing from its span");
            return;
        };
        if event.end_elapsed.is_none() {
            event.end_elapsed = Some((now_millis() - event.start_time).max(0));
        }
    }
}
