// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

//! Mutation API handed to instrumentation call sites for one span event.

use std::fmt::Display;

use super::method_descriptor::MethodDescriptor;
use super::now_millis;
use super::span::ExceptionInfo;

/// Recorder bound to exactly one span event for its lifetime.
///
/// `Active` recorders buffer their mutations and the owning
/// [`Trace`](super::trace::Trace) applies them when the block ends; this
/// keeps span events exclusively owned by their span while the begin and the
/// matching end may happen on different scheduling turns or workers.
///
/// `Inactive` is the recorder returned when tracing is not active for the
/// current request (sampled out, context lost across an async boundary).
/// All of its operations are no-ops, so call sites never branch on whether
/// tracing is enabled.
#[derive(Debug)]
pub enum SpanEventRecorder {
    Active(ActiveRecorder),
    Inactive,
}

/// Buffered state of an [`SpanEventRecorder::Active`] recorder.
#[derive(Debug)]
pub struct ActiveRecorder {
    pub(crate) sequence: u32,
    pub(crate) start_time: i64,
    pub(crate) service_type: Option<i32>,
    pub(crate) api_id: Option<i32>,
    pub(crate) api_desc: Option<String>,
    pub(crate) exception: Option<ExceptionInfo>,
    pub(crate) failed: bool,
    pub(crate) end_elapsed: Option<i64>,
}

impl SpanEventRecorder {
    pub(crate) fn active(sequence: u32, start_time: i64) -> Self {
        Self::Active(ActiveRecorder {
            sequence,
            start_time,
            service_type: None,
            api_id: None,
            api_desc: None,
            exception: None,
            failed: false,
            end_elapsed: None,
        })
    }

    pub fn inactive() -> Self {
        Self::Inactive
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// Sets the event's service type classification. Last write wins; later
    /// instrumentation layers such as error handling may overwrite it.
    pub fn record_service_type(&mut self, code: i32) {
        if let Self::Active(rec) = self {
            rec.service_type = Some(code);
        }
    }

    /// Records the resolved method descriptor's id for the event. Call sites
    /// should record either this or [`record_api_desc`](Self::record_api_desc),
    /// whichever they could resolve; last write wins if both are recorded.
    pub fn record_api(&mut self, descriptor: &MethodDescriptor) {
        if let Self::Active(rec) = self {
            rec.api_id = Some(descriptor.id);
        }
    }

    /// Records a free-form call-site description for dynamic or anonymous
    /// call sites that have no method descriptor.
    pub fn record_api_desc(&mut self, description: &str) {
        if let Self::Active(rec) = self {
            rec.api_desc = Some(description.to_string());
        }
    }

    /// Captures the error's type name and message as trace metadata. With
    /// `throwable` set, the owning span is flagged as failed when the block
    /// ends. The error value itself is untouched and still propagates through
    /// the wrapped call unchanged.
    pub fn record_exception<E>(&mut self, error: &E, throwable: bool)
    where
        E: Display + ?Sized,
    {
        if let Self::Active(rec) = self {
            rec.exception = Some(ExceptionInfo {
                error_kind: short_type_name::<E>().to_string(),
                message: error.to_string(),
            });
            if throwable {
                rec.failed = true;
            }
        }
    }

    /// Computes the event's elapsed time from its start. Last write wins; a
    /// repeated call overwrites rather than failing the trace.
    pub fn mark_elapsed_time(&mut self) {
        if let Self::Active(rec) = self {
            rec.end_elapsed = Some((now_millis() - rec.start_time).max(0));
        }
    }

    /// Elapsed time recorded so far, if any.
    pub fn end_elapsed(&self) -> Option<i64> {
        match self {
            Self::Active(rec) => rec.end_elapsed,
            Self::Inactive => None,
        }
    }
}

/// Last path segment of the concrete type name, e.g. `Utf8Error` for
/// `core::str::Utf8Error`.
fn short_type_name<E: ?Sized>() -> &'static str {
    let full = std::any::type_name::<E>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::SpanEventRecorder;
    use crate::context::method_descriptor::ApiMetaRegistry;

    #[test]
    fn test_inactive_recorder_is_inert() {
        let registry = ApiMetaRegistry::new(None);
        let descriptor = registry.get_or_create("express", "Router", "use");

        let mut recorder = SpanEventRecorder::inactive();
        recorder.record_service_type(6600);
        recorder.record_api(&descriptor);
        recorder.record_api_desc("anonymous middleware");
        recorder.record_exception("boom", true);
        recorder.mark_elapsed_time();

        assert!(!recorder.is_active());
        assert_eq!(recorder.end_elapsed(), None);
    }

    #[test]
    fn test_mark_elapsed_time_twice_is_last_write() {
        let mut recorder = SpanEventRecorder::active(0, crate::context::now_millis());
        recorder.mark_elapsed_time();
        let first = recorder.end_elapsed();
        recorder.mark_elapsed_time();
        let second = recorder.end_elapsed();
        assert!(first.is_some());
        assert!(second.is_some());
        assert!(second.unwrap() >= first.unwrap());
    }

    #[test]
    fn test_record_exception_captures_kind_and_message() {
        let mut recorder = SpanEventRecorder::active(0, crate::context::now_millis());
        let error = "connection refused".parse::<i32>().unwrap_err();
        recorder.record_exception(&error, true);

        let SpanEventRecorder::Active(rec) = &recorder else {
            panic!("expected active recorder");
        };
        let info = rec.exception.as_ref().unwrap();
        assert_eq!(info.error_kind, "ParseIntError");
        assert!(info.message.contains("invalid digit"));
        assert!(rec.failed);
    }

    #[test]
    fn test_record_exception_accepts_plain_values() {
        let mut recorder = SpanEventRecorder::active(0, crate::context::now_millis());
        recorder.record_exception("not an error type", false);

        let SpanEventRecorder::Active(rec) = &recorder else {
            panic!("expected active recorder");
        };
        assert_eq!(rec.exception.as_ref().unwrap().message, "not an error type");
        assert!(!rec.failed);
    }
}
