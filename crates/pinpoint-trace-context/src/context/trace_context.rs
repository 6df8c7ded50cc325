// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use super::method_descriptor::{ApiMetaRegistry, MethodDescriptor};
use super::now_millis;
use super::span::Span;
use super::trace::Trace;
use super::trace_id::{TraceId, NO_PARENT_SPAN_ID};
use super::transaction_id::TransactionIdSource;
use crate::config::Config;
use crate::propagation::RequestData;

/// Per-agent factory for [`Trace`]s.
///
/// Owns the transaction id source, the method descriptor registry, and the
/// handoff channel to the transport layer. One `TraceContext` exists per
/// agent process; each inbound request gets its own `Trace` from it.
#[derive(Debug)]
pub struct TraceContext {
    config: Config,
    id_source: TransactionIdSource,
    api_registry: Arc<ApiMetaRegistry>,
    span_tx: Option<UnboundedSender<Span>>,
}

impl TraceContext {
    /// `span_tx` receives every finished span; `api_meta_tx` receives every
    /// newly registered method descriptor. Either may be `None` when no
    /// collector connection exists.
    pub fn new(
        config: Config,
        span_tx: Option<UnboundedSender<Span>>,
        api_meta_tx: Option<UnboundedSender<Arc<MethodDescriptor>>>,
    ) -> Self {
        let id_source = TransactionIdSource::new(&config.agent_id, config.agent_start_time);
        Self {
            config,
            id_source,
            api_registry: Arc::new(ApiMetaRegistry::new(api_meta_tx)),
            span_tx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api_registry(&self) -> &Arc<ApiMetaRegistry> {
        &self.api_registry
    }

    /// Creates the trace for one inbound request.
    ///
    /// A request continuing an upstream trace reuses the identity decoded
    /// into `request`; a root request mints a fresh transaction id. `sampled`
    /// is the sampler's decision for root requests; continued requests obey
    /// the upstream decision instead. An unsampled request yields
    /// [`Trace::Disabled`].
    pub fn new_trace(&self, request: &RequestData, sampled: bool) -> Trace {
        if request.is_root {
            if !sampled {
                return Trace::Disabled;
            }
            return self.sampled_trace(request, TraceId::new_root(self.id_source.next()));
        }

        if !request.sampled {
            return Trace::Disabled;
        }
        let trace_id = match (request.transaction_id.clone(), request.span_id) {
            (Some(transaction_id), Some(span_id)) => TraceId::continued(
                transaction_id,
                span_id,
                request.parent_span_id.unwrap_or(NO_PARENT_SPAN_ID),
                request.flags.unwrap_or(0),
            ),
            // Inbound identity was incomplete; fall back to a new root.
            _ => TraceId::new_root(self.id_source.next()),
        };
        self.sampled_trace(request, trace_id)
    }

    fn sampled_trace(&self, request: &RequestData, trace_id: TraceId) -> Trace {
        let mut span = Span::new(trace_id, &self.config, now_millis());
        if !request.rpc_name.is_empty() {
            span.rpc = Some(request.rpc_name.clone());
        }
        if !request.end_point.is_empty() {
            span.end_point = Some(request.end_point.clone());
        }
        if !request.remote_address.is_empty() {
            span.remote_address = Some(request.remote_address.clone());
        }
        span.parent_application_name = request.parent_application_name.clone();
        span.parent_application_type = request.parent_application_type;
        Trace::sampled(span)
    }

    /// Finalizes a trace and hands the finished span to the transport layer.
    /// Delivery is fire-and-forget; a closed channel is logged and the span
    /// dropped.
    pub fn complete_trace(&self, trace: Trace) {
        let Some(span) = trace.close() else {
            return;
        };
        let Some(tx) = &self.span_tx else {
            debug!("no transport channel configured, dropping finished span");
            return;
        };
        if tx.send(span).is_err() {
            debug!("transport channel closed, dropping finished span");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TraceContext;
    use crate::config::Config;
    use crate::context::trace_id::NO_PARENT_SPAN_ID;
    use crate::propagation::RequestData;

    fn root_request() -> RequestData {
        RequestData {
            rpc_name: "/tests/123".to_string(),
            end_point: "localhost:5005".to_string(),
            remote_address: "10.0.0.5".to_string(),
            is_root: true,
            ..RequestData::default()
        }
    }

    fn continued_request() -> RequestData {
        RequestData {
            rpc_name: "/tests/123".to_string(),
            end_point: "localhost:5005".to_string(),
            remote_address: "10.0.0.5".to_string(),
            transaction_id: Some("upstream-agent^1000^7".parse().unwrap()),
            span_id: Some(2),
            parent_span_id: Some(3),
            parent_application_name: Some("upstream".to_string()),
            parent_application_type: Some(1400),
            flags: Some(0),
            host: Some("localhost:5005".to_string()),
            sampled: true,
            is_root: false,
        }
    }

    fn trace_context() -> TraceContext {
        TraceContext::new(Config::new("agent-1", "my-service"), None, None)
    }

    #[test]
    fn test_root_request_mints_fresh_identity() {
        let context = trace_context();
        let trace = context.new_trace(&root_request(), true);
        let trace_id = trace.trace_id().unwrap();
        assert_eq!(trace_id.transaction_id.agent_id, "agent-1");
        assert_eq!(trace_id.parent_span_id, NO_PARENT_SPAN_ID);

        let span = trace.span().unwrap();
        assert_eq!(span.rpc.as_deref(), Some("/tests/123"));
        assert_eq!(span.end_point.as_deref(), Some("localhost:5005"));
    }

    #[test]
    fn test_continued_request_keeps_upstream_identity() {
        let context = trace_context();
        let trace = context.new_trace(&continued_request(), true);
        let trace_id = trace.trace_id().unwrap();
        assert_eq!(trace_id.transaction_id.agent_id, "upstream-agent");
        assert_eq!(trace_id.span_id, 2);
        assert_eq!(trace_id.parent_span_id, 3);

        let span = trace.span().unwrap();
        assert_eq!(span.parent_application_name.as_deref(), Some("upstream"));
        assert_eq!(span.parent_application_type, Some(1400));
    }

    #[test]
    fn test_unsampled_requests_get_disabled_traces() {
        let context = trace_context();
        assert!(!context.new_trace(&root_request(), false).is_sampled());

        let mut unsampled_upstream = continued_request();
        unsampled_upstream.sampled = false;
        assert!(!context.new_trace(&unsampled_upstream, true).is_sampled());
    }

    #[test]
    fn test_distinct_root_traces_get_distinct_transactions() {
        let context = trace_context();
        let a = context.new_trace(&root_request(), true);
        let b = context.new_trace(&root_request(), true);
        assert_ne!(
            a.trace_id().unwrap().transaction_id,
            b.trace_id().unwrap().transaction_id
        );
    }

    #[tokio::test]
    async fn test_complete_trace_hands_span_to_transport() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let context = TraceContext::new(Config::new("agent-1", "my-service"), Some(tx), None);

        let mut trace = context.new_trace(&root_request(), true);
        let recorder = trace.trace_block_begin();
        trace.trace_block_end(recorder);
        context.complete_trace(trace);

        let span = rx.try_recv().unwrap();
        assert_eq!(span.span_events.len(), 1);
        assert!(!span.incomplete);
        assert!(span.elapsed_time >= 0);
    }

    #[test]
    fn test_complete_disabled_trace_sends_nothing() {
        let context = trace_context();
        let trace = context.new_trace(&root_request(), false);
        context.complete_trace(trace);
    }
}
