// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

//! Cross-process trace propagation over HTTP carrier headers.
//!
//! [`read`] decodes the inbound carrier into a [`RequestData`], establishing
//! whether the request continues an upstream trace or starts a new root.
//! [`write`] injects the active trace's identity into an outbound carrier so
//! the downstream process continues the same trace.
//!
//! # Header contract
//!
//! All values are strings on the wire; names are case-insensitive:
//!
//! - `Pinpoint-TraceID`: transaction id, `agentId^startTime^sequence`
//! - `Pinpoint-SpanID`: span id allocated for the receiving process, decimal
//! - `Pinpoint-pSpanID`: sender's own span id, decimal
//! - `Pinpoint-pAppName` / `Pinpoint-pAppType`: sender's identity
//! - `Pinpoint-Flags`: trace flags, decimal
//! - `Pinpoint-Host`: target host the sender addressed
//! - `Pinpoint-Sampled`: literal `true`/`false`
//!
//! A present but malformed `Pinpoint-TraceID` never fails the request: the
//! reader logs it and treats the request as a new root, because tracing must
//! stay invisible to the wrapped application on both the happy and the
//! unhappy path.

use std::str::FromStr;

use tracing::debug;

use crate::config::Config;
use crate::context::trace::Trace;
use crate::context::transaction_id::TransactionId;

pub mod carrier;
pub mod error;

pub use carrier::{Extractor, Injector};
pub use error::PropagationError;

pub const TRACE_ID_HEADER: &str = "Pinpoint-TraceID";
pub const SPAN_ID_HEADER: &str = "Pinpoint-SpanID";
pub const PARENT_SPAN_ID_HEADER: &str = "Pinpoint-pSpanID";
pub const PARENT_APPLICATION_NAME_HEADER: &str = "Pinpoint-pAppName";
pub const PARENT_APPLICATION_TYPE_HEADER: &str = "Pinpoint-pAppType";
pub const FLAGS_HEADER: &str = "Pinpoint-Flags";
pub const HOST_HEADER: &str = "Pinpoint-Host";
pub const SAMPLED_HEADER: &str = "Pinpoint-Sampled";

const HTTP_HOST_HEADER: &str = "host";
const X_FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// IPv4-mapped-IPv6 prefix stripped from remote addresses.
const IPV4_MAPPED_PREFIX: &str = "::ffff:";

/// View of one inbound request handed to [`read`].
///
/// `target` is the request target as received (path, optionally followed by
/// query/fragment); `peer_address` is the transport-level remote address.
#[derive(Clone, Copy)]
pub struct InboundRequest<'a> {
    pub target: &'a str,
    pub peer_address: Option<&'a str>,
    pub headers: &'a dyn Extractor,
}

/// Decoded per-request propagation state, produced by [`read`] and consumed
/// by trace creation.
///
/// With `is_root` set, no usable upstream trace header was present and all
/// trace fields stay unset: the caller starts a new root trace.
#[derive(Debug, Clone, Default)]
pub struct RequestData {
    pub rpc_name: String,
    pub end_point: String,
    pub remote_address: String,
    pub transaction_id: Option<TransactionId>,
    pub span_id: Option<i64>,
    pub parent_span_id: Option<i64>,
    pub parent_application_name: Option<String>,
    pub parent_application_type: Option<i32>,
    pub flags: Option<i32>,
    pub host: Option<String>,
    pub sampled: bool,
    pub is_root: bool,
}

/// Decodes the inbound carrier headers into a [`RequestData`].
///
/// Fails only when `request` is `None`, since a read attempted with no
/// request object is caller misuse. Everything else degrades: absent trace headers
/// make a root request, malformed ones are logged and make a root request.
pub fn read(request: Option<InboundRequest<'_>>) -> Result<RequestData, PropagationError> {
    let request = request.ok_or(PropagationError::MissingCarrier)?;

    let mut data = RequestData {
        rpc_name: path_of(request.target).to_string(),
        end_point: request
            .headers
            .get(HTTP_HOST_HEADER)
            .unwrap_or_default()
            .to_string(),
        is_root: true,
        ..RequestData::default()
    };

    let remote = request
        .headers
        .get(X_FORWARDED_FOR_HEADER)
        .or(request.peer_address)
        .unwrap_or_default();
    data.remote_address = remote
        .strip_prefix(IPV4_MAPPED_PREFIX)
        .unwrap_or(remote)
        .to_string();

    if let Some(raw_transaction_id) = request.headers.get(TRACE_ID_HEADER) {
        match read_trace_headers(request.headers, raw_transaction_id, &mut data) {
            Ok(()) => data.is_root = false,
            Err(err) => {
                debug!(%err, "malformed inbound trace header, starting a new root trace");
                data = RequestData {
                    rpc_name: data.rpc_name,
                    end_point: data.end_point,
                    remote_address: data.remote_address,
                    is_root: true,
                    ..RequestData::default()
                };
            }
        }
    }

    debug!(?data, "read request data from inbound headers");
    Ok(data)
}

fn read_trace_headers(
    headers: &dyn Extractor,
    raw_transaction_id: &str,
    data: &mut RequestData,
) -> Result<(), PropagationError> {
    data.transaction_id = Some(TransactionId::from_str(raw_transaction_id).map_err(|err| {
        PropagationError::MalformedHeader {
            header: TRACE_ID_HEADER,
            reason: err.to_string(),
        }
    })?);
    data.span_id = Some(required_number(headers, SPAN_ID_HEADER)?);
    data.parent_span_id = Some(required_number(headers, PARENT_SPAN_ID_HEADER)?);
    data.parent_application_name = headers
        .get(PARENT_APPLICATION_NAME_HEADER)
        .map(str::to_string);
    data.parent_application_type = optional_number(headers, PARENT_APPLICATION_TYPE_HEADER)?;
    data.flags = optional_number(headers, FLAGS_HEADER)?;
    data.host = headers.get(HOST_HEADER).map(str::to_string);
    data.sampled = headers.get(SAMPLED_HEADER) == Some("true");
    Ok(())
}

/// Injects the active trace's identity into the outbound carrier.
///
/// `next_span_id` is the span id the downstream process will record under.
/// It is distinct from this process's own span id, which goes out as the
/// parent.
/// Only the Pinpoint header keys are touched. Fails with
/// [`PropagationError::NoActiveTrace`] when `trace` is `None`; a disabled
/// trace writes only `Pinpoint-Sampled: false` so the downstream process
/// stays consistent with the upstream sampling decision.
pub fn write(
    carrier: &mut dyn Injector,
    config: &Config,
    trace: Option<&Trace>,
    next_span_id: i64,
    host: &str,
) -> Result<(), PropagationError> {
    let trace = trace.ok_or(PropagationError::NoActiveTrace)?;

    let Some(trace_id) = trace.trace_id() else {
        carrier.set(SAMPLED_HEADER, "false".to_string());
        return Ok(());
    };

    carrier.set(TRACE_ID_HEADER, trace_id.transaction_id.to_string());
    carrier.set(SPAN_ID_HEADER, next_span_id.to_string());
    carrier.set(PARENT_SPAN_ID_HEADER, trace_id.span_id.to_string());
    carrier.set(
        PARENT_APPLICATION_NAME_HEADER,
        config.application_name.clone(),
    );
    carrier.set(
        PARENT_APPLICATION_TYPE_HEADER,
        config.service_type.to_string(),
    );
    carrier.set(FLAGS_HEADER, trace_id.flag.to_string());
    carrier.set(HOST_HEADER, host.to_string());
    carrier.set(SAMPLED_HEADER, config.sampling.to_string());
    Ok(())
}

/// Path component of the request target, query string and fragment excluded.
fn path_of(target: &str) -> &str {
    target.split(['?', '#']).next().unwrap_or(target)
}

fn required_number<T: FromStr>(
    headers: &dyn Extractor,
    header: &'static str,
) -> Result<T, PropagationError> {
    let raw = headers
        .get(header)
        .ok_or(PropagationError::MalformedHeader {
            header,
            reason: "missing".to_string(),
        })?;
    raw.parse::<T>()
        .map_err(|_| PropagationError::MalformedHeader {
            header,
            reason: format!("`{raw}` is not a base-10 number"),
        })
}

fn optional_number<T: FromStr>(
    headers: &dyn Extractor,
    header: &'static str,
) -> Result<Option<T>, PropagationError> {
    match headers.get(header) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| PropagationError::MalformedHeader {
                header,
                reason: format!("`{raw}` is not a base-10 number"),
            }),
    }
}
