// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors of the header propagation codec.
///
/// Only misuse by the codec's direct callers surfaces as an error. A present
/// but unparseable trace header is degraded inside [`read`](super::read):
/// the request is treated as a new root instead of being aborted, so
/// `MalformedHeader` is observed by callers only in logs.
#[derive(Error, Debug)]
pub enum PropagationError {
    /// Header read attempted with no inbound request. Programmer error.
    #[error("no inbound request to read trace headers from")]
    MissingCarrier,

    /// Header write attempted with no current trace. Programmer error.
    #[error("no active trace to write outbound trace headers from")]
    NoActiveTrace,

    /// A present trace header failed to parse.
    #[error("malformed `{header}` header: {reason}")]
    MalformedHeader {
        header: &'static str,
        reason: String,
    },
}
