// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

//! Service type codes reported on spans and span events.
//!
//! The codes are part of the wire contract with the collector backend and
//! must match the collector's service type registry.

pub const UNKNOWN: i32 = 1;

/// Marker for span events completed on a different scheduling turn than the
/// one that opened them.
pub const ASYNC: i32 = 100;

pub const NODE: i32 = 1400;
pub const NODE_METHOD: i32 = 1401;

pub const EXPRESS: i32 = 6600;
pub const KOA: i32 = 6610;
