// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

//! Distributed-trace context core for a Pinpoint-compatible APM agent.
//!
//! This crate models one traced transaction as a tree of nested, timed span
//! events and carries the trace identity across HTTP process boundaries so
//! that causally related requests in different processes join one logical
//! trace.
//!
//! The crate is pure in-memory bookkeeping plus header string manipulation.
//! Everything around it is a collaborator reached through a seam:
//! instrumentation call sites drive [`context::trace::Trace`] through
//! `trace_block_begin`/`trace_block_end`, finished spans and newly registered
//! method descriptors are handed off on tokio mpsc channels, and the carrier
//! abstraction in [`propagation`] keeps the codec independent of any
//! particular HTTP stack.

pub mod config;
pub mod context;
pub mod propagation;
