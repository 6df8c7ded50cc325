// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

use std::env;

use crate::context::{now_millis, service_type};

/// Agent identity and sampling configuration.
///
/// One `Config` exists per process and is shared by the trace context factory
/// and the header propagation codec. `agent_id` and `agent_start_time` seed
/// transaction id generation, so they must stay fixed for the process
/// lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    pub agent_id: String,
    pub application_name: String,
    /// Service type code reported for this agent (see [`service_type`]).
    pub service_type: i32,
    /// Process start timestamp in epoch milliseconds.
    pub agent_start_time: i64,
    /// Whether this agent currently samples new traces. Consumed as a
    /// decision; the sampling policy itself lives outside this crate.
    pub sampling: bool,
}

impl Config {
    pub fn from_env() -> Result<Config, Box<dyn std::error::Error>> {
        let application_name = env::var("PINPOINT_APPLICATION_NAME").map_err(|_| {
            anyhow::anyhow!("PINPOINT_APPLICATION_NAME environment variable is not set")
        })?;

        let agent_id = env::var("PINPOINT_AGENT_ID")
            .unwrap_or_else(|_| format!("{application_name}-{}", std::process::id()));

        let sampling = env::var("PINPOINT_SAMPLING")
            .map(|v| v != "false")
            .unwrap_or(true);

        Ok(Config {
            agent_id,
            application_name,
            service_type: service_type::NODE,
            agent_start_time: now_millis(),
            sampling,
        })
    }

    /// Programmatic constructor for embedders and tests.
    pub fn new(agent_id: &str, application_name: &str) -> Config {
        Config {
            agent_id: agent_id.to_string(),
            application_name: application_name.to_string(),
            service_type: service_type::NODE,
            agent_start_time: now_millis(),
            sampling: true,
        }
    }
}
