// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

//! Transaction identifiers naming one logical distributed trace.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use thiserror::Error;

/// Field separator in the wire form. Agent ids must not contain it.
const DELIMITER: char = '^';

/// Identity of one logical distributed trace.
///
/// Composed of the originating agent's id, that agent's process start time,
/// and a per-process sequence number. The combination is unique across every
/// process that participates in the trace, and every such process carries the
/// same `TransactionId`. Immutable once created.
///
/// The wire form is the `^`-joined string `agent_id^start_time^sequence`,
/// produced by `Display` and parsed back losslessly by `FromStr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TransactionId {
    pub agent_id: String,
    pub agent_start_time: i64,
    pub sequence: u64,
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}{DELIMITER}{}",
            self.agent_id, self.agent_start_time, self.sequence
        )
    }
}

#[derive(Error, Debug)]
#[error("malformed transaction id `{0}`")]
pub struct ParseTransactionIdError(String);

impl FromStr for TransactionId {
    type Err = ParseTransactionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, DELIMITER);
        let (Some(agent_id), Some(start), Some(sequence)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseTransactionIdError(s.to_string()));
        };
        if agent_id.is_empty() {
            return Err(ParseTransactionIdError(s.to_string()));
        }
        let agent_start_time = start
            .parse::<i64>()
            .map_err(|_| ParseTransactionIdError(s.to_string()))?;
        let sequence = sequence
            .parse::<u64>()
            .map_err(|_| ParseTransactionIdError(s.to_string()))?;
        Ok(TransactionId {
            agent_id: agent_id.to_string(),
            agent_start_time,
            sequence,
        })
    }
}

/// Allocates fresh transaction ids for traces rooted in this process.
///
/// The sequence counter is a process-wide atomic, so concurrent request
/// handlers never mint the same id.
#[derive(Debug)]
pub struct TransactionIdSource {
    agent_id: String,
    agent_start_time: i64,
    next_sequence: AtomicU64,
}

impl TransactionIdSource {
    pub fn new(agent_id: &str, agent_start_time: i64) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            agent_start_time,
            next_sequence: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> TransactionId {
        TransactionId {
            agent_id: self.agent_id.clone(),
            agent_start_time: self.agent_start_time,
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TransactionId, TransactionIdSource};

    #[test]
    fn test_wire_round_trip() {
        let id = TransactionId {
            agent_id: "express-node-sample-id".to_string(),
            agent_start_time: 1460588667945,
            sequence: 24,
        };
        let wire = id.to_string();
        assert_eq!(wire, "express-node-sample-id^1460588667945^24");
        assert_eq!(wire.parse::<TransactionId>().unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!("".parse::<TransactionId>().is_err());
        assert!("agent^notatime^1".parse::<TransactionId>().is_err());
        assert!("agent^123".parse::<TransactionId>().is_err());
        assert!("^123^4".parse::<TransactionId>().is_err());
    }

    #[test]
    fn test_source_sequences_are_distinct() {
        let source = TransactionIdSource::new("agent", 1000);
        let a = source.next();
        let b = source.next();
        assert_eq!(a.sequence + 1, b.sequence);
        assert_ne!(a, b);
    }
}
