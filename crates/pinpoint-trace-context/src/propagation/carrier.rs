// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

//! Carrier traits abstracting the transport object whose headers carry trace
//! propagation data.
//!
//! The codec reads and writes through [`Extractor`] and [`Injector`] so it
//! stays independent of the HTTP stack in use. Implementations exist for
//! `http::HeaderMap` (real requests) and `HashMap<String, String>` (tests
//! and non-HTTP transports). All implementations match header names
//! case-insensitively.

use std::collections::HashMap;

use http::header::{HeaderName, HeaderValue};
use tracing::debug;

/// Write access to a carrier's headers.
pub trait Injector {
    /// Sets a header, replacing any previous value for the key. Other keys
    /// are untouched.
    fn set(&mut self, key: &str, value: String);
}

/// Read access to a carrier's headers.
pub trait Extractor {
    /// Gets a header value by case-insensitive key.
    fn get(&self, key: &str) -> Option<&str>;

    /// All header keys present in the carrier.
    fn keys(&self) -> Vec<&str>;
}

/// `HashMap` carrier; keys are normalized to lowercase on write so lookups
/// are case-insensitive.
impl<S: std::hash::BuildHasher> Injector for HashMap<String, String, S> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_lowercase(), value);
    }
}

impl<S: std::hash::BuildHasher> Extractor for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<&str> {
        self.get(&key.to_lowercase()).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect::<Vec<_>>()
    }
}

impl Injector for http::HeaderMap {
    /// Invalid header names or non-ASCII values cannot be represented in an
    /// `http::HeaderMap`; they are logged and skipped, never panicked on.
    fn set(&mut self, key: &str, value: String) {
        let Ok(name) = HeaderName::try_from(key) else {
            debug!(key, "invalid header name, skipping injection");
            return;
        };
        let Ok(value) = HeaderValue::try_from(value) else {
            debug!(key, "invalid header value, skipping injection");
            return;
        };
        self.insert(name, value);
    }
}

impl Extractor for http::HeaderMap {
    fn get(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.keys().map(HeaderName::as_str).collect::<Vec<_>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_map_get_is_case_insensitive() {
        let mut carrier = HashMap::new();
        carrier.set("Pinpoint-TraceID", "value".to_string());

        assert_eq!(Extractor::get(&carrier, "PINPOINT-TRACEID"), Some("value"));
        assert_eq!(Extractor::get(&carrier, "pinpoint-traceid"), Some("value"));
    }

    #[test]
    fn test_hash_map_keys_are_lowercased() {
        let mut carrier = HashMap::new();
        carrier.set("Pinpoint-SpanID", "2".to_string());
        carrier.set("Pinpoint-pSpanID", "3".to_string());

        let keys = Extractor::keys(&carrier);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"pinpoint-spanid"));
        assert!(keys.contains(&"pinpoint-pspanid"));
    }

    #[test]
    fn test_header_map_round_trip() {
        let mut carrier = http::HeaderMap::new();
        carrier.set("Pinpoint-TraceID", "agent^1000^1".to_string());

        assert_eq!(
            Extractor::get(&carrier, "pinpoint-traceid"),
            Some("agent^1000^1")
        );
    }

    #[test]
    fn test_header_map_set_replaces_previous_value() {
        let mut carrier = http::HeaderMap::new();
        carrier.set("Pinpoint-Sampled", "true".to_string());
        carrier.set("Pinpoint-Sampled", "false".to_string());

        assert_eq!(Extractor::get(&carrier, "Pinpoint-Sampled"), Some("false"));
        assert_eq!(Extractor::keys(&carrier).len(), 1);
    }

    #[test]
    fn test_header_map_skips_unrepresentable_values() {
        let mut carrier = http::HeaderMap::new();
        carrier.set("bad name with spaces", "value".to_string());
        carrier.set("Pinpoint-Host", "va\nlue".to_string());

        assert!(Extractor::keys(&carrier).is_empty());
    }
}
