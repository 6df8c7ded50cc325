// Copyright 2025-Present the pinpoint-trace-context authors
// SPDX-License-Identifier: Apache-2.0

//! Process-wide cache of method/API metadata.
//!
//! Spans reference instrumented call sites by a compact integer id instead of
//! re-transmitting module/class/method strings on every event. The registry
//! assigns that id on first use and keeps the mapping for the process
//! lifetime; the collector learns about each descriptor exactly once through
//! the metadata sink.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Metadata for one instrumented call site.
///
/// `id` is assigned at registration and stable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodDescriptor {
    pub id: i32,
    pub module_name: String,
    pub object_path: String,
    pub method_name: String,
}

impl MethodDescriptor {
    /// Human-readable form sent to the metadata sink, e.g. `express.Router.use`.
    pub fn api_descriptor(&self) -> String {
        format!(
            "{}.{}.{}",
            self.module_name, self.object_path, self.method_name
        )
    }
}

type MethodKey = (String, String, String);

#[derive(Debug)]
struct RegistryInner {
    by_key: HashMap<MethodKey, Arc<MethodDescriptor>>,
    next_id: i32,
}

/// Append-only registry of [`MethodDescriptor`]s keyed by their
/// (module, object, method) triple.
///
/// The single mutex makes first-use races benign: only one descriptor is ever
/// created per distinct triple, and ids are never reassigned or evicted.
#[derive(Debug)]
pub struct ApiMetaRegistry {
    inner: Mutex<RegistryInner>,
    sink: Option<UnboundedSender<Arc<MethodDescriptor>>>,
}

impl ApiMetaRegistry {
    /// `sink` receives every newly created descriptor, fire-and-forget. Pass
    /// `None` when no collector connection exists (tests, dry runs).
    pub fn new(sink: Option<UnboundedSender<Arc<MethodDescriptor>>>) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                by_key: HashMap::new(),
                next_id: 1,
            }),
            sink,
        }
    }

    /// Returns the descriptor for the triple, creating and announcing it on
    /// first use. Equal triples always yield the same descriptor.
    pub fn get_or_create(
        &self,
        module_name: &str,
        object_path: &str,
        method_name: &str,
    ) -> Arc<MethodDescriptor> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let key = (
            module_name.to_string(),
            object_path.to_string(),
            method_name.to_string(),
        );
        if let Some(found) = inner.by_key.get(&key) {
            return found.clone();
        }

        let descriptor = Arc::new(MethodDescriptor {
            id: inner.next_id,
            module_name: key.0.clone(),
            object_path: key.1.clone(),
            method_name: key.2.clone(),
        });
        inner.next_id += 1;
        inner.by_key.insert(key, descriptor.clone());
        drop(inner);

        // Announce outside the lock; delivery is best-effort and never retried.
        if let Some(sink) = &self.sink {
            if sink.send(descriptor.clone()).is_err() {
                debug!(
                    api = %descriptor.api_descriptor(),
                    "metadata sink closed, dropping descriptor announcement"
                );
            }
        }
        descriptor
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_key
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
