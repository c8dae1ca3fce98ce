//! Process-wide progress table
//!
//! Owned by the composition root and shared by handle, so every view of an
//! installation sees the same ratcheted progress for the whole session.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::interpreter::{LogInterpreter, ProgressSnapshot};
use super::steps::InstallTarget;
use crate::api::LogEntry;

/// Shared map of installation id to last-known progress
#[derive(Debug, Clone, Default)]
pub struct ProgressCache {
    inner: Arc<RwLock<HashMap<String, ProgressSnapshot>>>,
}

impl ProgressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cluster_id: &str) -> Option<ProgressSnapshot> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.get(cluster_id).copied()
    }

    /// Replace the snapshot for `cluster_id` wholesale
    pub fn set(&self, cluster_id: &str, snapshot: ProgressSnapshot) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(cluster_id.to_string(), snapshot);
    }

    /// Interpret a freshly polled batch against the cached snapshot and store
    /// the result. The read-merge-write happens under one lock so two poll
    /// responses for the same id cannot interleave.
    pub fn record(
        &self,
        cluster_id: &str,
        batch: &[LogEntry],
        interpreter: &LogInterpreter,
        target: &InstallTarget,
    ) -> ProgressSnapshot {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let previous = guard.get(cluster_id).copied().unwrap_or_default();
        let next = interpreter.interpret(batch, &previous, target);
        guard.insert(cluster_id.to_string(), next);
        next
    }
}
