//! Shared cluster status table fed by polling and by the push channel

pub mod bridge;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use crate::api::ClusterStatus;

pub use bridge::{BridgeMessage, StatusBridge, NOT_FOUND_CLOSE_CODE};

/// Cache key derived from `(organization_id, cluster_id)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusKey {
    pub organization_id: String,
    pub cluster_id: String,
}

impl StatusKey {
    pub fn new(organization_id: impl Into<String>, cluster_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            cluster_id: cluster_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEntry {
    Known(ClusterStatus),
    /// The server reported that the cluster no longer exists
    NotFound,
}

/// Status table; every write bumps a revision that subscribers can await
#[derive(Debug, Clone)]
pub struct StatusCache {
    entries: Arc<RwLock<HashMap<StatusKey, StatusEntry>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCache {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            revision: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn get(&self, key: &StatusKey) -> Option<StatusEntry> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    pub fn put(&self, key: StatusKey, entry: StatusEntry) {
        {
            let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
            guard.insert(key, entry);
        }
        self.bump();
    }

    /// Write a whole poll result for an organization in one revision
    pub fn put_all(&self, organization_id: &str, statuses: Vec<ClusterStatus>) {
        {
            let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
            for status in statuses {
                let key = StatusKey::new(organization_id, status.cluster_id.clone());
                guard.insert(key, StatusEntry::Known(status));
            }
        }
        self.bump();
    }

    /// Known statuses of an organization; `NotFound` sentinels are skipped
    pub fn statuses(&self, organization_id: &str) -> Vec<ClusterStatus> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut statuses: Vec<ClusterStatus> = guard
            .iter()
            .filter(|(key, _)| key.organization_id == organization_id)
            .filter_map(|(_, entry)| match entry {
                StatusEntry::Known(status) => Some(status.clone()),
                StatusEntry::NotFound => None,
            })
            .collect();
        statuses.sort_by(|a, b| a.cluster_id.cmp(&b.cluster_id));
        statuses
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}
