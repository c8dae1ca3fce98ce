//! Installations this machine explicitly started and still waits on
//!
//! The list lives in durable storage under [`TRACKING_STORAGE_KEY`] so it
//! survives restarts. Entries expire lazily on read once older than the TTL,
//! which cleans up after sessions that died before seeing a terminal state.
//! Storage failures are logged and degrade to an empty list.

pub mod storage;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};

/// Fixed storage key holding the JSON array of tracked installs
pub const TRACKING_STORAGE_KEY: &str = "cluster-install-tracking";

/// Default time after which a tracked install is dropped unobserved
pub const DEFAULT_TRACKING_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedInstall {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TrackedInstall {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }
}

/// Handle on the tracked-install list. Clones share storage and subscribers.
#[derive(Clone)]
pub struct TrackedInstallStore {
    storage: Arc<dyn Storage>,
    ttl: Duration,
    changes: Arc<watch::Sender<Vec<TrackedInstall>>>,
}

impl std::fmt::Debug for TrackedInstallStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedInstallStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TrackedInstallStore {
    pub fn new(storage: Arc<dyn Storage>, ttl: Duration) -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            storage,
            ttl,
            changes: Arc::new(tx),
        }
    }

    /// Store with in-memory storage and the default TTL
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStorage::new()),
            Duration::hours(DEFAULT_TRACKING_TTL_HOURS),
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Receive the list after every write made through this store
    pub fn subscribe(&self) -> watch::Receiver<Vec<TrackedInstall>> {
        self.changes.subscribe()
    }

    /// Start tracking `id`, replacing any previous entry for it
    pub fn track(&self, id: &str, name: Option<String>) {
        let mut installs = self.read_all();
        installs.retain(|install| install.id != id);
        installs.push(TrackedInstall::new(id, name));
        tracing::info!(cluster_id = id, "Tracking cluster installation");
        self.write_all(&installs);
    }

    pub fn untrack(&self, id: &str) {
        let mut installs = self.read_all();
        let before = installs.len();
        installs.retain(|install| install.id != id);
        if installs.len() != before {
            tracing::info!(cluster_id = id, "Stopped tracking cluster installation");
            self.write_all(&installs);
        }
    }

    /// Live tracked installs; expired entries are dropped from storage
    pub fn list(&self) -> Vec<TrackedInstall> {
        self.list_at(Utc::now())
    }

    pub fn list_at(&self, now: DateTime<Utc>) -> Vec<TrackedInstall> {
        let installs = self.read_all();
        let before = installs.len();
        let live: Vec<TrackedInstall> = installs
            .into_iter()
            .filter(|install| {
                let expired = install.is_expired(now, self.ttl);
                if expired {
                    tracing::debug!(cluster_id = %install.id, "Tracked installation expired");
                }
                !expired
            })
            .collect();

        if live.len() != before {
            self.write_all(&live);
        }
        live
    }

    pub fn contains(&self, id: &str) -> bool {
        self.list().iter().any(|install| install.id == id)
    }

    fn read_all(&self) -> Vec<TrackedInstall> {
        let raw = match self.storage.read(TRACKING_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read tracked installations: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(installs) => installs,
            Err(e) => {
                tracing::warn!("Ignoring unreadable tracked installations: {}", e);
                Vec::new()
            }
        }
    }

    fn write_all(&self, installs: &[TrackedInstall]) {
        let result = serde_json::to_string(installs)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.write(TRACKING_STORAGE_KEY, &json));

        match result {
            Ok(()) => {
                self.changes.send_replace(installs.to_vec());
            }
            Err(e) => tracing::warn!("Failed to persist tracked installations: {}", e),
        }
    }
}
