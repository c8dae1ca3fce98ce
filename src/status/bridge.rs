//! Push bridge: applies status messages from a persistent channel to the
//! shared [`StatusCache`]
//!
//! The transport is not modelled here. Whatever holds the socket forwards
//! frames as [`BridgeMessage`]s over an mpsc channel.

use tokio::sync::mpsc;

use super::{StatusCache, StatusEntry, StatusKey};
use crate::api::ClusterStatus;

/// Close code the status endpoint uses when the cluster does not exist
pub const NOT_FOUND_CLOSE_CODE: u16 = 4404;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMessage {
    /// A JSON-encoded status frame
    Text(String),
    /// The channel was closed by the server
    Closed { code: u16, reason: String },
}

impl BridgeMessage {
    fn is_not_found_close(&self) -> bool {
        match self {
            Self::Closed { code, reason } => {
                *code == NOT_FOUND_CLOSE_CODE || reason.to_lowercase().contains("not found")
            }
            Self::Text(_) => false,
        }
    }
}

/// Bridge for one `(organization, cluster)` status subscription
#[derive(Debug, Clone)]
pub struct StatusBridge {
    key: StatusKey,
    cache: StatusCache,
}

impl StatusBridge {
    pub fn new(key: StatusKey, cache: StatusCache) -> Self {
        Self { key, cache }
    }

    /// Apply one message. Returns false once the channel is closed.
    pub fn apply(&self, message: &BridgeMessage) -> bool {
        match message {
            BridgeMessage::Text(text) => {
                match serde_json::from_str::<ClusterStatus>(text) {
                    Ok(status) => {
                        tracing::debug!(
                            cluster_id = %self.key.cluster_id,
                            status = ?status.status,
                            "Pushed cluster status"
                        );
                        self.cache
                            .put(self.key.clone(), StatusEntry::Known(status));
                    }
                    Err(e) => {
                        tracing::warn!(
                            cluster_id = %self.key.cluster_id,
                            "Dropping undecodable status message: {}",
                            e
                        );
                    }
                }
                true
            }
            BridgeMessage::Closed { code, reason } => {
                if message.is_not_found_close() {
                    tracing::info!(
                        cluster_id = %self.key.cluster_id,
                        "Status channel reports cluster not found"
                    );
                    self.cache.put(self.key.clone(), StatusEntry::NotFound);
                } else {
                    tracing::debug!(
                        cluster_id = %self.key.cluster_id,
                        code = *code,
                        reason = %reason,
                        "Status channel closed"
                    );
                }
                false
            }
        }
    }

    /// Drain messages until the channel closes or the sender is dropped
    pub async fn run(self, mut rx: mpsc::Receiver<BridgeMessage>) {
        while let Some(message) = rx.recv().await {
            if !self.apply(&message) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClusterState;

    fn setup() -> (StatusBridge, StatusCache, StatusKey) {
        let cache = StatusCache::new();
        let key = StatusKey::new("org", "c1");
        (StatusBridge::new(key.clone(), cache.clone()), cache, key)
    }

    #[test]
    fn test_text_frames_update_cache() {
        let (bridge, cache, key) = setup();
        assert!(bridge.apply(&BridgeMessage::Text(
            r#"{"cluster_id":"c1","status":"DEPLOYING"}"#.to_string()
        )));
        assert!(bridge.apply(&BridgeMessage::Text("not json".to_string())));
        match cache.get(&key) {
            Some(StatusEntry::Known(status)) => {
                assert_eq!(status.status, Some(ClusterState::Deploying))
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_not_found_close_writes_sentinel() {
        let (bridge, cache, key) = setup();
        assert!(!bridge.apply(&BridgeMessage::Closed {
            code: 1008,
            reason: "Cluster Not Found".to_string(),
        }));
        assert_eq!(cache.get(&key), Some(StatusEntry::NotFound));

        let (bridge, cache, key) = setup();
        bridge.apply(&BridgeMessage::Closed {
            code: NOT_FOUND_CLOSE_CODE,
            reason: String::new(),
        });
        assert_eq!(cache.get(&key), Some(StatusEntry::NotFound));
    }

    #[test]
    fn test_other_close_is_transient() {
        let (bridge, cache, key) = setup();
        bridge.apply(&BridgeMessage::Closed {
            code: 1006,
            reason: "abnormal".to_string(),
        });
        assert!(cache.get(&key).is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_close() {
        let (bridge, cache, key) = setup();
        let (tx, rx) = mpsc::channel(8);
        tx.send(BridgeMessage::Text(
            r#"{"cluster_id":"c1","status":"DEPLOYED"}"#.to_string(),
        ))
        .await
        .unwrap();
        tx.send(BridgeMessage::Closed {
            code: 1000,
            reason: "bye".to_string(),
        })
        .await
        .unwrap();
        tx.send(BridgeMessage::Text(
            r#"{"cluster_id":"c1","status":"DEPLOYMENT_ERROR"}"#.to_string(),
        ))
        .await
        .unwrap();

        bridge.run(rx).await;
        match cache.get(&key) {
            Some(StatusEntry::Known(status)) => {
                assert_eq!(status.status, Some(ClusterState::Deployed))
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }
}
