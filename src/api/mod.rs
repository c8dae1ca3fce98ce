//! Console API boundary
//!
//! The watcher only talks to the remote API through [`ClusterApi`], so tests
//! and alternative transports can stand in for the HTTP client.

pub mod client;
pub mod models;

use async_trait::async_trait;

pub use client::{ApiClient, ApiError};
pub use models::{
    CloudProvider, Cluster, ClusterState, ClusterStatus, LogEntry, LogErrorDetail, LogMessage,
    Project,
};

/// Read-only queries the engine needs from the console API
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Clusters of an organization (names and providers)
    async fn clusters(&self, organization_id: &str) -> Result<Vec<Cluster>, ApiError>;

    /// Current status of every cluster of an organization
    async fn cluster_statuses(&self, organization_id: &str)
        -> Result<Vec<ClusterStatus>, ApiError>;

    /// Cumulative provisioning log of one cluster
    async fn cluster_logs(
        &self,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<Vec<LogEntry>, ApiError>;

    /// Projects of an organization, in console order
    async fn projects(&self, organization_id: &str) -> Result<Vec<Project>, ApiError>;
}
