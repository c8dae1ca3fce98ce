//! Wire types returned by the console API
//!
//! Only the fields the progress and notification engine reads are modelled;
//! everything else in the server payloads is ignored by serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User-facing part of a log line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_message: Option<String>,
}

/// Error details attached to a failing log line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_log_message: Option<String>,
}

/// One line of a cluster's provisioning log.
///
/// Batches are cumulative: each poll returns the full known history in
/// emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<LogMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LogErrorDetail>,
}

impl LogEntry {
    /// Entry carrying only a safe message
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(LogMessage {
                safe_message: Some(text.into()),
            }),
            ..Default::default()
        }
    }

    /// Entry carrying only a step marker
    pub fn step(step: impl Into<String>) -> Self {
        Self {
            step: Some(step.into()),
            ..Default::default()
        }
    }

    /// Entry carrying an error user message
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            error: Some(LogErrorDetail {
                user_log_message: Some(text.into()),
            }),
            ..Default::default()
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The text the interpreter matches against: the error user message when
    /// present, otherwise the safe message.
    pub fn effective_message(&self) -> &str {
        let user = self
            .error
            .as_ref()
            .and_then(|e| e.user_log_message.as_deref())
            .filter(|m| !m.is_empty());
        let safe = self.message.as_ref().and_then(|m| m.safe_message.as_deref());
        user.or(safe).unwrap_or("")
    }
}

/// Server-side cluster state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterState {
    Building,
    BuildError,
    BuildQueued,
    Canceled,
    Canceling,
    Deleted,
    DeleteError,
    DeleteQueued,
    Deleting,
    Deployed,
    Deploying,
    DeploymentError,
    DeploymentQueued,
    Queued,
    Ready,
    Restarted,
    Restarting,
    RestartError,
    RestartQueued,
    Stopped,
    Stopping,
    StopError,
    StopQueued,
    #[serde(other)]
    Unknown,
}

/// Status record for a single cluster, from the status query or the push channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub cluster_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClusterState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deployed: Option<bool>,
}

impl ClusterStatus {
    pub fn new(cluster_id: impl Into<String>, status: Option<ClusterState>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            status,
            is_deployed: None,
        }
    }

    pub fn with_deployed(mut self, is_deployed: bool) -> Self {
        self.is_deployed = Some(is_deployed);
        self
    }
}

/// Cloud provider hosting a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
    Scaleway,
    OnPremise,
    #[serde(other)]
    Unknown,
}

impl CloudProvider {
    /// Kubernetes flavour code the installer prints in its deployment banner
    pub fn provider_code(&self) -> Option<&'static str> {
        match self {
            Self::Aws => Some("EKS"),
            Self::Gcp => Some("GKE"),
            Self::Azure => Some("AKS"),
            Self::Scaleway => Some("ScwKapsule"),
            Self::OnPremise | Self::Unknown => None,
        }
    }
}

impl std::str::FromStr for CloudProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AWS" => Ok(Self::Aws),
            "GCP" => Ok(Self::Gcp),
            "AZURE" => Ok(Self::Azure),
            "SCALEWAY" => Ok(Self::Scaleway),
            "ON_PREMISE" => Ok(Self::OnPremise),
            other => Err(format!("Unknown cloud provider: {}", other)),
        }
    }
}

/// Cluster summary from the organization's cluster list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<CloudProvider>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}
