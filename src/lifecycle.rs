//! Coarse lifecycle classification of an installation

use serde::{Deserialize, Serialize};

use crate::api::ClusterState;
use crate::progress::ProgressSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Idle,
    Installing,
    Succeeded,
    Failed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Installing => write!(f, "installing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Derive a lifecycle state.
///
/// A log-derived snapshot wins when it is terminal; otherwise the server
/// status and the deployed flag decide, so a verdict is available before the
/// first log poll resolves.
pub fn derive(
    snapshot: Option<&ProgressSnapshot>,
    status: Option<ClusterState>,
    is_deployed: Option<bool>,
) -> LifecycleState {
    if let Some(snapshot) = snapshot {
        if snapshot.creation_failed {
            return LifecycleState::Failed;
        }
        if snapshot.installation_complete {
            return LifecycleState::Succeeded;
        }
    }

    match status {
        Some(ClusterState::DeploymentError | ClusterState::BuildError | ClusterState::DeleteError) => {
            return LifecycleState::Failed
        }
        Some(ClusterState::Deployed | ClusterState::Ready) => return LifecycleState::Succeeded,
        _ => {}
    }

    if is_deployed == Some(true) {
        return LifecycleState::Succeeded;
    }

    match status {
        Some(
            ClusterState::Deploying
            | ClusterState::DeploymentQueued
            | ClusterState::Restarting
            | ClusterState::RestartQueued,
        ) => LifecycleState::Installing,
        _ if is_deployed == Some(false) => LifecycleState::Installing,
        _ => LifecycleState::Idle,
    }
}
