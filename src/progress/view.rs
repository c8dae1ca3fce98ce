//! Presentation-ready progress derived from a snapshot

use serde::{Deserialize, Serialize};

use super::interpreter::ProgressSnapshot;
use super::steps::DEPLOYMENT_STEPS;
use crate::lifecycle::LifecycleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Done,
    Current,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepView {
    pub label: String,
    pub status: StepStatus,
}

/// What a progress bar or step list renders for one installation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressView {
    pub steps: Vec<StepView>,
    /// Filled fraction in `[0, 1]`
    pub progress_value: f64,
    pub current_step_label: String,
    pub lifecycle: LifecycleState,
}

impl ProgressView {
    /// Build the view. `attempt_started` tells whether the latest batch held a
    /// start marker, which is what moves a fresh installation out of `idle`.
    pub fn from_snapshot(snapshot: &ProgressSnapshot, attempt_started: bool) -> Self {
        let total = DEPLOYMENT_STEPS.len();
        let highest = snapshot.highest_step_index.min(total - 1);

        let steps = DEPLOYMENT_STEPS
            .iter()
            .enumerate()
            .map(|(index, label)| {
                let status = if snapshot.installation_complete || index < highest {
                    StepStatus::Done
                } else if index == highest {
                    StepStatus::Current
                } else {
                    StepStatus::Pending
                };
                StepView {
                    label: (*label).to_string(),
                    status,
                }
            })
            .collect();

        let filled = if snapshot.installation_complete {
            total
        } else {
            highest
        };

        let lifecycle = if snapshot.creation_failed {
            LifecycleState::Failed
        } else if snapshot.installation_complete {
            LifecycleState::Succeeded
        } else if attempt_started || highest > 0 {
            LifecycleState::Installing
        } else {
            LifecycleState::Idle
        };

        Self {
            steps,
            progress_value: (filled as f64 / total as f64).min(1.0),
            current_step_label: DEPLOYMENT_STEPS[highest].to_string(),
            lifecycle,
        }
    }
}
