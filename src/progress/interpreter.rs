//! Log-stream interpreter
//!
//! Turns a cumulative batch of provisioning log lines into a ratcheted
//! [`ProgressSnapshot`]. Unrecognized lines never match anything, so they
//! can only fail to advance progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::steps::{self, InstallTarget, DEFAULT_COMPLETION_PHRASE, ERROR_STEP, FINAL_STEP};
use crate::api::LogEntry;

/// Last-known progress of one installation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub highest_step_index: usize,
    pub installation_complete: bool,
    pub creation_failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// Outcome of scanning one batch, before merging with the baseline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct BatchScan {
    max_index: usize,
    complete: bool,
    failed: bool,
}

/// Interprets installer log batches
#[derive(Debug, Clone)]
pub struct LogInterpreter {
    completion_phrase: String,
}

impl Default for LogInterpreter {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLETION_PHRASE)
    }
}

impl LogInterpreter {
    pub fn new(completion_phrase: impl Into<String>) -> Self {
        Self {
            completion_phrase: completion_phrase.into().to_lowercase(),
        }
    }

    pub fn completion_phrase(&self) -> &str {
        &self.completion_phrase
    }

    /// True when the batch describes a fresh attempt (retry or redeploy)
    pub fn starts_new_attempt(batch: &[LogEntry]) -> bool {
        batch
            .iter()
            .filter_map(|entry| entry.step.as_deref())
            .any(steps::is_start_step)
    }

    /// Merge `batch` into `previous`.
    ///
    /// Progress only moves forward against `previous` unless the batch holds a
    /// start marker, in which case the baseline is reset to a blank snapshot.
    pub fn interpret(
        &self,
        batch: &[LogEntry],
        previous: &ProgressSnapshot,
        target: &InstallTarget,
    ) -> ProgressSnapshot {
        if batch.is_empty() {
            return *previous;
        }

        let baseline = if Self::starts_new_attempt(batch) {
            ProgressSnapshot::default()
        } else {
            *previous
        };

        let scan = self.scan(batch, target);

        // complete and failed are exclusive until the next reset
        let installation_complete =
            baseline.installation_complete || (scan.complete && !baseline.creation_failed);
        let creation_failed =
            baseline.creation_failed || (scan.failed && !baseline.installation_complete);

        let last_timestamp = batch
            .last()
            .and_then(|entry| entry.timestamp)
            .or(baseline.last_timestamp);

        ProgressSnapshot {
            highest_step_index: baseline.highest_step_index.max(scan.max_index),
            installation_complete,
            creation_failed,
            last_timestamp,
        }
    }

    fn scan(&self, batch: &[LogEntry], target: &InstallTarget) -> BatchScan {
        let mut scan = BatchScan::default();

        for entry in batch {
            let message = entry.effective_message().to_lowercase();

            if message.contains(&self.completion_phrase) {
                scan.max_index = FINAL_STEP;
                scan.complete = true;
                break;
            }

            if is_creation_error(entry, &message) {
                scan.failed = true;
                break;
            }

            scan.max_index = scan.max_index.max(steps::matched_step(&message, target));
            if scan.max_index == FINAL_STEP {
                break;
            }
        }

        scan
    }
}

fn is_creation_error(entry: &LogEntry, normalized_message: &str) -> bool {
    entry.step.as_deref() == Some(ERROR_STEP)
        || normalized_message.contains(&ERROR_STEP.to_lowercase())
}
