//! clusterwatch - Kubernetes cluster installation watcher
//!
//! Infers how far a cluster installation has progressed from its raw
//! provisioning log, classifies it as idle, installing, succeeded or failed,
//! and notifies the user exactly once when an installation they started
//! reaches a terminal state.
//!
//! # Architecture
//!
//! - **Progress inference**: heuristic log interpretation with ratcheted,
//!   monotone progress per installation
//! - **Lifecycle derivation**: combines the log verdict with the server status
//! - **Notification dispatch**: edge-triggered, deduplicated completion
//!   notifications for tracked installations only
//! - **Tracking**: durable list of installations started from this machine,
//!   expiring after 24 hours
//!
//! # Main Modules
//!
//! - [`progress`] - Log interpreter, step catalogue and progress cache
//! - [`lifecycle`] - Lifecycle state derivation
//! - [`notify`] - Notification dispatcher and effect backends
//! - [`tracking`] - Tracked-install store
//! - [`status`] - Status cache and push bridge
//! - [`watcher`] - Polling loop wiring everything together
//!
//! # Example
//!
//! ```rust
//! use clusterwatch::api::LogEntry;
//! use clusterwatch::progress::{InstallTarget, LogInterpreter, ProgressSnapshot};
//!
//! let interpreter = LogInterpreter::default();
//! let target = InstallTarget::new(Some("demo1".to_string()), Some("EKS"));
//! let batch = vec![
//!     LogEntry::step("Create"),
//!     LogEntry::message("Deployment EKS cluster demo1"),
//!     LogEntry::message("Saved the plan to: tf_plan"),
//! ];
//!
//! let snapshot = interpreter.interpret(&batch, &ProgressSnapshot::default(), &target);
//! assert_eq!(snapshot.highest_step_index, 2);
//! ```

pub mod api;
pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod notify;
pub mod progress;
pub mod status;
pub mod tracking;
pub mod watcher;

pub use api::{ApiClient, ClusterApi};
pub use config::AppConfig;
pub use lifecycle::LifecycleState;
pub use notify::NotificationDispatcher;
pub use progress::{LogInterpreter, ProgressCache, ProgressSnapshot};
pub use tracking::TrackedInstallStore;
pub use watcher::{InstallWatcher, WatchEvent};
