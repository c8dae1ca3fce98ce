//! Events sent from the watcher loop to whatever renders them.

use crate::notify::{InstallNotification, LifecycleChange};
use crate::progress::ProgressView;

/// Events emitted by [`super::InstallWatcher`] for UIs and the CLI.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// Fresh progress for a tracked installation after a log poll.
    Progress {
        cluster_id: String,
        view: ProgressView,
    },

    /// A tracked installation moved to another lifecycle state.
    Lifecycle(LifecycleChange),

    /// A completion notification was dispatched.
    Notified(InstallNotification),

    /// An installation left the tracked list after reaching a terminal state.
    Untracked { cluster_id: String },
}
