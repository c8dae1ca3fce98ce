//! Install notifications
//!
//! - [`dispatcher`] - transition detection, dedup, effect planning
//! - [`runner`] - effect execution
//! - [`desktop`] - notification and sound backends
//! - [`routes`] - console deep links

pub mod desktop;
pub mod dispatcher;
pub mod routes;
pub mod runner;

use std::path::PathBuf;

use thiserror::Error;

pub use desktop::{CommandNotifier, CommandSoundPlayer, Notifier, SilentPlayer, SoundPlayer};
pub use dispatcher::{
    DispatchEffect, InstallNotification, LifecycleChange, NotificationDispatcher, Outcome,
    Preferences, TickInput, TickOutcome,
};
pub use runner::EffectRunner;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification backend unavailable: {0}")]
    Unavailable(String),

    #[error("Sound asset not found: {}", .0.display())]
    MissingAsset(PathBuf),
}
