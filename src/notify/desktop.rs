//! Desktop notification and completion sound backends
//!
//! Both shell out to the freedesktop tools (`notify-send`, `xdg-open`,
//! `paplay`). Everything here is best-effort: callers log failures and move on.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::dispatcher::InstallNotification;
use super::NotifyError;

/// Shows a notification; `link` is the absolute URL opened on click
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &InstallNotification, link: &str)
        -> Result<(), NotifyError>;
}

#[async_trait]
pub trait SoundPlayer: Send + Sync {
    async fn play(&self) -> Result<(), NotifyError>;
}

/// `notify-send` backed notifier
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    app_name: String,
}

impl Default for CommandNotifier {
    fn default() -> Self {
        Self {
            app_name: "clusterwatch".to_string(),
        }
    }
}

impl CommandNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    fn args(&self, notification: &InstallNotification) -> Vec<String> {
        vec![
            format!("--app-name={}", self.app_name),
            // same tag replaces the previous bubble instead of stacking
            format!(
                "--hint=string:x-canonical-private-synchronous:{}",
                notification.tag
            ),
            "--action=default=Open".to_string(),
            "--wait".to_string(),
            // cluster names may start with '-'
            "--".to_string(),
            notification.title.clone(),
            notification.body.clone(),
        ]
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn show(
        &self,
        notification: &InstallNotification,
        link: &str,
    ) -> Result<(), NotifyError> {
        let child = Command::new("notify-send")
            .args(self.args(notification))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| NotifyError::Unavailable(format!("notify-send: {}", e)))?;

        // --wait blocks until the bubble is dismissed or clicked
        let link = link.to_string();
        let cluster_id = notification.cluster_id.clone();
        tokio::spawn(async move {
            match child.wait_with_output().await {
                Ok(output) => {
                    let action = String::from_utf8_lossy(&output.stdout);
                    if action.trim() == "default" {
                        open_link(&link).await;
                    }
                }
                Err(e) => {
                    tracing::debug!(cluster_id = %cluster_id, "Notification wait failed: {}", e);
                }
            }
        });

        Ok(())
    }
}

async fn open_link(link: &str) {
    match Command::new("xdg-open")
        .arg(link)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::warn!("xdg-open exited with {} for {}", status, link),
        Err(e) => tracing::warn!("Unable to open {}: {}", link, e),
    }
}

/// `paplay` backed completion sound
#[derive(Debug, Clone)]
pub struct CommandSoundPlayer {
    asset: PathBuf,
    volume: f32,
}

/// paplay's 100% volume
const PAPLAY_FULL_VOLUME: f32 = 65536.0;

impl CommandSoundPlayer {
    pub fn new(asset: impl Into<PathBuf>, volume: f32) -> Self {
        Self {
            asset: asset.into(),
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn volume_arg(&self) -> String {
        format!("--volume={}", (self.volume * PAPLAY_FULL_VOLUME).round() as u32)
    }
}

#[async_trait]
impl SoundPlayer for CommandSoundPlayer {
    async fn play(&self) -> Result<(), NotifyError> {
        if !self.asset.exists() {
            return Err(NotifyError::MissingAsset(self.asset.clone()));
        }

        let mut child = Command::new("paplay")
            .arg(self.volume_arg())
            .arg(&self.asset)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| NotifyError::Unavailable(format!("paplay: {}", e)))?;

        tokio::spawn(async move {
            let _ = child.wait().await;
        });
        Ok(())
    }
}

/// Player used when no sound asset is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPlayer;

#[async_trait]
impl SoundPlayer for SilentPlayer {
    async fn play(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}
