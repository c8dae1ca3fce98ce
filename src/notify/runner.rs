//! Executes dispatcher effects

use std::sync::Arc;

use super::desktop::{Notifier, SoundPlayer};
use super::dispatcher::DispatchEffect;
use super::routes;
use crate::tracking::TrackedInstallStore;

/// Runs [`DispatchEffect`]s against the store, the notifier and the sound
/// player. Effect failures are logged; bookkeeping has already happened in
/// the dispatcher so nothing is retried.
#[derive(Clone)]
pub struct EffectRunner {
    store: TrackedInstallStore,
    notifier: Arc<dyn Notifier>,
    sound: Arc<dyn SoundPlayer>,
    console_url: String,
}

impl EffectRunner {
    pub fn new(
        store: TrackedInstallStore,
        notifier: Arc<dyn Notifier>,
        sound: Arc<dyn SoundPlayer>,
        console_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            sound,
            console_url: console_url.into(),
        }
    }

    pub async fn run(&self, effects: &[DispatchEffect]) {
        for effect in effects {
            match effect {
                DispatchEffect::Untrack { cluster_id } => self.store.untrack(cluster_id),
                DispatchEffect::Notify(notification) => {
                    let link = routes::absolute(&self.console_url, &notification.link);
                    if let Err(e) = self.notifier.show(notification, &link).await {
                        tracing::error!(
                            cluster_id = %notification.cluster_id,
                            "Unable to show cluster installation notification: {}",
                            e
                        );
                    }
                }
                DispatchEffect::PlaySound { cluster_id } => {
                    if let Err(e) = self.sound.play().await {
                        tracing::debug!(cluster_id = %cluster_id, "Unable to play completion sound: {}", e);
                    }
                }
            }
        }
    }
}
