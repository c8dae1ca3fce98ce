//! Composition root: polls the API, feeds the caches, ticks the dispatcher
//!
//! One [`InstallWatcher`] owns the session state (progress table, status
//! table, dispatcher bookkeeping) so that separate watchers never share it
//! by accident.

pub mod events;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

pub use events::WatchEvent;

use crate::api::{Cluster, ClusterApi, Project};
use crate::config::AppConfig;
use crate::notify::{DispatchEffect, EffectRunner, NotificationDispatcher, Preferences, TickInput};
use crate::progress::{InstallTarget, LogInterpreter, ProgressCache, ProgressView};
use crate::status::{StatusBridge, StatusCache, StatusKey};
use crate::tracking::{TrackedInstall, TrackedInstallStore};

/// Settings of one watch session
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub organization_id: String,
    pub poll_interval: Duration,
    pub preferences: Preferences,
    pub completion_phrase: String,
}

impl WatchOptions {
    pub fn from_config(config: &AppConfig, organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            preferences: Preferences::from(&config.notifications),
            completion_phrase: config.completion_phrase.clone(),
        }
    }
}

pub struct InstallWatcher {
    api: Arc<dyn ClusterApi>,
    options: WatchOptions,
    interpreter: LogInterpreter,
    progress: ProgressCache,
    statuses: StatusCache,
    store: TrackedInstallStore,
    dispatcher: NotificationDispatcher,
    runner: EffectRunner,
    clusters: Vec<Cluster>,
    projects: Vec<Project>,
}

impl InstallWatcher {
    pub fn new(
        api: Arc<dyn ClusterApi>,
        store: TrackedInstallStore,
        runner: EffectRunner,
        options: WatchOptions,
    ) -> Self {
        Self {
            api,
            interpreter: LogInterpreter::new(options.completion_phrase.clone()),
            options,
            progress: ProgressCache::new(),
            statuses: StatusCache::new(),
            store,
            dispatcher: NotificationDispatcher::new(),
            runner,
            clusters: Vec::new(),
            projects: Vec::new(),
        }
    }

    pub fn progress_cache(&self) -> &ProgressCache {
        &self.progress
    }

    pub fn status_cache(&self) -> &StatusCache {
        &self.statuses
    }

    /// Push bridge writing into this watcher's status table
    pub fn status_bridge(&self, cluster_id: &str) -> StatusBridge {
        StatusBridge::new(
            StatusKey::new(self.options.organization_id.as_str(), cluster_id),
            self.statuses.clone(),
        )
    }

    /// Run until `shutdown` flips to true or its sender is dropped
    pub async fn run(mut self, events: mpsc::Sender<WatchEvent>, mut shutdown: watch::Receiver<bool>) {
        let mut status_rx = self.statuses.subscribe();
        let mut tracked_rx = self.store.subscribe();
        let mut interval = tokio::time::interval(self.options.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            organization_id = %self.options.organization_id,
            interval_secs = self.options.poll_interval.as_secs(),
            "Watching cluster installations"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.poll_once(&events).await;
                }
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.evaluate(&events).await;
                }
                changed = tracked_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.evaluate(&events).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Watcher stopped");
    }

    /// One polling round: cluster list, logs of every tracked install, statuses
    pub async fn poll_once(&mut self, events: &mpsc::Sender<WatchEvent>) {
        let organization_id = self.options.organization_id.clone();
        let tracked = self.store.list();

        match self.api.clusters(&organization_id).await {
            Ok(clusters) => self.clusters = clusters,
            Err(e) => tracing::warn!("Failed to fetch clusters: {}", e),
        }

        if self.projects.is_empty() {
            match self.api.projects(&organization_id).await {
                Ok(projects) => self.projects = projects,
                Err(e) => tracing::warn!("Failed to fetch projects: {}", e),
            }
        }

        let api = self.api.as_ref();
        let fetches = tracked.iter().map(|install| {
            let organization_id = organization_id.as_str();
            async move { (install, api.cluster_logs(organization_id, &install.id).await) }
        });

        for (install, result) in join_all(fetches).await {
            let batch = match result {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(cluster_id = %install.id, "Failed to fetch logs: {}", e);
                    continue;
                }
            };

            let target = self.target_for(install);
            let snapshot = self
                .progress
                .record(&install.id, &batch, &self.interpreter, &target);
            let view =
                ProgressView::from_snapshot(&snapshot, LogInterpreter::starts_new_attempt(&batch));
            tracing::debug!(
                cluster_id = %install.id,
                step = snapshot.highest_step_index,
                complete = snapshot.installation_complete,
                failed = snapshot.creation_failed,
                "Progress updated"
            );
            let _ = events
                .send(WatchEvent::Progress {
                    cluster_id: install.id.clone(),
                    view,
                })
                .await;
        }

        match self.api.cluster_statuses(&organization_id).await {
            Ok(statuses) => self.statuses.put_all(&organization_id, statuses),
            Err(e) => tracing::warn!("Failed to fetch cluster statuses: {}", e),
        }
    }

    /// Dispatcher tick over the current status table and tracked list
    pub async fn evaluate(&mut self, events: &mpsc::Sender<WatchEvent>) {
        let statuses = self.statuses.statuses(&self.options.organization_id);
        let tracked = self.store.list();

        let outcome = self.dispatcher.tick(TickInput {
            organization_id: &self.options.organization_id,
            statuses: &statuses,
            tracked: &tracked,
            progress: &self.progress,
            clusters: &self.clusters,
            projects: &self.projects,
            preferences: self.options.preferences,
        });

        self.runner.run(&outcome.effects).await;

        for change in outcome.changes {
            let _ = events.send(WatchEvent::Lifecycle(change)).await;
        }

        // Untracked is the last event a UI sees for an installation
        let mut untracked = Vec::new();
        for effect in outcome.effects {
            match effect {
                DispatchEffect::Notify(notification) => {
                    let _ = events.send(WatchEvent::Notified(notification)).await;
                }
                DispatchEffect::Untrack { cluster_id } => untracked.push(cluster_id),
                DispatchEffect::PlaySound { .. } => {}
            }
        }
        for cluster_id in untracked {
            let _ = events.send(WatchEvent::Untracked { cluster_id }).await;
        }
    }

    fn target_for(&self, install: &TrackedInstall) -> InstallTarget {
        let cluster = self.clusters.iter().find(|cluster| cluster.id == install.id);
        let name = cluster
            .and_then(|cluster| cluster.name.clone())
            .or_else(|| install.name.clone());
        let provider_code = cluster
            .and_then(|cluster| cluster.cloud_provider)
            .and_then(|provider| provider.provider_code());
        InstallTarget::new(name, provider_code)
    }
}
