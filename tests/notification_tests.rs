//! Notification flow tests: dispatcher, tracked-install store and effect runner together

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;

use clusterwatch::api::{ClusterState, ClusterStatus, LogEntry};
use clusterwatch::lifecycle::LifecycleState;
use clusterwatch::notify::{
    DispatchEffect, EffectRunner, InstallNotification, NotificationDispatcher, Notifier,
    NotifyError, Preferences, SoundPlayer, TickInput,
};
use clusterwatch::progress::{InstallTarget, LogInterpreter, ProgressCache, FINAL_STEP};
use clusterwatch::tracking::{
    FileStorage, MemoryStorage, Storage, TrackedInstall, TrackedInstallStore,
    TRACKING_STORAGE_KEY,
};

const ALL_ON: Preferences = Preferences {
    desktop: true,
    sound: true,
};

#[derive(Default)]
struct RecordingNotifier {
    shown: Mutex<Vec<InstallNotification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: &InstallNotification, _link: &str) -> Result<(), NotifyError> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[derive(Default)]
struct CountingPlayer {
    plays: Mutex<usize>,
}

#[async_trait]
impl SoundPlayer for CountingPlayer {
    async fn play(&self) -> Result<(), NotifyError> {
        *self.plays.lock().unwrap() += 1;
        Ok(())
    }
}

struct Harness {
    store: TrackedInstallStore,
    dispatcher: NotificationDispatcher,
    progress: ProgressCache,
    runner: EffectRunner,
    notifier: Arc<RecordingNotifier>,
    player: Arc<CountingPlayer>,
}

impl Harness {
    fn new() -> Self {
        let store = TrackedInstallStore::in_memory();
        let notifier = Arc::new(RecordingNotifier::default());
        let player = Arc::new(CountingPlayer::default());
        let runner = EffectRunner::new(
            store.clone(),
            notifier.clone(),
            player.clone(),
            "https://console.example.com",
        );
        Self {
            store,
            dispatcher: NotificationDispatcher::new(),
            progress: ProgressCache::new(),
            runner,
            notifier,
            player,
        }
    }

    /// One refresh: read the tracked list, tick, run the effects
    async fn tick(&mut self, statuses: &[ClusterStatus]) -> Vec<DispatchEffect> {
        let tracked = self.store.list();
        let outcome = self.dispatcher.tick(TickInput {
            organization_id: "org-1",
            statuses,
            tracked: &tracked,
            progress: &self.progress,
            clusters: &[],
            projects: &[],
            preferences: ALL_ON,
        });
        self.runner.run(&outcome.effects).await;
        outcome.effects
    }
}

fn status(state: ClusterState) -> Vec<ClusterStatus> {
    vec![ClusterStatus::new("c1", Some(state))]
}

/// idle -> installing -> succeeded, with the success repeated on later ticks
#[tokio::test]
async fn test_success_notifies_exactly_once() {
    let mut harness = Harness::new();
    harness.store.track("c1", Some("demo1".to_string()));

    let ticks = [
        status(ClusterState::BuildQueued),
        status(ClusterState::Deploying),
        status(ClusterState::Deployed),
        status(ClusterState::Deployed),
        status(ClusterState::Deployed),
    ];

    let mut effects_per_tick = Vec::new();
    for (index, statuses) in ticks.iter().enumerate() {
        effects_per_tick.push(harness.tick(statuses).await.len());
        if index == 2 {
            assert!(!harness.store.contains("c1"), "c1 still tracked after success");
        }
    }

    assert_eq!(effects_per_tick, vec![0, 0, 3, 0, 0]);
    let shown = harness.notifier.shown.lock().unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "demo1 installed");
    assert_eq!(*harness.player.plays.lock().unwrap(), 1);
}

/// In installer order the deprecated-API check ends the log scan before the
/// completion line, so success comes from the DEPLOYED status
#[tokio::test]
async fn test_success_after_final_step_comes_from_status() {
    let mut harness = Harness::new();
    harness.store.track("c1", Some("demo1".to_string()));

    let batch = vec![
        LogEntry::step("Create"),
        LogEntry::message("Deployment EKS cluster demo1"),
        LogEntry::message("Saved the plan to: tf_plan"),
        LogEntry::message("Preparing Helm files on disk"),
        LogEntry::message("Check if cluster has calls to deprecated kubernetes API"),
        LogEntry::message("Kubernetes cluster successfully created"),
    ];
    let snapshot = harness.progress.record(
        "c1",
        &batch,
        &LogInterpreter::default(),
        &InstallTarget::new(Some("demo1".to_string()), Some("EKS")),
    );
    assert_eq!(snapshot.highest_step_index, FINAL_STEP);
    assert!(!snapshot.installation_complete);

    assert!(harness.tick(&status(ClusterState::Deploying)).await.is_empty());
    assert_eq!(harness.dispatcher.previous_state("c1"), LifecycleState::Installing);

    let effects = harness.tick(&status(ClusterState::Deployed)).await;

    assert!(matches!(effects[0], DispatchEffect::Untrack { .. }));
    assert_eq!(harness.dispatcher.previous_state("c1"), LifecycleState::Succeeded);
    let shown = harness.notifier.shown.lock().unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "demo1 installed");
    assert!(harness.store.list().is_empty());
}

#[tokio::test]
async fn test_untracked_installs_never_notify() {
    let mut harness = Harness::new();
    harness.store.track("other", None);

    for state in [
        ClusterState::Deploying,
        ClusterState::DeploymentError,
        ClusterState::Deploying,
        ClusterState::Deployed,
    ] {
        assert!(harness.tick(&status(state)).await.is_empty());
    }

    assert!(harness.notifier.shown.lock().unwrap().is_empty());
    assert_eq!(*harness.player.plays.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_failure_notifies_without_sound() {
    let mut harness = Harness::new();
    harness.store.track("c1", None);

    harness.tick(&status(ClusterState::Deploying)).await;
    harness.tick(&status(ClusterState::DeploymentError)).await;

    let shown = harness.notifier.shown.lock().unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Cluster installation failed");
    assert_eq!(
        shown[0].body,
        "Cluster installation failed. Check cluster logs for details."
    );
    assert_eq!(shown[0].tag, "c1");
    assert_eq!(*harness.player.plays.lock().unwrap(), 0);
    assert!(harness.store.list().is_empty());
}

/// A success seen through the deployed flag alone still counts
#[tokio::test]
async fn test_deployed_flag_completes_installation() {
    let mut harness = Harness::new();
    harness.store.track("c1", None);

    let effects = harness
        .tick(&[ClusterStatus::new("c1", Some(ClusterState::Unknown)).with_deployed(true)])
        .await;

    assert!(matches!(effects[0], DispatchEffect::Untrack { .. }));
    assert_eq!(harness.notifier.shown.lock().unwrap().len(), 1);
}

#[test]
fn test_entries_older_than_a_day_are_dropped() {
    let storage = Arc::new(MemoryStorage::new());
    let stale = TrackedInstall {
        id: "stale".to_string(),
        name: None,
        created_at: Utc::now() - Duration::hours(25),
    };
    let fresh = TrackedInstall {
        id: "fresh".to_string(),
        name: None,
        created_at: Utc::now() - Duration::hours(1),
    };
    storage
        .write(
            TRACKING_STORAGE_KEY,
            &serde_json::to_string(&vec![stale, fresh]).unwrap(),
        )
        .unwrap();

    let store = TrackedInstallStore::new(storage.clone(), Duration::hours(24));
    let ids: Vec<String> = store.list().into_iter().map(|i| i.id).collect();

    assert_eq!(ids, vec!["fresh".to_string()]);
    let persisted = storage.read(TRACKING_STORAGE_KEY).unwrap().unwrap();
    assert!(!persisted.contains("stale"));
}

#[test]
fn test_tracking_survives_restart() {
    let temp_dir = TempDir::new().unwrap();

    let first = TrackedInstallStore::new(
        Arc::new(FileStorage::new(temp_dir.path())),
        Duration::hours(24),
    );
    first.track("c1", Some("demo1".to_string()));
    first.track("c1", Some("renamed".to_string()));
    drop(first);

    let second = TrackedInstallStore::new(
        Arc::new(FileStorage::new(temp_dir.path())),
        Duration::hours(24),
    );
    let installs = second.list();
    assert_eq!(installs.len(), 1);
    assert_eq!(installs[0].name.as_deref(), Some("renamed"));
    assert!(temp_dir
        .path()
        .join(format!("{}.json", TRACKING_STORAGE_KEY))
        .exists());
}
