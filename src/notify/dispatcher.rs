//! Edge-triggered install notifications
//!
//! The dispatcher is a pure state machine: given the current statuses, the
//! tracked ids and the preferences, it returns the effects to run and
//! remembers the lifecycle it observed for each id. Running the effects is
//! left to [`super::EffectRunner`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::routes;
use crate::api::{Cluster, ClusterStatus, Project};
use crate::config::NotificationConfig;
use crate::lifecycle::{self, LifecycleState};
use crate::progress::ProgressCache;
use crate::tracking::TrackedInstall;

/// The two user switches gating visible effects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub desktop: bool,
    pub sound: bool,
}

impl Preferences {
    pub fn any_enabled(&self) -> bool {
        self.desktop || self.sound
    }
}

impl From<&NotificationConfig> for Preferences {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            desktop: config.desktop,
            sound: config.sound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Succeeded,
    Failed,
}

/// A desktop notification ready to be shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallNotification {
    pub cluster_id: String,
    pub outcome: Outcome,
    pub title: String,
    pub body: String,
    /// Coalescing tag; always the cluster id
    pub tag: String,
    /// Console path opened when the notification is clicked
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEffect {
    Untrack { cluster_id: String },
    Notify(InstallNotification),
    PlaySound { cluster_id: String },
}

/// Observed lifecycle change of a tracked installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleChange {
    pub cluster_id: String,
    pub from: LifecycleState,
    pub to: LifecycleState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub effects: Vec<DispatchEffect>,
    pub changes: Vec<LifecycleChange>,
}

/// Everything one evaluation tick looks at
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    pub organization_id: &'a str,
    pub statuses: &'a [ClusterStatus],
    pub tracked: &'a [TrackedInstall],
    pub progress: &'a ProgressCache,
    pub clusters: &'a [Cluster],
    pub projects: &'a [Project],
    pub preferences: Preferences,
}

/// Per-session dedup set and previous-lifecycle map
#[derive(Debug, Clone, Default)]
pub struct NotificationDispatcher {
    previous: HashMap<String, LifecycleState>,
    notified: HashSet<String>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_state(&self, cluster_id: &str) -> LifecycleState {
        self.previous.get(cluster_id).copied().unwrap_or_default()
    }

    pub fn was_notified(&self, cluster_id: &str) -> bool {
        self.notified.contains(cluster_id)
    }

    /// Evaluate one refresh of the status collection
    pub fn tick(&mut self, input: TickInput<'_>) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let tracked: HashMap<&str, &TrackedInstall> = input
            .tracked
            .iter()
            .map(|install| (install.id.as_str(), install))
            .collect();

        for status in input.statuses {
            let cluster_id = status.cluster_id.as_str();
            let Some(install) = tracked.get(cluster_id) else {
                continue;
            };

            let snapshot = input.progress.get(cluster_id);
            let derived = lifecycle::derive(snapshot.as_ref(), status.status, status.is_deployed);
            let previous = self.previous_state(cluster_id);

            if input.preferences.any_enabled() {
                self.evaluate_transition(&input, install, previous, derived, &mut outcome);
            }

            if previous != derived {
                tracing::debug!(cluster_id, from = %previous, to = %derived, "Lifecycle changed");
                outcome.changes.push(LifecycleChange {
                    cluster_id: cluster_id.to_string(),
                    from: previous,
                    to: derived,
                });
            }
            self.previous.insert(cluster_id.to_string(), derived);
        }

        outcome
    }

    fn evaluate_transition(
        &mut self,
        input: &TickInput<'_>,
        install: &TrackedInstall,
        previous: LifecycleState,
        derived: LifecycleState,
        outcome: &mut TickOutcome,
    ) {
        let cluster_id = install.id.as_str();
        let to_failure = previous != LifecycleState::Failed && derived == LifecycleState::Failed;
        let to_success =
            previous != LifecycleState::Succeeded && derived == LifecycleState::Succeeded;

        let result = if to_failure {
            Outcome::Failed
        } else if to_success {
            Outcome::Succeeded
        } else {
            return;
        };

        if !self.notified.insert(cluster_id.to_string()) {
            return;
        }

        tracing::info!(cluster_id, outcome = ?result, "Cluster installation finished");
        outcome.effects.push(DispatchEffect::Untrack {
            cluster_id: cluster_id.to_string(),
        });

        let name = display_name(install, input.clusters);
        if input.preferences.desktop {
            let notification = match result {
                Outcome::Failed => failure_notification(input.organization_id, cluster_id, &name),
                Outcome::Succeeded => success_notification(
                    input.organization_id,
                    cluster_id,
                    &name,
                    input.projects.first(),
                ),
            };
            outcome.effects.push(DispatchEffect::Notify(notification));
        }

        if result == Outcome::Succeeded && input.preferences.sound {
            outcome.effects.push(DispatchEffect::PlaySound {
                cluster_id: cluster_id.to_string(),
            });
        }
    }
}

fn display_name(install: &TrackedInstall, clusters: &[Cluster]) -> String {
    install
        .name
        .clone()
        .or_else(|| {
            clusters
                .iter()
                .find(|cluster| cluster.id == install.id)
                .and_then(|cluster| cluster.name.clone())
        })
        .unwrap_or_else(|| "Cluster".to_string())
}

fn failure_notification(organization_id: &str, cluster_id: &str, name: &str) -> InstallNotification {
    InstallNotification {
        cluster_id: cluster_id.to_string(),
        outcome: Outcome::Failed,
        title: format!("{} installation failed", name),
        body: format!("{} installation failed. Check cluster logs for details.", name),
        tag: cluster_id.to_string(),
        link: routes::infra_logs_path(organization_id, cluster_id),
    }
}

fn success_notification(
    organization_id: &str,
    cluster_id: &str,
    name: &str,
    first_project: Option<&Project>,
) -> InstallNotification {
    let (body, link) = match first_project {
        Some(project) => (
            format!(
                "{} is ready. You can deploy your apps now in {}.",
                name, project.name
            ),
            routes::project_overview_path(organization_id, &project.id),
        ),
        None => (
            format!("{} is ready. You can deploy your apps now.", name),
            routes::cluster_overview_path(organization_id, cluster_id),
        ),
    };

    InstallNotification {
        cluster_id: cluster_id.to_string(),
        outcome: Outcome::Succeeded,
        title: format!("{} installed", name),
        body,
        tag: cluster_id.to_string(),
        link,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClusterState;

    const BOTH: Preferences = Preferences {
        desktop: true,
        sound: true,
    };

    fn tracked(id: &str, name: Option<&str>) -> TrackedInstall {
        TrackedInstall::new(id, name.map(str::to_string))
    }

    fn tick(
        dispatcher: &mut NotificationDispatcher,
        statuses: &[ClusterStatus],
        tracked: &[TrackedInstall],
        projects: &[Project],
        preferences: Preferences,
    ) -> TickOutcome {
        let progress = ProgressCache::new();
        dispatcher.tick(TickInput {
            organization_id: "org",
            statuses,
            tracked,
            progress: &progress,
            clusters: &[],
            projects,
            preferences,
        })
    }

    #[test]
    fn test_success_effects() {
        let mut dispatcher = NotificationDispatcher::new();
        let projects = vec![Project {
            id: "p1".to_string(),
            name: "Backend".to_string(),
        }];
        let outcome = tick(
            &mut dispatcher,
            &[ClusterStatus::new("c1", Some(ClusterState::Deployed))],
            &[tracked("c1", Some("demo1"))],
            &projects,
            BOTH,
        );

        assert_eq!(outcome.effects.len(), 3);
        assert_eq!(
            outcome.effects[0],
            DispatchEffect::Untrack {
                cluster_id: "c1".to_string()
            }
        );
        match &outcome.effects[1] {
            DispatchEffect::Notify(n) => {
                assert_eq!(n.title, "demo1 installed");
                assert_eq!(
                    n.body,
                    "demo1 is ready. You can deploy your apps now in Backend."
                );
                assert_eq!(n.tag, "c1");
                assert_eq!(n.link, "/organization/org/project/p1/overview");
            }
            other => panic!("expected notification, got {:?}", other),
        }
        assert!(matches!(outcome.effects[2], DispatchEffect::PlaySound { .. }));
        assert_eq!(
            outcome.changes,
            vec![LifecycleChange {
                cluster_id: "c1".to_string(),
                from: LifecycleState::Idle,
                to: LifecycleState::Succeeded,
            }]
        );
    }

    #[test]
    fn test_failure_links_to_logs_without_sound() {
        let mut dispatcher = NotificationDispatcher::new();
        let outcome = tick(
            &mut dispatcher,
            &[ClusterStatus::new("c1", Some(ClusterState::DeploymentError))],
            &[tracked("c1", None)],
            &[],
            BOTH,
        );

        assert_eq!(outcome.effects.len(), 2);
        match &outcome.effects[1] {
            DispatchEffect::Notify(n) => {
                assert_eq!(n.outcome, Outcome::Failed);
                assert_eq!(n.title, "Cluster installation failed");
                assert_eq!(n.link, "/organization/org/infra-logs/c1");
            }
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_name_falls_back_to_cluster_list() {
        let mut dispatcher = NotificationDispatcher::new();
        let progress = ProgressCache::new();
        let clusters = vec![Cluster {
            id: "c1".to_string(),
            name: Some("from-list".to_string()),
            cloud_provider: None,
        }];
        let outcome = dispatcher.tick(TickInput {
            organization_id: "org",
            statuses: &[ClusterStatus::new("c1", Some(ClusterState::Ready))],
            tracked: &[tracked("c1", None)],
            progress: &progress,
            clusters: &clusters,
            projects: &[],
            preferences: BOTH,
        });
        match &outcome.effects[1] {
            DispatchEffect::Notify(n) => {
                assert_eq!(n.title, "from-list installed");
                assert_eq!(n.body, "from-list is ready. You can deploy your apps now.");
                assert_eq!(n.link, "/organization/org/cluster/c1/overview");
            }
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_preferences_only_track_state() {
        let mut dispatcher = NotificationDispatcher::new();
        let outcome = tick(
            &mut dispatcher,
            &[ClusterStatus::new("c1", Some(ClusterState::Deployed))],
            &[tracked("c1", None)],
            &[],
            Preferences::default(),
        );
        assert!(outcome.effects.is_empty());
        assert_eq!(dispatcher.previous_state("c1"), LifecycleState::Succeeded);
        assert!(!dispatcher.was_notified("c1"));
    }

    #[test]
    fn test_sound_only_preferences() {
        let mut dispatcher = NotificationDispatcher::new();
        let outcome = tick(
            &mut dispatcher,
            &[ClusterStatus::new("c1", Some(ClusterState::Deployed))],
            &[tracked("c1", None)],
            &[],
            Preferences {
                desktop: false,
                sound: true,
            },
        );
        assert_eq!(outcome.effects.len(), 2);
        assert!(matches!(outcome.effects[0], DispatchEffect::Untrack { .. }));
        assert!(matches!(outcome.effects[1], DispatchEffect::PlaySound { .. }));
    }

    #[test]
    fn test_duplicate_statuses_in_one_tick_notify_once() {
        let mut dispatcher = NotificationDispatcher::new();
        let status = ClusterStatus::new("c1", Some(ClusterState::Deployed));
        let outcome = tick(
            &mut dispatcher,
            &[status.clone(), status],
            &[tracked("c1", None)],
            &[],
            BOTH,
        );
        let notifications = outcome
            .effects
            .iter()
            .filter(|e| matches!(e, DispatchEffect::Notify(_)))
            .count();
        assert_eq!(notifications, 1);
    }

    #[test]
    fn test_failure_after_success_is_deduplicated() {
        let mut dispatcher = NotificationDispatcher::new();
        let tracked = [tracked("c1", None)];
        tick(
            &mut dispatcher,
            &[ClusterStatus::new("c1", Some(ClusterState::Deployed))],
            &tracked,
            &[],
            BOTH,
        );
        let outcome = tick(
            &mut dispatcher,
            &[ClusterStatus::new("c1", Some(ClusterState::DeploymentError))],
            &tracked,
            &[],
            BOTH,
        );
        assert!(outcome.effects.is_empty());
        assert_eq!(dispatcher.previous_state("c1"), LifecycleState::Failed);
    }
}
