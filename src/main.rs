//! clusterwatch - follow cluster installations from the command line
//!
//! Tracks installations started from this machine, shows their inferred
//! progress and sends a desktop notification when they finish.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use directories::ProjectDirs;
use tokio::sync::{mpsc, watch};

use clusterwatch::{
    api::{ApiClient, CloudProvider, LogEntry},
    config::AppConfig,
    logging,
    notify::{CommandNotifier, CommandSoundPlayer, EffectRunner, SilentPlayer, SoundPlayer},
    progress::{InstallTarget, LogInterpreter, ProgressSnapshot, ProgressView, StepStatus},
    tracking::{FileStorage, TrackedInstallStore},
    watcher::{InstallWatcher, WatchEvent, WatchOptions},
};

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start tracking an installation you just launched
    Track {
        /// Cluster id
        id: String,
        /// Display name used in notifications
        #[arg(long)]
        name: Option<String>,
    },
    /// Stop tracking an installation
    Untrack {
        /// Cluster id
        id: String,
    },
    /// List tracked installations
    List,
    /// Interpret a recorded log file and print the inferred progress
    Replay {
        /// JSON file holding an array of log entries
        path: PathBuf,
        /// Cluster name expected in the deployment banner
        #[arg(long)]
        name: Option<String>,
        /// Cloud provider (aws, gcp, azure, scaleway)
        #[arg(long)]
        provider: Option<String>,
    },
    /// Watch tracked installations until interrupted
    Watch {
        /// Organization id (overrides the configured one)
        #[arg(long)]
        organization: Option<String>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "clusterwatch")]
#[command(version)]
#[command(about = "Follow cluster installations and get notified when they finish", long_about = None)]
struct Args {
    /// Configuration file path (overrides defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the tracked installations
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to the log file instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref())?;

    logging::init_logging(config.verbose_logging(args.verbose), args.log_file)?;

    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(|| {
            ProjectDirs::from("com", "clusterwatch", "clusterwatch")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".clusterwatch"))
        });
    tracing::debug!("Using data directory {:?}", data_dir);

    let store = TrackedInstallStore::new(
        Arc::new(FileStorage::new(&data_dir)),
        chrono::Duration::hours(config.tracking_ttl_hours),
    );

    match args.command {
        Command::Track { id, name } => {
            store.track(&id, name);
            println!("Tracking {}", id);
        }
        Command::Untrack { id } => {
            store.untrack(&id);
            println!("Stopped tracking {}", id);
        }
        Command::List => print_tracked(&store),
        Command::Replay {
            path,
            name,
            provider,
        } => replay(&config, &path, name, provider.as_deref())?,
        Command::Watch { organization } => {
            let organization_id = organization
                .or_else(|| config.organization_id.clone())
                .context("No organization given: use --organization or set organization_id")?;
            watch_installs(&config, store, organization_id).await?;
        }
    }

    Ok(())
}

fn print_tracked(store: &TrackedInstallStore) {
    let installs = store.list();
    if installs.is_empty() {
        println!("No tracked installations");
        return;
    }

    for install in installs {
        let expires = install.created_at + store.ttl();
        println!(
            "{}  {}  tracked since {}  expires {}",
            install.id,
            install.name.as_deref().unwrap_or("-"),
            install.created_at.format("%Y-%m-%d %H:%M:%S"),
            expires.format("%Y-%m-%d %H:%M:%S"),
        );
    }
}

fn replay(
    config: &AppConfig,
    path: &Path,
    name: Option<String>,
    provider: Option<&str>,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read log file {:?}", path))?;
    let batch: Vec<LogEntry> =
        serde_json::from_str(&content).context("Log file must hold a JSON array of log entries")?;

    let provider = provider
        .map(str::parse::<CloudProvider>)
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let target = InstallTarget::new(name, provider.and_then(|p| p.provider_code()));

    let interpreter = LogInterpreter::new(config.completion_phrase.clone());
    let snapshot = interpreter.interpret(&batch, &ProgressSnapshot::default(), &target);
    let view = ProgressView::from_snapshot(&snapshot, LogInterpreter::starts_new_attempt(&batch));

    println!("{} entries, lifecycle: {}", batch.len(), view.lifecycle);
    for step in &view.steps {
        let marker = match step.status {
            StepStatus::Done => "[x]",
            StepStatus::Current => "[>]",
            StepStatus::Pending => "[ ]",
        };
        println!("  {} {}", marker, step.label);
    }
    println!("progress: {:.0}%", view.progress_value * 100.0);

    Ok(())
}

async fn watch_installs(
    config: &AppConfig,
    store: TrackedInstallStore,
    organization_id: String,
) -> anyhow::Result<()> {
    let api = Arc::new(ApiClient::new(&config.api)?);

    let sound: Arc<dyn SoundPlayer> = match &config.notifications.sound_path {
        Some(path) => Arc::new(CommandSoundPlayer::new(path, config.notifications.volume)),
        None => Arc::new(SilentPlayer),
    };
    let runner = EffectRunner::new(
        store.clone(),
        Arc::new(CommandNotifier::default()),
        sound,
        config.console_url.clone(),
    );

    let options = WatchOptions::from_config(config, organization_id);
    let watcher = InstallWatcher::new(api, store, runner, options);

    let (events_tx, mut events_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(watcher.run(events_tx, shutdown_rx));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, shutting down");
                let _ = shutdown_tx.send(true);
                break;
            }
        }
    }

    // a full channel would otherwise keep the watcher blocked on send
    drop(events_rx);
    handle.await?;
    Ok(())
}

fn print_event(event: &WatchEvent) {
    match event {
        WatchEvent::Progress { cluster_id, view } => println!(
            "{}  {:>3.0}%  {}",
            cluster_id,
            view.progress_value * 100.0,
            view.current_step_label
        ),
        WatchEvent::Lifecycle(change) => {
            println!("{}  {} -> {}", change.cluster_id, change.from, change.to)
        }
        WatchEvent::Notified(notification) => {
            println!("{}  notified: {}", notification.cluster_id, notification.title)
        }
        WatchEvent::Untracked { cluster_id } => println!("{}  no longer tracked", cluster_id),
    }
}
