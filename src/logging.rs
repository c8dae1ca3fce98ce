use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for the given verbosity
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "clusterwatch=debug,info"
    } else {
        "clusterwatch=info,warn"
    }
}

/// Initialize logging
///
/// With `log_file` set, events go to [`log_path`] (appending, after a session
/// start marker) instead of stderr, so `watch` output stays readable.
/// `RUST_LOG` takes precedence over the default filter.
pub fn init_logging(verbose: bool, log_file: bool) -> std::io::Result<()> {
    let filter = default_filter(verbose);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if !log_file {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .init();
        return Ok(());
    }

    let log_path = log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "\n=== clusterwatch session started at {} ===\n", timestamp)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(())
}

/// Get the log file path
pub fn log_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("clusterwatch").join("clusterwatch.log")
    } else {
        PathBuf::from("clusterwatch.log")
    }
}
