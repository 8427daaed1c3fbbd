//! Warden CLI - founder admin console.
//!
//! ```text
//! main() -> config -> HttpAdminApi + TerminalVerifier -> AdminControl
//!                                                          |
//!                                      console::run() <----+
//!                                           |
//!                                           v
//!                                 AdminControl::shutdown()
//! ```
//!
//! Logs go to a file so they never interleave with console prompts.

mod console;
mod terminal;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use warden_engine::warden_client::HttpAdminApi;
use warden_engine::{AdminControl, WardenConfig};

use crate::terminal::{Prompter, TerminalVerifier};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than write over the console.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!("Failed to create log dir {}: {e}", parent.display()));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!("Failed to open log file {}: {e}", candidate.display()));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.warden/logs/warden.log
    if let Some(config_path) = WardenConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("warden.log"));
    }

    // Fallback: ./.warden/logs/warden.log
    candidates.push(PathBuf::from(".warden").join("logs").join("warden.log"));

    candidates
}

/// Print a notice whenever admin mode drops, including timer expiry.
fn spawn_session_watcher(control: &AdminControl) -> JoinHandle<()> {
    let mut updates = control.session().subscribe();
    tokio::spawn(async move {
        let mut was_active = updates.borrow_and_update().is_active();
        while updates.changed().await.is_ok() {
            let is_active = updates.borrow_and_update().is_active();
            if was_active && !is_active {
                println!("\n[admin mode is no longer active]");
            }
            was_active = is_active;
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = WardenConfig::load()
        .context("failed to load ~/.warden/config.toml")?
        .unwrap_or_default();
    let settings = config.http_settings()?;
    let api = HttpAdminApi::new(&settings).context("failed to build admin HTTP client")?;

    let prompter = Arc::new(Prompter::stdin());
    let control = AdminControl::new(
        Arc::new(config.credential_provider()),
        Arc::new(TerminalVerifier::new(prompter.clone())),
        Arc::new(api),
        config.device_id(),
    );
    tracing::info!(
        base_url = %settings.base_url,
        device_id = %control.device_id(),
        "Warden console started"
    );

    let watcher = spawn_session_watcher(&control);
    let result = console::run(&control, &prompter).await;

    control.shutdown().await;
    watcher.abort();
    result
}
