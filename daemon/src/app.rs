use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{self, ConfigStore};
use crate::event::{AppEvent, EventSink};
use crate::paths::AppPaths;
use crate::process_monitor::{self, MonitorChannels};
use crate::recorder::{CommandRecorder, RECORDER_TIMEOUT};
use crate::scanner::SystemProcessTable;
use crate::status::Status;

/// Upper bound on waiting for the monitor to stop a recording on exit. Covers
/// a start still in flight followed by the stop, plus some slack.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(2 * RECORDER_TIMEOUT.as_secs() + 5);

/// Everything the tray needs to drive the application: the shared config,
/// the background runtime and the channels to the monitor task.
pub struct App {
    runtime: Runtime,
    store: Arc<ConfigStore>,
    status_rx: watch::Receiver<Status>,
    automation_tx: watch::Sender<bool>,
    shutdown_tx: watch::Sender<bool>,
    monitor: Option<JoinHandle<()>>,
}

impl App {
    /// Loads the configuration and starts the background tasks:
    ///   - the process monitor
    ///   - the config file watcher
    ///   - a forwarder turning status changes into [`AppEvent::Status`]
    ///
    /// Fails if the config file exists but cannot be parsed.
    pub fn init<S: EventSink + Clone>(paths: &AppPaths, sink: S) -> Result<Self> {
        let store = Arc::new(ConfigStore::open(paths.config_file())?);
        tracing::info!(
            "[config] Loaded {} ({} tracked games)",
            store.path().display(),
            store.snapshot().games.len()
        );

        let recorder_path = paths.recorder_command();
        if !recorder_path.exists() {
            tracing::warn!("[recorder] Command not found: {}", recorder_path.display());
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;

        let (status_tx, status_rx) = watch::channel(Status::new());
        let (automation_tx, automation_rx) = watch::channel(true);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let monitor = runtime.spawn(process_monitor::run(
            Arc::clone(&store),
            SystemProcessTable::new(),
            CommandRecorder::new(recorder_path, RECORDER_TIMEOUT),
            MonitorChannels {
                status_tx,
                automation_rx,
                shutdown_rx,
            },
        ));

        runtime.spawn(config::watch_config(Arc::clone(&store), sink.clone()));

        {
            let mut status_rx = status_rx.clone();
            runtime.spawn(async move {
                while status_rx.changed().await.is_ok() {
                    let status = status_rx.borrow_and_update().clone();
                    if !sink.send(AppEvent::Status(status)) {
                        break;
                    }
                }
            });
        }

        Ok(Self {
            runtime,
            store,
            status_rx,
            automation_tx,
            shutdown_tx,
            monitor: Some(monitor),
        })
    }

    pub fn config_path(&self) -> &Path {
        self.store.path()
    }

    /// Latest snapshot published by the monitor.
    pub fn status(&self) -> Status {
        self.status_rx.borrow().clone()
    }

    pub fn is_paused(&self) -> bool {
        !*self.automation_tx.borrow()
    }

    /// Flips automation on/off and returns the new paused state.
    pub fn toggle_pause(&self) -> bool {
        self.automation_tx.send_modify(|enabled| *enabled = !*enabled);
        let paused = self.is_paused();
        tracing::info!("[tray] Automation {}", if paused { "paused" } else { "resumed" });
        paused
    }

    pub fn reload_config(&self) -> Result<()> {
        self.store.reload()?;
        tracing::info!("[config] Reloaded from tray");
        Ok(())
    }

    /// Adds `exe` as a tracked game. Returns `true` if it replaced an entry.
    pub fn add_game(&self, exe: &str) -> Result<bool> {
        let replaced = self.store.add_game(exe)?;
        tracing::info!("[config] Added game {exe}");
        Ok(replaced)
    }

    /// Signals shutdown and waits for the monitor to stop any active
    /// recording. Safe to call more than once.
    pub fn teardown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        let Some(handle) = self.monitor.take() else {
            return;
        };
        match self
            .runtime
            .block_on(async { tokio::time::timeout(TEARDOWN_TIMEOUT, handle).await })
        {
            Ok(Ok(())) => tracing::info!("Shut down cleanly"),
            Ok(Err(e)) => tracing::error!("[monitor] Task failed: {e}"),
            Err(_) => tracing::warn!("[monitor] Did not stop within {TEARDOWN_TIMEOUT:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn init_in(dir: &Path) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::init(&AppPaths::with_base(dir), tx).unwrap();
        (app, rx)
    }

    #[test]
    fn init_creates_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = init_in(dir.path());
        assert!(dir.path().join(crate::paths::CONFIG_FILE_NAME).exists());
        assert_eq!(app.config_path(), dir.path().join("config.json"));
        app.teardown();
    }

    #[test]
    fn init_fails_on_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{ nope").unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(App::init(&AppPaths::with_base(dir.path()), tx).is_err());
    }

    #[test]
    fn toggle_pause_flips_state() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = init_in(dir.path());
        assert!(!app.is_paused());
        assert!(app.toggle_pause());
        assert!(app.is_paused());
        assert!(!app.toggle_pause());
        app.teardown();
    }

    #[test]
    fn add_game_then_reload_keeps_the_game() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = init_in(dir.path());
        assert!(!app.add_game("game.exe").unwrap());
        app.reload_config().unwrap();
        let content = std::fs::read_to_string(app.config_path()).unwrap();
        assert!(content.contains("game.exe"));
        app.teardown();
    }

    #[test]
    fn teardown_waits_for_in_flight_start_and_stop() {
        assert!(TEARDOWN_TIMEOUT > RECORDER_TIMEOUT * 2);
    }

    #[test]
    fn teardown_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = init_in(dir.path());
        app.teardown();
        app.teardown();
        assert!(!app.status().is_recording());
    }
}
