use anyhow::{bail, Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::event::{AppEvent, EventSink};

pub const DEFAULT_CHECK_INTERVAL_SECS: i64 = 2;
pub const DEFAULT_START_DELAY_SECS: i64 = 0;
/// Seeded into a freshly created config file so users see the expected shape.
pub const EXAMPLE_GAME: &str = "VRChat.exe";

/// Root configuration document, stored as config.json in the base directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between process-table polls. Values <= 0 poll without sleeping.
    #[serde(default = "default_check_interval")]
    pub check_interval: i64,
    /// Seconds a tracked game must keep running before recording starts.
    #[serde(default = "default_start_delay")]
    pub start_delay: i64,
    /// Tracked games keyed by executable name, matched exactly against the
    /// process names reported by the OS.
    #[serde(default)]
    pub games: BTreeMap<String, GameSettings>,
}

impl Default for Config {
    fn default() -> Self {
        let mut games = BTreeMap::new();
        games.insert(EXAMPLE_GAME.to_string(), GameSettings::default());
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL_SECS,
            start_delay: DEFAULT_START_DELAY_SECS,
            games,
        }
    }
}

/// Per-game options. None are interpreted yet; unknown keys are kept so they
/// survive a load/save cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// The subset of [`Config`] the monitor needs for one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub games: Vec<String>,
    pub start_delay: Duration,
    pub check_interval: Duration,
}

impl Config {
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            games: self.games.keys().cloned().collect(),
            start_delay: non_negative_secs(self.start_delay),
            check_interval: non_negative_secs(self.check_interval),
        }
    }
}

fn non_negative_secs(secs: i64) -> Duration {
    Duration::from_secs(u64::try_from(secs).unwrap_or(0))
}

/// Loads the config file at `path`, first writing [`Config::default`] there if
/// the file does not exist. Returns an error if the file cannot be read or
/// is not valid JSON.
pub fn load_or_create(path: &Path) -> Result<Config> {
    if !path.exists() {
        save(path, &Config::default())?;
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Writes `config` to `path` as JSON with 4-space indentation, replacing any
/// previous content.
pub fn save(path: &Path, config: &Config) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    config
        .serialize(&mut ser)
        .context("Failed to serialize config")?;
    std::fs::write(path, buf)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

/// In-memory configuration shared between the tray and the monitor.
/// Every read and write goes through the one lock.
pub struct ConfigStore {
    path: PathBuf,
    config: Mutex<Config>,
}

impl ConfigStore {
    /// Loads (or creates) the config at `path`.
    pub fn open(path: PathBuf) -> Result<Self> {
        let config = load_or_create(&path)?;
        Ok(Self {
            path,
            config: Mutex::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Config {
        self.config.lock().clone()
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        self.config.lock().monitor_settings()
    }

    /// Re-reads the file, replacing the in-memory config. On error the
    /// previous config stays in place.
    pub fn reload(&self) -> Result<()> {
        let mut guard = self.config.lock();
        *guard = load_or_create(&self.path)?;
        Ok(())
    }

    /// Inserts `exe` with empty settings and persists immediately.
    /// An existing entry is overwritten; returns `true` in that case.
    pub fn add_game(&self, exe: &str) -> Result<bool> {
        if exe.is_empty() {
            bail!("Game executable name is empty");
        }
        let mut guard = self.config.lock();
        let replaced = guard
            .games
            .insert(exe.to_string(), GameSettings::default())
            .is_some();
        save(&self.path, &guard)?;
        Ok(replaced)
    }
}

/// Watches the directory containing the config file. Whenever the file is
/// created or modified, reloads `store` and reports the result to `sink`.
pub async fn watch_config<S: EventSink>(store: Arc<ConfigStore>, sink: S) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!("[config] Failed to create file watcher: {e}");
            return;
        }
    };

    // Watch the parent directory so editor-style atomic saves are caught.
    let path = store.path().to_path_buf();
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            tracing::warn!("[config] Config path has no parent directory");
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        tracing::warn!("[config] Failed to watch config directory: {e}");
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p.file_name() == path.file_name());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );
        if !(affects_config && is_write) {
            continue;
        }

        let outcome = match store.reload() {
            Ok(()) => {
                tracing::info!("[config] Reloaded after file change");
                AppEvent::ConfigReloaded
            }
            Err(e) => {
                tracing::warn!("[config] Failed to reload config: {e:#}");
                AppEvent::ConfigReloadFailed(format!("{e:#}"))
            }
        };
        if !sink.send(outcome) {
            break;
        }
    }
}

fn default_check_interval() -> i64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_start_delay() -> i64 {
    DEFAULT_START_DELAY_SECS
}
