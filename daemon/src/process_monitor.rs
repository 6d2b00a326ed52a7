use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::ConfigStore;
use crate::recorder::Recorder;
use crate::scanner::{self, ProcessTable};
use crate::session::{Action, Session};
use crate::status::Status;

/// How often a paused monitor re-checks whether automation was re-enabled.
const PAUSE_STEP: Duration = Duration::from_secs(1);

/// Channels connecting the monitor task to the rest of the app.
pub struct MonitorChannels {
    /// Status snapshots for the tray.
    pub status_tx: watch::Sender<Status>,
    /// `true` while automation is enabled. Written by the tray.
    pub automation_rx: watch::Receiver<bool>,
    /// Flips to `true` once on exit.
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Polls the process table every `check_interval` seconds and starts/stops
/// the recorder as tracked games appear and disappear.
///
/// Runs until shutdown is signalled. Shutdown is observed at the top of each
/// iteration and while sleeping, so it never waits out a full interval. If a
/// recording is active at that point it is stopped before returning.
pub async fn run<P, R>(
    store: Arc<ConfigStore>,
    mut table: P,
    recorder: R,
    mut channels: MonitorChannels,
) where
    P: ProcessTable + Send,
    R: Recorder + Send + Sync,
{
    let mut session = Session::new();

    loop {
        if *channels.shutdown_rx.borrow() {
            break;
        }

        let enabled = *channels.automation_rx.borrow_and_update();
        if !enabled {
            publish(&channels.status_tx, session.status(true));
            if !idle_for(&mut channels, PAUSE_STEP).await {
                break;
            }
            continue;
        }

        let settings = store.monitor_settings();
        let running = scanner::running_games(&table.process_names(), &settings.games);

        // tokio's clock so a paused test runtime drives the start delay too.
        let now = tokio::time::Instant::now().into_std();
        if let Some(action) = session.observe(&running, settings.start_delay, now) {
            execute(&mut session, &recorder, action).await;
        }
        publish(&channels.status_tx, session.status(false));

        if !idle_for(&mut channels, settings.check_interval).await {
            break;
        }
    }

    if let Some(action) = session.shutdown_action() {
        tracing::info!("[monitor] Stopping active recording before exit");
        execute(&mut session, &recorder, action).await;
    }
    publish(&channels.status_tx, session.status(false));
    tracing::info!("[monitor] Stopped");
}

async fn execute<R: Recorder>(session: &mut Session, recorder: &R, action: Action) {
    match &action {
        Action::Start(game) => tracing::info!("[monitor] Detected {game}, starting recording"),
        Action::Stop => tracing::info!("[monitor] No tracked game running, stopping recording"),
    }

    let outcome = recorder.invoke(action.command()).await;
    if outcome.is_success() {
        tracing::debug!("[recorder] {:?} succeeded", action.command());
    } else {
        tracing::warn!("[recorder] {:?} failed: {outcome}", action.command());
    }
    session.apply(&action, &outcome);
}

/// Sleeps for `duration`, waking early when automation is toggled.
/// Returns `false` if shutdown was signalled instead.
async fn idle_for(channels: &mut MonitorChannels, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = channels.shutdown_rx.changed() => false,
        Ok(()) = channels.automation_rx.changed() => true,
    }
}

/// Publishes `next` only if it differs from the current snapshot.
fn publish(tx: &watch::Sender<Status>, next: Status) {
    tx.send_if_modified(move |current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}
