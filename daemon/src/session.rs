/// The recording state machine driven by each poll of the process table.
///
/// ```text
///   Idle ──match──▶ Delaying ──delay elapsed──▶ Recording
///    ▲                 │                           │
///    └───no match──────┘◀──────────no match────────┘
/// ```
///
/// [`Session::observe`] decides what to do for one poll; the caller runs the
/// returned [`Action`] against the recorder and hands the outcome back to
/// [`Session::apply`].
use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

use crate::recorder::{RecorderCommand, RecorderOutcome};
use crate::status::{MonitorState, Status};

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Delaying { since: Instant },
    Recording { game: String, since: DateTime<Local> },
}

/// A recorder command the session wants issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start recording `game`.
    Start(String),
    Stop,
}

impl Action {
    pub fn command(&self) -> RecorderCommand {
        match self {
            Action::Start(_) => RecorderCommand::Start,
            Action::Stop => RecorderCommand::Stop,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    phase: Phase,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            last_error: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.phase, Phase::Recording { .. })
    }

    /// Advances the state machine for one poll. `running` are the tracked
    /// games currently running, in scan order.
    ///
    /// Returns the recorder command to issue, if any. A `Start` or `Stop`
    /// only takes effect once its outcome is passed to [`Session::apply`].
    pub fn observe(&mut self, running: &[String], start_delay: Duration, now: Instant) -> Option<Action> {
        if self.is_recording() {
            return running.is_empty().then_some(Action::Stop);
        }

        let Some(first) = running.first() else {
            // Game gone before the delay elapsed: abandon the timer.
            self.phase = Phase::Idle;
            return None;
        };
        let since = match self.phase {
            Phase::Delaying { since } => since,
            _ => now,
        };
        self.phase = Phase::Delaying { since };
        (now.saturating_duration_since(since) >= start_delay).then(|| Action::Start(first.clone()))
    }

    /// Records the outcome of the command returned by [`Session::observe`].
    ///
    /// The phase follows the intent, not the outcome: a failed start still
    /// counts as recording, so the recorder is not relaunched every poll and
    /// a stop is issued once the game exits. A failure is only carried in
    /// `last_error` until the next successful command.
    pub fn apply(&mut self, action: &Action, outcome: &RecorderOutcome) {
        self.last_error = (!outcome.is_success()).then(|| outcome.to_string());
        self.phase = match action {
            Action::Start(game) => Phase::Recording {
                game: game.clone(),
                since: Local::now(),
            },
            Action::Stop => Phase::Idle,
        };
    }

    /// The command needed to leave things clean on exit.
    pub fn shutdown_action(&self) -> Option<Action> {
        self.is_recording().then_some(Action::Stop)
    }

    /// Snapshot for the tray. `paused` overrides the reported state but the
    /// active game is still reported while paused.
    pub fn status(&self, paused: bool) -> Status {
        let (state, active_game, recording_since) = match &self.phase {
            Phase::Idle => (MonitorState::Idle, None, None),
            Phase::Delaying { .. } => (MonitorState::Delaying, None, None),
            Phase::Recording { game, since } => {
                (MonitorState::Recording, Some(game.clone()), Some(*since))
            }
        };
        Status {
            state: if paused { MonitorState::Paused } else { state },
            active_game,
            recording_since,
            last_error: self.last_error.clone(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_DELAY: Duration = Duration::ZERO;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    /// Feeds one poll and applies a successful outcome for any action.
    fn poll_ok(session: &mut Session, running: &[&str], delay: Duration, now: Instant) -> Option<Action> {
        let action = session.observe(&names(running), delay, now);
        if let Some(a) = &action {
            session.apply(a, &RecorderOutcome::Success);
        }
        action
    }

    // ── basic transitions ─────────────────────────────────────────────────────

    #[test]
    fn starts_idle() {
        let s = Session::new();
        assert!(!s.is_recording());
        assert_eq!(s.status(false).state, MonitorState::Idle);
    }

    #[test]
    fn nothing_running_stays_idle() {
        let mut s = Session::new();
        let t0 = Instant::now();
        for i in 0..5 {
            assert_eq!(poll_ok(&mut s, &[], NO_DELAY, t0 + secs(i)), None);
        }
        assert_eq!(s.status(false).state, MonitorState::Idle);
    }

    #[test]
    fn absent_present_absent_records_once() {
        let mut s = Session::new();
        let t0 = Instant::now();

        assert_eq!(poll_ok(&mut s, &[], NO_DELAY, t0), None);
        assert_eq!(
            poll_ok(&mut s, &["game.exe"], NO_DELAY, t0 + secs(2)),
            Some(Action::Start("game.exe".into()))
        );
        assert!(s.is_recording());
        assert_eq!(s.status(false).active_game.as_deref(), Some("game.exe"));

        assert_eq!(poll_ok(&mut s, &[], NO_DELAY, t0 + secs(4)), Some(Action::Stop));
        assert!(!s.is_recording());
        assert_eq!(s.status(false).active_game, None);
    }

    #[test]
    fn recording_continues_while_game_runs() {
        let mut s = Session::new();
        let t0 = Instant::now();
        poll_ok(&mut s, &["game.exe"], NO_DELAY, t0);
        for i in 1..5 {
            assert_eq!(poll_ok(&mut s, &["game.exe"], NO_DELAY, t0 + secs(i)), None);
        }
        assert!(s.is_recording());
    }

    #[test]
    fn first_match_becomes_active_game() {
        let mut s = Session::new();
        let action = poll_ok(&mut s, &["b.exe", "a.exe"], NO_DELAY, Instant::now());
        assert_eq!(action, Some(Action::Start("b.exe".into())));
    }

    #[test]
    fn switching_between_tracked_games_keeps_recording() {
        let mut s = Session::new();
        let t0 = Instant::now();
        poll_ok(&mut s, &["a.exe"], NO_DELAY, t0);
        assert_eq!(poll_ok(&mut s, &["b.exe"], NO_DELAY, t0 + secs(2)), None);
        assert_eq!(s.status(false).active_game.as_deref(), Some("a.exe"));
    }

    // ── start delay ───────────────────────────────────────────────────────────

    #[test]
    fn waits_out_start_delay() {
        let mut s = Session::new();
        let t0 = Instant::now();
        let delay = secs(5);

        assert_eq!(poll_ok(&mut s, &["game.exe"], delay, t0), None);
        assert_eq!(s.status(false).state, MonitorState::Delaying);
        assert_eq!(poll_ok(&mut s, &["game.exe"], delay, t0 + secs(2)), None);
        assert_eq!(poll_ok(&mut s, &["game.exe"], delay, t0 + secs(4)), None);
        assert_eq!(
            poll_ok(&mut s, &["game.exe"], delay, t0 + secs(6)),
            Some(Action::Start("game.exe".into()))
        );
    }

    #[test]
    fn game_leaving_during_delay_never_starts() {
        let mut s = Session::new();
        let t0 = Instant::now();
        let delay = secs(5);

        assert_eq!(poll_ok(&mut s, &["game.exe"], delay, t0), None);
        assert_eq!(poll_ok(&mut s, &["game.exe"], delay, t0 + secs(1)), None);
        assert_eq!(poll_ok(&mut s, &[], delay, t0 + secs(2)), None);
        assert_eq!(s.status(false).state, MonitorState::Idle);

        // The timer restarts from scratch when the game comes back.
        assert_eq!(poll_ok(&mut s, &["game.exe"], delay, t0 + secs(6)), None);
        assert_eq!(poll_ok(&mut s, &["game.exe"], delay, t0 + secs(8)), None);
        assert!(poll_ok(&mut s, &["game.exe"], delay, t0 + secs(11)).is_some());
    }

    // ── recorder outcomes ─────────────────────────────────────────────────────

    #[test]
    fn failed_start_is_not_retried_while_game_runs() {
        let mut s = Session::new();
        let t0 = Instant::now();

        let action = s.observe(&names(&["game.exe"]), NO_DELAY, t0).unwrap();
        s.apply(&action, &RecorderOutcome::Failed { code: Some(1) });
        assert!(s.is_recording());
        let status = s.status(false);
        assert_eq!(status.state, MonitorState::Recording);
        assert_eq!(status.active_game.as_deref(), Some("game.exe"));
        assert_eq!(status.last_error.as_deref(), Some("recorder exited with code 1"));

        for i in 1..10 {
            assert_eq!(s.observe(&names(&["game.exe"]), NO_DELAY, t0 + secs(2 * i)), None);
        }
        assert_eq!(s.status(false).last_error.as_deref(), Some("recorder exited with code 1"));
    }

    #[test]
    fn failed_start_still_stops_when_game_exits() {
        let mut s = Session::new();
        let t0 = Instant::now();

        let action = s.observe(&names(&["game.exe"]), NO_DELAY, t0).unwrap();
        s.apply(&action, &RecorderOutcome::LaunchFailed("missing".into()));

        let stop = s.observe(&[], NO_DELAY, t0 + secs(2));
        assert_eq!(stop, Some(Action::Stop));
        s.apply(&stop.unwrap(), &RecorderOutcome::Success);
        assert!(!s.is_recording());
        assert!(s.status(false).last_error.is_none());
    }

    #[test]
    fn failed_stop_still_returns_to_idle() {
        let mut s = Session::new();
        let t0 = Instant::now();
        poll_ok(&mut s, &["game.exe"], NO_DELAY, t0);

        let action = s.observe(&[], NO_DELAY, t0 + secs(2)).unwrap();
        s.apply(&action, &RecorderOutcome::TimedOut);
        assert!(!s.is_recording());
        assert_eq!(s.status(false).last_error.as_deref(), Some("recorder timed out"));
    }

    // ── status / shutdown ─────────────────────────────────────────────────────

    #[test]
    fn paused_status_keeps_active_game() {
        let mut s = Session::new();
        poll_ok(&mut s, &["game.exe"], NO_DELAY, Instant::now());
        let status = s.status(true);
        assert_eq!(status.state, MonitorState::Paused);
        assert_eq!(status.active_game.as_deref(), Some("game.exe"));
        assert!(status.recording_since.is_some());
    }

    #[test]
    fn shutdown_stops_only_when_recording() {
        let mut s = Session::new();
        assert_eq!(s.shutdown_action(), None);
        poll_ok(&mut s, &["game.exe"], NO_DELAY, Instant::now());
        assert_eq!(s.shutdown_action(), Some(Action::Stop));
    }
}
