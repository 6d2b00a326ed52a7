use chrono::{DateTime, Local};

/// What the monitor is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No tracked game is running.
    Idle,
    /// A tracked game is running; waiting out the start delay.
    Delaying,
    /// The recorder was told to start and has not been told to stop.
    Recording,
    /// Automation is disabled from the tray; no transitions happen.
    Paused,
}

/// Colour of the tray glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconColor {
    Red,
    Green,
    Orange,
}

/// Immutable snapshot published by the monitor and rendered by the tray.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub state: MonitorState,
    /// Executable name of the game being recorded.
    pub active_game: Option<String>,
    /// Local time at which the current recording was started.
    pub recording_since: Option<DateTime<Local>>,
    /// Message of the last failed recorder command, cleared on the next success.
    pub last_error: Option<String>,
}

impl Status {
    /// The status on startup, before the first poll.
    pub fn new() -> Self {
        Self {
            state: MonitorState::Idle,
            active_game: None,
            recording_since: None,
            last_error: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active_game.is_some()
    }

    /// Icon colour, with `paused` taking priority over the recording state.
    /// The tray passes its own pause flag so a toggle shows up immediately.
    pub fn icon_color(&self, paused: bool) -> IconColor {
        if paused {
            IconColor::Orange
        } else if self.is_recording() {
            IconColor::Green
        } else {
            IconColor::Red
        }
    }

    pub fn tooltip(&self, paused: bool) -> String {
        let base = if paused {
            "Paused".to_string()
        } else {
            match (&self.active_game, self.recording_since) {
                (Some(game), Some(since)) => {
                    format!("Recording {game} (since {})", since.format("%H:%M"))
                }
                (Some(game), None) => format!("Recording {game}"),
                (None, _) => "Idle".to_string(),
            }
        };
        match &self.last_error {
            Some(err) => format!("{base} - {err}"),
            None => base,
        }
    }

    /// Text of the non-clickable status line at the top of the tray menu.
    pub fn menu_label(&self) -> String {
        match &self.active_game {
            Some(game) => format!("Recording: {game}"),
            None => "Idle".to_string(),
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}
