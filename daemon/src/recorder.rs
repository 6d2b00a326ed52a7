/// Control of the external recorder command (`obs-cmd recording start|stop`).
///
/// The command is launched with its output discarded and awaited for a
/// bounded time so the monitor can react to the outcome.
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// How long a single recorder invocation may run before it is killed.
pub const RECORDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderCommand {
    Start,
    Stop,
}

impl RecorderCommand {
    pub fn args(self) -> [&'static str; 2] {
        match self {
            RecorderCommand::Start => ["recording", "start"],
            RecorderCommand::Stop => ["recording", "stop"],
        }
    }
}

/// Result of one recorder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderOutcome {
    Success,
    /// The command ran but exited unsuccessfully. `None` if killed by a signal.
    Failed { code: Option<i32> },
    TimedOut,
    /// The command could not be spawned at all.
    LaunchFailed(String),
}

impl RecorderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RecorderOutcome::Success)
    }
}

impl fmt::Display for RecorderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderOutcome::Success => write!(f, "recorder succeeded"),
            RecorderOutcome::Failed { code: Some(code) } => {
                write!(f, "recorder exited with code {code}")
            }
            RecorderOutcome::Failed { code: None } => write!(f, "recorder was terminated"),
            RecorderOutcome::TimedOut => write!(f, "recorder timed out"),
            RecorderOutcome::LaunchFailed(reason) => write!(f, "recorder failed to launch: {reason}"),
        }
    }
}

/// Something that can start and stop recording.
pub trait Recorder {
    fn invoke(&self, command: RecorderCommand) -> impl Future<Output = RecorderOutcome> + Send;
}

/// [`Recorder`] that runs an external program.
#[derive(Debug, Clone)]
pub struct CommandRecorder {
    program: PathBuf,
    timeout: Duration,
}

impl CommandRecorder {
    /// `timeout` bounds each invocation; see [`RECORDER_TIMEOUT`].
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }
}

impl Recorder for CommandRecorder {
    async fn invoke(&self, command: RecorderCommand) -> RecorderOutcome {
        let mut cmd = Command::new(&self.program);
        cmd.args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return RecorderOutcome::LaunchFailed(format!("{}: {e}", self.program.display()))
            }
        };

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => RecorderOutcome::Success,
            Ok(Ok(status)) => RecorderOutcome::Failed {
                code: status.code(),
            },
            Ok(Err(e)) => RecorderOutcome::LaunchFailed(e.to_string()),
            Err(_) => {
                let _ = child.kill().await;
                RecorderOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_map_to_recording_args() {
        assert_eq!(RecorderCommand::Start.args(), ["recording", "start"]);
        assert_eq!(RecorderCommand::Stop.args(), ["recording", "stop"]);
    }

    #[test]
    fn outcome_display_is_human_readable() {
        assert_eq!(
            RecorderOutcome::Failed { code: Some(2) }.to_string(),
            "recorder exited with code 2"
        );
        assert_eq!(RecorderOutcome::TimedOut.to_string(), "recorder timed out");
    }

    #[tokio::test]
    async fn missing_program_reports_launch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = CommandRecorder::new(dir.path().join("does-not-exist"), RECORDER_TIMEOUT);
        let outcome = recorder.invoke(RecorderCommand::Start).await;
        assert!(matches!(outcome, RecorderOutcome::LaunchFailed(_)));
    }

    #[cfg(unix)]
    fn script(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("obs-cmd");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_is_success_and_args_are_passed() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("args.txt");
        let program = script(dir.path(), &format!("echo \"$@\" > '{}'", log.display()));

        let outcome = CommandRecorder::new(program, RECORDER_TIMEOUT)
            .invoke(RecorderCommand::Stop)
            .await;
        assert_eq!(outcome, RecorderOutcome::Success);
        assert_eq!(std::fs::read_to_string(&log).unwrap().trim(), "recording stop");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_reports_code() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "exit 3");
        let outcome = CommandRecorder::new(program, RECORDER_TIMEOUT)
            .invoke(RecorderCommand::Start)
            .await;
        assert_eq!(outcome, RecorderOutcome::Failed { code: Some(3) });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_recorder_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "sleep 30");
        let outcome = CommandRecorder::new(program, Duration::from_millis(200))
            .invoke(RecorderCommand::Start)
            .await;
        assert_eq!(outcome, RecorderOutcome::TimedOut);
    }
}
