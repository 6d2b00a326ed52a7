/// Canonical file locations for AutoRecord.
///
/// Everything lives next to the running executable (the "base directory"):
///   - config.json      Tracked games and polling settings.
///   - autorecord.log   Log output of the tray process.
///   - obs-cmd(.exe)    Recorder command invoked to start/stop recording.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = "autorecord.log";
const RECORDER_STEM: &str = "obs-cmd";

/// File name of the recorder command for the current platform.
pub fn recorder_file_name() -> String {
    format!("{RECORDER_STEM}{}", std::env::consts::EXE_SUFFIX)
}

/// Resolved locations rooted at the base directory.
#[derive(Debug, Clone)]
pub struct AppPaths {
    base: PathBuf,
}

impl AppPaths {
    /// Resolves the base directory from the running executable.
    ///
    /// Symlinks are followed so a linked launcher still finds the files next
    /// to the real binary.
    pub fn resolve() -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate the running executable")?;
        let exe = exe.canonicalize().unwrap_or(exe);
        let base = exe
            .parent()
            .with_context(|| format!("Executable has no parent directory: {}", exe.display()))?
            .to_path_buf();
        Ok(Self::with_base(base))
    }

    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join(CONFIG_FILE_NAME)
    }

    pub fn recorder_command(&self) -> PathBuf {
        self.base.join(recorder_file_name())
    }

    pub fn log_dir(&self) -> &Path {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_uses_executable_directory() {
        let paths = AppPaths::resolve().unwrap();
        let exe = std::env::current_exe().unwrap().canonicalize().unwrap();
        assert_eq!(paths.base_dir(), exe.parent().unwrap());
    }

    #[test]
    fn config_file_has_correct_name() {
        let paths = AppPaths::with_base("/opt/autorecord");
        assert_eq!(paths.config_file().file_name().unwrap(), CONFIG_FILE_NAME);
    }

    #[test]
    fn recorder_and_config_share_base_dir() {
        let paths = AppPaths::with_base("/opt/autorecord");
        assert_eq!(paths.config_file().parent(), paths.recorder_command().parent());
        assert_eq!(paths.log_dir(), paths.base_dir());
    }

    #[cfg(windows)]
    #[test]
    fn recorder_file_name_has_exe_suffix_on_windows() {
        assert_eq!(recorder_file_name(), "obs-cmd.exe");
    }

    #[cfg(not(windows))]
    #[test]
    fn recorder_file_name_is_bare_elsewhere() {
        assert_eq!(recorder_file_name(), "obs-cmd");
    }
}
