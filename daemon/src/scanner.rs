use std::collections::HashSet;
use sysinfo::{ProcessesToUpdate, System};

/// Source of running process names.
pub trait ProcessTable {
    /// Names of all running processes, ordered by ascending PID.
    fn process_names(&mut self) -> Vec<String>;
}

/// [`ProcessTable`] backed by the OS via `sysinfo`.
pub struct SystemProcessTable {
    sys: System,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProcessTable {
    fn process_names(&mut self) -> Vec<String> {
        self.sys.refresh_processes(ProcessesToUpdate::All, true);

        let mut procs: Vec<_> = self.sys.processes().iter().collect();
        procs.sort_by_key(|(pid, _)| **pid);
        procs
            .into_iter()
            .map(|(_, p)| p.name().to_string_lossy().into_owned())
            .collect()
    }
}

/// Returns every running process name that is one of `games`, in process
/// order. Matching is exact and case-sensitive; a game running as several
/// processes appears once per process.
pub fn running_games(process_names: &[String], games: &[String]) -> Vec<String> {
    if games.is_empty() {
        return Vec::new();
    }
    let tracked: HashSet<&str> = games.iter().map(String::as_str).collect();
    process_names
        .iter()
        .filter(|name| tracked.contains(name.as_str()))
        .cloned()
        .collect()
}
