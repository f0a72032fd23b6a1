/// Process lookup by executable name.
use std::ffi::OsStr;
use sysinfo::{ProcessesToUpdate, System};

/// Executable base name of the monitored process. Not configurable.
pub const TARGET_EXECUTABLE: &str = "YouTubeStreamReceiver";

/// Resolves running processes by executable base name.
pub trait ProcessLocator: Send + Sync {
    /// Pids of every process named `executable`, lowest pid first.
    /// No match is an empty result, not an error.
    fn find(&self, executable: &str) -> Vec<u32>;
}

/// Compare a process name against the wanted executable base name.
///
/// On Windows names are case-insensitive and carry an `.exe` suffix that the
/// caller does not spell out. Elsewhere the comparison is exact.
pub fn matches_executable_name(process_name: &str, executable: &str) -> bool {
    if cfg!(windows) {
        let base = strip_exe_suffix(process_name);
        base.eq_ignore_ascii_case(strip_exe_suffix(executable))
    } else {
        process_name == executable
    }
}

fn strip_exe_suffix(name: &str) -> &str {
    let len = name.len();
    if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".exe") {
        &name[..len - 4]
    } else {
        name
    }
}

/// Locator backed by the OS process table.
#[derive(Debug, Default)]
pub struct SystemLocator;

impl SystemLocator {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLocator for SystemLocator {
    fn find(&self, executable: &str) -> Vec<u32> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let mut pids: Vec<u32> = system
            .processes()
            .values()
            .filter(|p| name_matches(p.name(), executable))
            .map(|p| p.pid().as_u32())
            .collect();
        pids.sort_unstable();

        tracing::debug!(executable, matches = pids.len(), "process lookup");
        pids
    }
}

fn name_matches(name: &OsStr, executable: &str) -> bool {
    name.to_str()
        .is_some_and(|n| matches_executable_name(n, executable))
}
