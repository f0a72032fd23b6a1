/// Forced termination of the monitored process.
///
/// Termination is best effort: a failure is reported to the caller, which
/// logs it and carries on.
use std::io;

pub trait ProcessTerminator: Send + Sync {
    fn terminate(&self, pid: u32) -> Result<(), TerminateError>;
}

/// Kills processes through the host OS (`SIGKILL` / `TerminateProcess`).
#[derive(Debug, Default)]
pub struct OsTerminator;

impl OsTerminator {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessTerminator for OsTerminator {
    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> Result<(), TerminateError> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid).map_err(|_| TerminateError {
            pid,
            source: io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"),
        })?;
        kill(Pid::from_raw(raw), Signal::SIGKILL).map_err(|errno| TerminateError {
            pid,
            source: io::Error::from(errno),
        })?;
        tracing::info!(pid, "sent SIGKILL");
        Ok(())
    }

    #[cfg(windows)]
    fn terminate(&self, pid: u32) -> Result<(), TerminateError> {
        use winapi::shared::minwindef::FALSE;
        use winapi::um::handleapi::CloseHandle;
        use winapi::um::processthreadsapi::{OpenProcess, TerminateProcess};
        use winapi::um::winnt::PROCESS_TERMINATE;

        unsafe {
            let handle = OpenProcess(PROCESS_TERMINATE, FALSE, pid);
            if handle.is_null() {
                return Err(TerminateError {
                    pid,
                    source: io::Error::last_os_error(),
                });
            }
            let ok = TerminateProcess(handle, 1);
            let source = io::Error::last_os_error();
            CloseHandle(handle);
            if ok == FALSE {
                return Err(TerminateError { pid, source });
            }
        }
        tracing::info!(pid, "terminated process");
        Ok(())
    }
}

#[derive(Debug)]
pub struct TerminateError {
    pub pid: u32,
    pub source: io::Error,
}

impl std::fmt::Display for TerminateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to terminate pid {}: {}", self.pid, self.source)
    }
}

impl std::error::Error for TerminateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
