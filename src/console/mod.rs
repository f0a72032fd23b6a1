//! Raw console screen buffer acquisition.
//!
//! A reader attaches to another process's console, copies the full character
//! grid, and detaches again. Only Windows exposes a console screen buffer; on
//! other platforms [`OsConsoleReader`] always fails with
//! [`ConsoleError::Unsupported`].

#[cfg(windows)]
mod windows;

use std::io;

/// Full character grid of one console, owned by a single monitoring cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleSnapshot {
    pub pid: u32,
    /// Row-major cells, at most `width * height` of them.
    pub cells: Vec<char>,
    pub width: usize,
    pub height: usize,
}

impl ConsoleSnapshot {
    /// Build a snapshot from the UTF-16 units the console hands back.
    /// Unpaired surrogates become U+FFFD.
    pub fn from_utf16(pid: u32, units: &[u16], width: usize, height: usize) -> Self {
        let cells = char::decode_utf16(units.iter().copied())
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        Self {
            pid,
            cells,
            width,
            height,
        }
    }
}

/// Reads a console screen buffer out of another process.
///
/// Implementations hold the process-wide console slot for the whole call and
/// release it on every exit path.
pub trait ConsoleReader: Send + Sync {
    fn read(&self, pid: u32) -> Result<ConsoleSnapshot, ConsoleError>;
}

/// Why attaching to a console failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachFailure {
    AccessDenied,
    NoSuchProcess,
    NoConsole,
    Other,
}

impl std::fmt::Display for AttachFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AttachFailure::AccessDenied => "access denied",
            AttachFailure::NoSuchProcess => "no such process",
            AttachFailure::NoConsole => "process has no console",
            AttachFailure::Other => "attach failed",
        };
        f.write_str(s)
    }
}

/// Errors from reading a console. All of them abort the current cycle.
#[derive(Debug)]
pub enum ConsoleError {
    Attach {
        pid: u32,
        reason: AttachFailure,
        source: io::Error,
    },
    /// The output handle or the buffer geometry could not be obtained.
    Query { pid: u32, source: io::Error },
    Read { pid: u32, source: io::Error },
    Unsupported,
}

impl std::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsoleError::Attach {
                pid,
                reason,
                source,
            } => write!(f, "failed to attach to console of pid {pid} ({reason}): {source}"),
            ConsoleError::Query { pid, source } => {
                write!(f, "failed to query console buffer of pid {pid}: {source}")
            }
            ConsoleError::Read { pid, source } => {
                write!(f, "failed to read console buffer of pid {pid}: {source}")
            }
            ConsoleError::Unsupported => {
                write!(f, "console screen buffers are not available on this platform")
            }
        }
    }
}

impl std::error::Error for ConsoleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConsoleError::Attach { source, .. } => Some(source),
            ConsoleError::Query { source, .. } => Some(source),
            ConsoleError::Read { source, .. } => Some(source),
            ConsoleError::Unsupported => None,
        }
    }
}

/// Reader for the host operating system's consoles.
#[derive(Debug, Default)]
pub struct OsConsoleReader;

impl OsConsoleReader {
    pub fn new() -> Self {
        Self
    }
}

impl ConsoleReader for OsConsoleReader {
    #[cfg(windows)]
    fn read(&self, pid: u32) -> Result<ConsoleSnapshot, ConsoleError> {
        windows::read_console(pid)
    }

    #[cfg(not(windows))]
    fn read(&self, pid: u32) -> Result<ConsoleSnapshot, ConsoleError> {
        tracing::debug!(pid, "console read requested on a platform without consoles");
        Err(ConsoleError::Unsupported)
    }
}
