//! Win32 console attachment.
//!
//! A process owns at most one console, so attaching to someone else's means
//! giving up our own for the duration. [`ConsoleAttachment`] holds the
//! process-wide slot, and dropping it frees the borrowed console and
//! reattaches to the parent's.

use super::{AttachFailure, ConsoleError, ConsoleSnapshot};
use std::io;
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use winapi::shared::minwindef::{DWORD, FALSE};
use winapi::shared::winerror::{
    ERROR_ACCESS_DENIED, ERROR_GEN_FAILURE, ERROR_INVALID_HANDLE, ERROR_INVALID_PARAMETER,
};
use winapi::um::fileapi::{CreateFileW, OPEN_EXISTING};
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::wincon::{
    AttachConsole, FreeConsole, GetConsoleScreenBufferInfo, ReadConsoleOutputCharacterW,
    ATTACH_PARENT_PROCESS, CONSOLE_SCREEN_BUFFER_INFO,
};
use winapi::um::wincontypes::COORD;
use winapi::um::winnt::{FILE_SHARE_READ, FILE_SHARE_WRITE, GENERIC_READ, GENERIC_WRITE, HANDLE};

static CONSOLE_SLOT: Mutex<()> = Mutex::new(());

/// Exclusive attachment to a foreign console.
struct ConsoleAttachment {
    _slot: MutexGuard<'static, ()>,
}

impl ConsoleAttachment {
    fn attach(pid: u32) -> Result<Self, ConsoleError> {
        let slot = CONSOLE_SLOT.lock().unwrap_or_else(PoisonError::into_inner);
        // Constructed before attaching so a failed attach still restores our console.
        let attachment = Self { _slot: slot };

        unsafe {
            FreeConsole();
            if AttachConsole(pid) == FALSE {
                let source = io::Error::last_os_error();
                return Err(ConsoleError::Attach {
                    pid,
                    reason: classify_attach_error(&source),
                    source,
                });
            }
        }

        tracing::debug!(pid, "attached to console");
        Ok(attachment)
    }
}

impl Drop for ConsoleAttachment {
    fn drop(&mut self) {
        unsafe {
            FreeConsole();
            AttachConsole(ATTACH_PARENT_PROCESS);
        }
    }
}

fn classify_attach_error(err: &io::Error) -> AttachFailure {
    match err.raw_os_error().map(|code| code as DWORD) {
        Some(ERROR_ACCESS_DENIED) => AttachFailure::AccessDenied,
        Some(ERROR_INVALID_PARAMETER) => AttachFailure::NoSuchProcess,
        Some(ERROR_INVALID_HANDLE) | Some(ERROR_GEN_FAILURE) => AttachFailure::NoConsole,
        _ => AttachFailure::Other,
    }
}

/// `CONOUT$` of the currently attached console.
struct ScreenBuffer(HANDLE);

impl ScreenBuffer {
    fn open(_attachment: &ConsoleAttachment, pid: u32) -> Result<Self, ConsoleError> {
        let name: Vec<u16> = "CONOUT$\0".encode_utf16().collect();
        let handle = unsafe {
            CreateFileW(
                name.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                ptr::null_mut(),
                OPEN_EXISTING,
                0,
                ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(ConsoleError::Query {
                pid,
                source: io::Error::last_os_error(),
            });
        }
        Ok(Self(handle))
    }

    fn geometry(&self, pid: u32) -> Result<(usize, usize), ConsoleError> {
        let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
        if unsafe { GetConsoleScreenBufferInfo(self.0, &mut info) } == FALSE {
            return Err(ConsoleError::Query {
                pid,
                source: io::Error::last_os_error(),
            });
        }

        let width = usize::try_from(info.dwSize.X).unwrap_or(0);
        let height = usize::try_from(info.dwSize.Y).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(ConsoleError::Query {
                pid,
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("empty screen buffer ({width}x{height})"),
                ),
            });
        }
        Ok((width, height))
    }

    fn read_cells(&self, pid: u32, len: usize) -> Result<Vec<u16>, ConsoleError> {
        let wanted = DWORD::try_from(len).map_err(|_| ConsoleError::Read {
            pid,
            source: io::Error::new(io::ErrorKind::InvalidInput, "screen buffer too large"),
        })?;

        let mut buffer = vec![0u16; len];
        let mut read: DWORD = 0;
        let origin = COORD { X: 0, Y: 0 };
        let ok = unsafe {
            ReadConsoleOutputCharacterW(self.0, buffer.as_mut_ptr(), wanted, origin, &mut read)
        };
        if ok == FALSE {
            return Err(ConsoleError::Read {
                pid,
                source: io::Error::last_os_error(),
            });
        }

        buffer.truncate(read as usize);
        Ok(buffer)
    }
}

impl Drop for ScreenBuffer {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

/// Attach to `pid`'s console, copy its whole screen buffer, and detach.
pub(super) fn read_console(pid: u32) -> Result<ConsoleSnapshot, ConsoleError> {
    let attachment = ConsoleAttachment::attach(pid)?;
    let screen = ScreenBuffer::open(&attachment, pid)?;

    let (width, height) = screen.geometry(pid)?;
    let units = screen.read_cells(pid, width * height)?;
    tracing::debug!(pid, width, height, cells = units.len(), "read console buffer");

    // Close the handle before the console it belongs to goes away.
    drop(screen);
    drop(attachment);

    Ok(ConsoleSnapshot::from_utf16(pid, &units, width, height))
}
