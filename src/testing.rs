//! In-memory stand-ins for the OS-facing components.

use crate::console::{AttachFailure, ConsoleError, ConsoleReader, ConsoleSnapshot};
use crate::locator::ProcessLocator;
use crate::terminate::{ProcessTerminator, TerminateError};
use std::io;
use std::sync::mpsc;
use std::sync::Mutex;

pub struct FakeLocator {
    pub pids: Vec<u32>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeLocator {
    pub fn new(pids: Vec<u32>) -> Self {
        Self {
            pids,
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl ProcessLocator for FakeLocator {
    fn find(&self, executable: &str) -> Vec<u32> {
        self.queries.lock().unwrap().push(executable.to_string());
        self.pids.clone()
    }
}

/// Serves a fixed screen, or fails every read.
pub struct FakeReader {
    screen: Option<(String, usize, usize)>,
    gate: Option<Mutex<mpsc::Receiver<()>>>,
    pub reads: Mutex<Vec<u32>>,
}

impl FakeReader {
    /// A `width x height` console whose row-major contents are `text`.
    pub fn screen(text: &str, width: usize, height: usize) -> Self {
        Self {
            screen: Some((text.to_string(), width, height)),
            gate: None,
            reads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            screen: None,
            gate: None,
            reads: Mutex::new(Vec::new()),
        }
    }

    /// Block every read until the returned sender is signalled.
    pub fn gated(mut self) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        self.gate = Some(Mutex::new(rx));
        (self, tx)
    }
}

impl ConsoleReader for FakeReader {
    fn read(&self, pid: u32) -> Result<ConsoleSnapshot, ConsoleError> {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv();
        }
        self.reads.lock().unwrap().push(pid);

        match &self.screen {
            Some((text, width, height)) => {
                let units: Vec<u16> = text.encode_utf16().collect();
                Ok(ConsoleSnapshot::from_utf16(pid, &units, *width, *height))
            }
            None => Err(ConsoleError::Attach {
                pid,
                reason: AttachFailure::AccessDenied,
                source: io::Error::new(io::ErrorKind::PermissionDenied, "fake attach failure"),
            }),
        }
    }
}

pub struct FakeTerminator {
    fail: bool,
    gate: Option<Mutex<mpsc::Receiver<()>>>,
    pub killed: Mutex<Vec<u32>>,
}

impl FakeTerminator {
    pub fn new() -> Self {
        Self {
            fail: false,
            gate: None,
            killed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            gate: None,
            killed: Mutex::new(Vec::new()),
        }
    }

    /// Block every kill until the returned sender is signalled.
    pub fn gated(mut self) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        self.gate = Some(Mutex::new(rx));
        (self, tx)
    }
}

impl ProcessTerminator for FakeTerminator {
    fn terminate(&self, pid: u32) -> Result<(), TerminateError> {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv();
        }
        self.killed.lock().unwrap().push(pid);
        if self.fail {
            return Err(TerminateError {
                pid,
                source: io::Error::new(io::ErrorKind::PermissionDenied, "fake kill failure"),
            });
        }
        Ok(())
    }
}
