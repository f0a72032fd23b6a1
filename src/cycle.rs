/// One monitoring cycle: locate the target, read its console, reconstruct the
/// visible text, and kill the process if the error line is on screen.
///
/// The cycle also owns the state exposed to the host (`MonitorResult`) and the
/// notification channel. Blocking OS work runs on tokio's blocking pool so the
/// ticking thread is never stalled.
use crate::console::{ConsoleError, ConsoleReader, ConsoleSnapshot, OsConsoleReader};
use crate::locator::{ProcessLocator, SystemLocator, TARGET_EXECUTABLE};
use crate::pattern::ErrorPatternMatcher;
use crate::reconstruct::{TextReconstructor, WidthRule};
use crate::terminate::{OsTerminator, ProcessTerminator};
use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Shown in place of console text when no target process was found.
pub const NO_DATA: &str = "no data";

/// Local-time format of `last_error_time`.
pub const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

const EVENT_CAPACITY: usize = 64;

/// State persisted across cycles and readable by the host at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorResult {
    /// Text of the last successful read. `None` after a cycle that found no target.
    pub last_console_text: Option<String>,
    /// When the error was last detected. Never cleared by a clean cycle.
    pub last_error_time: Option<String>,
}

impl MonitorResult {
    pub fn console_text(&self) -> &str {
        self.last_console_text.as_deref().unwrap_or(NO_DATA)
    }
}

/// Edge-triggered notifications, in per-cycle order:
/// `CycleStarted`, then at most one of `ErrorDetected` / `CycleFailed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    CycleStarted,
    ErrorDetected { pid: u32, at: String },
    CycleFailed { message: String },
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    NoTarget,
    Clean { pid: u32 },
    ErrorDetected { pid: u32, terminated: bool },
    Failed,
}

pub struct MonitorCycle {
    locator: Arc<dyn ProcessLocator>,
    reader: Arc<dyn ConsoleReader>,
    terminator: Arc<dyn ProcessTerminator>,
    reconstructor: TextReconstructor,
    matcher: ErrorPatternMatcher,
    results: watch::Sender<MonitorResult>,
    events: broadcast::Sender<MonitorEvent>,
}

impl MonitorCycle {
    pub fn new(
        locator: Arc<dyn ProcessLocator>,
        reader: Arc<dyn ConsoleReader>,
        terminator: Arc<dyn ProcessTerminator>,
        reconstructor: TextReconstructor,
    ) -> Self {
        let (results, _) = watch::channel(MonitorResult::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            locator,
            reader,
            terminator,
            reconstructor,
            matcher: ErrorPatternMatcher::new(),
            results,
            events,
        }
    }

    /// A cycle wired to the real process table, console, and kill.
    pub fn system(rule: WidthRule) -> Self {
        Self::new(
            Arc::new(SystemLocator::new()),
            Arc::new(OsConsoleReader::new()),
            Arc::new(OsTerminator::new()),
            TextReconstructor::new(rule),
        )
    }

    /// Snapshot of the host-visible state.
    pub fn results(&self) -> MonitorResult {
        self.results.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: MonitorEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Run one cycle to completion. Failures are logged and reported as
    /// `CycleFailed`; they never propagate.
    pub async fn run(&self) -> CycleOutcome {
        self.emit(MonitorEvent::CycleStarted);

        let locator = Arc::clone(&self.locator);
        let reader = Arc::clone(&self.reader);
        let acquired = tokio::task::spawn_blocking(move || acquire(&*locator, &*reader)).await;

        let snapshot = match acquired {
            Ok(Ok(Some(snapshot))) => snapshot,
            Ok(Ok(None)) => {
                tracing::debug!(executable = TARGET_EXECUTABLE, "target process not running");
                self.results.send_modify(|r| r.last_console_text = None);
                return CycleOutcome::NoTarget;
            }
            Ok(Err(e)) => return self.fail(e.to_string()),
            Err(e) => return self.fail(format!("console read task failed: {e}")),
        };

        let pid = snapshot.pid;
        let lines = self
            .reconstructor
            .reconstruct(&snapshot.cells, snapshot.width, snapshot.height);
        tracing::debug!(pid, lines = lines.len(), "reconstructed console text");
        let text = lines.join("\n");
        let matched = self.matcher.matches(&text);
        self.results.send_modify(|r| r.last_console_text = Some(text));

        if !matched {
            return CycleOutcome::Clean { pid };
        }

        let at = Local::now().format(TIME_FORMAT).to_string();
        self.results.send_modify(|r| r.last_error_time = Some(at.clone()));
        tracing::warn!(pid, at = %at, "error detected on target console, terminating");
        self.emit(MonitorEvent::ErrorDetected { pid, at });

        let terminator = Arc::clone(&self.terminator);
        let terminated = match tokio::task::spawn_blocking(move || terminator.terminate(pid)).await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "failed to terminate target process");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "terminate task failed");
                false
            }
        };

        CycleOutcome::ErrorDetected { pid, terminated }
    }

    fn fail(&self, message: String) -> CycleOutcome {
        tracing::error!(error = %message, "monitoring cycle failed");
        self.emit(MonitorEvent::CycleFailed { message });
        CycleOutcome::Failed
    }
}

/// Locate the target and read the console of the first (lowest pid) match.
fn acquire(
    locator: &dyn ProcessLocator,
    reader: &dyn ConsoleReader,
) -> Result<Option<ConsoleSnapshot>, ConsoleError> {
    let pids = locator.find(TARGET_EXECUTABLE);
    let Some(&pid) = pids.first() else {
        return Ok(None);
    };
    if pids.len() > 1 {
        tracing::debug!(pid, candidates = pids.len(), "multiple targets, watching the first");
    }
    reader.read(pid).map(Some)
}
