//! Watches the console of an external process and kills the process when a
//! known error line shows up on screen.
//!
//! Each monitoring cycle locates the target by executable name, copies its
//! console screen buffer, rebuilds the visible lines with width-aware
//! wrapping, and checks them for the error pattern. [`MonitorScheduler`]
//! decides when cycles run; the host reads [`MonitorResult`] and subscribes to
//! [`MonitorEvent`]s.

pub mod config;
pub mod console;
pub mod cycle;
pub mod host;
pub mod locator;
pub mod pattern;
pub mod reconstruct;
pub mod scheduler;
pub mod signals;
pub mod status;
pub mod terminate;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, MonitorConfig, WatcherConfig};
pub use console::{ConsoleError, ConsoleReader, ConsoleSnapshot, OsConsoleReader};
pub use cycle::{CycleOutcome, MonitorCycle, MonitorEvent, MonitorResult, NO_DATA};
pub use locator::{ProcessLocator, SystemLocator, TARGET_EXECUTABLE};
pub use pattern::ErrorPatternMatcher;
pub use reconstruct::{TextReconstructor, WidthRule};
pub use scheduler::{MonitorScheduler, TickOutcome};
pub use terminate::{OsTerminator, ProcessTerminator};
