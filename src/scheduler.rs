/// Periodic driver for monitoring cycles.
///
/// The host calls [`MonitorScheduler::tick`] at its own (fast) cadence. The
/// first tick after arming only records the deadline; every tick at or past the
/// deadline re-arms and starts a cycle on the tokio runtime, unless the
/// previous cycle is still running, in which case that slot is skipped.
use crate::config::{validate_interval, ConfigError, MonitorConfig};
use crate::cycle::{CycleOutcome, MonitorCycle, MonitorEvent, MonitorResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Monitoring is switched off.
    Disabled,
    /// No deadline was set; one was recorded and nothing ran.
    Armed,
    /// Not due yet.
    Waiting,
    /// A cycle was started.
    Started,
    /// Due, but the previous cycle is still in flight.
    SkippedBusy,
}

pub struct MonitorScheduler {
    config: MonitorConfig,
    next_due: Option<Instant>,
    cycle: Arc<MonitorCycle>,
    in_flight: Option<JoinHandle<CycleOutcome>>,
    cycles_started: u64,
}

impl MonitorScheduler {
    pub fn new(config: MonitorConfig, cycle: Arc<MonitorCycle>) -> Result<Self, ConfigError> {
        validate_interval(config.interval_secs)?;
        Ok(Self {
            config,
            next_due: None,
            cycle,
            in_flight: None,
            cycles_started: 0,
        })
    }

    pub fn config(&self) -> MonitorConfig {
        self.config
    }

    /// Deadline of the next cycle, `None` while disarmed.
    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn cycles_started(&self) -> u64 {
        self.cycles_started
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
        self.disarm();
    }

    /// Change the interval. Zero or more than a day is rejected and leaves the
    /// schedule untouched.
    pub fn set_interval(&mut self, interval_secs: u64) -> Result<(), ConfigError> {
        validate_interval(interval_secs)?;
        self.config.interval_secs = interval_secs;
        self.disarm();
        Ok(())
    }

    /// Replace the whole monitor config, e.g. after a reload.
    pub fn apply(&mut self, config: MonitorConfig) -> Result<(), ConfigError> {
        validate_interval(config.interval_secs)?;
        if config != self.config {
            tracing::info!(
                enabled = config.enabled,
                interval_secs = config.interval_secs,
                "monitor config changed"
            );
        }
        self.config = config;
        self.disarm();
        Ok(())
    }

    fn disarm(&mut self) {
        self.next_due = None;
    }

    /// True while a started cycle has not finished.
    pub fn is_busy(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Advance the schedule to `now`. Must be called from within a tokio runtime.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.config.enabled {
            return TickOutcome::Disabled;
        }

        let interval = Duration::from_secs(self.config.interval_secs);
        let Some(next) = now.checked_add(interval) else {
            tracing::error!(
                interval_secs = self.config.interval_secs,
                "interval overflows the clock, not scheduling"
            );
            return TickOutcome::Waiting;
        };

        match self.next_due {
            None => {
                self.next_due = Some(next);
                TickOutcome::Armed
            }
            Some(due) if now < due => TickOutcome::Waiting,
            Some(_) => {
                self.next_due = Some(next);

                if self.is_busy() {
                    tracing::warn!("previous monitoring cycle still running, skipping");
                    return TickOutcome::SkippedBusy;
                }

                let cycle = Arc::clone(&self.cycle);
                self.in_flight = Some(tokio::spawn(async move { cycle.run().await }));
                self.cycles_started += 1;
                tracing::debug!(cycle = self.cycles_started, "monitoring cycle started");
                TickOutcome::Started
            }
        }
    }

    /// Wait for the in-flight cycle, if any, and return how it ended.
    pub async fn wait_idle(&mut self) -> Option<CycleOutcome> {
        let handle = self.in_flight.take()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(error = %e, "monitoring cycle task failed");
                None
            }
        }
    }

    pub fn results(&self) -> MonitorResult {
        self.cycle.results()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.cycle.subscribe()
    }
}
