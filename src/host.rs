/// Host loop: drives the scheduler at a fixed tick rate, mirrors the
/// watcher's state into the status file, and reacts to signals.
use crate::config::{ConfigError, MonitorConfig, WatcherConfig};
use crate::cycle::{MonitorCycle, MonitorEvent};
use crate::scheduler::MonitorScheduler;
use crate::signals::{SignalAction, SignalHandler};
use crate::status::{StatusData, StatusFile, WatcherState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;

/// Run until a shutdown is requested. `reload` supplies fresh monitor
/// settings whenever a reload is signalled.
pub async fn run<F>(
    config: &WatcherConfig,
    cycle: Arc<MonitorCycle>,
    mut signals: SignalHandler,
    reload: F,
) -> Result<(), ConfigError>
where
    F: Fn() -> Result<MonitorConfig, ConfigError>,
{
    let mut scheduler = MonitorScheduler::new(config.monitor, cycle)?;
    let mut events = scheduler.subscribe();
    let status = StatusFile::new(config.host.status_file.clone());

    let mut ticker = tokio::time::interval(Duration::from_millis(config.host.tick_millis));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut state = WatcherState::Starting;
    write_status(&status, &scheduler, state);
    tracing::info!(
        enabled = config.monitor.enabled,
        interval_secs = config.monitor.interval_secs,
        status_file = %status.path().display(),
        "watcher running"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                scheduler.tick(Instant::now());
                // Error and failure states stick until the next cycle starts.
                let settled = matches!(state, WatcherState::Starting | WatcherState::Watching);
                if settled && !scheduler.is_busy() {
                    state = WatcherState::Idle;
                    write_status(&status, &scheduler, state);
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    log_event(&event);
                    state = WatcherState::after(&event);
                    write_status(&status, &scheduler, state);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "missed monitor events");
                }
                Err(RecvError::Closed) => break,
            },
            action = signals.recv() => match action {
                SignalAction::Shutdown => break,
                SignalAction::Reload => match reload() {
                    Ok(monitor) => {
                        if let Err(e) = scheduler.apply(monitor) {
                            tracing::error!(error = %e, "rejected reloaded config");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "failed to reload config"),
                },
            },
        }
    }

    write_status(&status, &scheduler, WatcherState::ShuttingDown);
    if let Some(outcome) = scheduler.wait_idle().await {
        tracing::info!(?outcome, "last cycle finished");
    }
    status.remove();
    tracing::info!(cycles = scheduler.cycles_started(), "watcher stopped");
    Ok(())
}

fn write_status(status: &StatusFile, scheduler: &MonitorScheduler, state: WatcherState) {
    status.update(&StatusData::new(
        state,
        scheduler.config(),
        scheduler.cycles_started(),
        scheduler.results(),
    ));
}

fn log_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::CycleStarted => tracing::debug!("watch"),
        MonitorEvent::ErrorDetected { pid, at } => {
            tracing::warn!(pid, at = %at, "target killed after console error")
        }
        MonitorEvent::CycleFailed { message } => {
            tracing::warn!(error = %message, "watch cycle failed")
        }
    }
}
