use clap::Parser;
use console_watcher::config::{MonitorConfig, WatcherConfig};
use console_watcher::cycle::{CycleOutcome, MonitorCycle};
use console_watcher::reconstruct::WidthRule;
use console_watcher::signals::SignalHandler;
use console_watcher::{host, ConfigError, TARGET_EXECUTABLE};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Watches the console of an external process and kills it when
/// `Error: undefined` appears at the start of a line.
#[derive(Parser, Debug)]
#[command(name = "console-watcher", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "watcher.toml")]
    config: PathBuf,

    /// Enable monitoring (overrides config)
    #[arg(long)]
    enable: bool,

    /// Seconds between monitoring cycles (overrides config)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Status file path (overrides config)
    #[arg(long)]
    status_file: Option<PathBuf>,

    /// Run a single cycle, print the result, and exit
    #[arg(long)]
    once: bool,

    /// Validate config and print resolved settings, don't run
    #[arg(long)]
    dry_run: bool,

    /// Extra logging (every cycle, process lookups)
    #[arg(short, long)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn apply_monitor_overrides(&self, monitor: &mut MonitorConfig) {
        if self.enable {
            monitor.enabled = true;
        }
        if let Some(interval) = self.interval {
            monitor.interval_secs = interval;
        }
    }

    fn resolve_config(&self) -> Result<WatcherConfig, ConfigError> {
        let mut config = WatcherConfig::load(&self.config)?;
        self.apply_monitor_overrides(&mut config.monitor);
        if let Some(path) = &self.status_file {
            config.host.status_file = path.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

fn reload_monitor(cli: &Cli, path: &Path) -> Result<MonitorConfig, ConfigError> {
    let config = WatcherConfig::load(path)?;
    let mut monitor = config.monitor;
    cli.apply_monitor_overrides(&mut monitor);
    Ok(monitor)
}

async fn run_once(cycle: &MonitorCycle) -> ExitCode {
    let outcome = cycle.run().await;
    let results = cycle.results();

    println!("target:          {TARGET_EXECUTABLE}");
    println!("outcome:         {outcome:?}");
    println!(
        "last error time: {}",
        results.last_error_time.as_deref().unwrap_or("-")
    );
    println!("console text:");
    println!("{}", results.console_text());

    match outcome {
        CycleOutcome::Failed => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    tracing::debug!(?cli, "parsed CLI arguments");

    let config = match cli.resolve_config() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    if cli.dry_run {
        println!("console-watcher v{}", env!("CARGO_PKG_VERSION"));
        println!("Config file: {}", cli.config.display());
        println!("{config:#?}");
        return ExitCode::SUCCESS;
    }

    let cycle = Arc::new(MonitorCycle::system(WidthRule::new(
        config.console.narrow_max,
    )));

    if cli.once {
        return run_once(&cycle).await;
    }

    let signals = match SignalHandler::install() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to install signal handlers");
            return ExitCode::FAILURE;
        }
    };

    let result = host::run(&config, cycle, signals, || reload_monitor(&cli, &cli.config)).await;
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "watcher stopped");
            ExitCode::FAILURE
        }
    }
}
