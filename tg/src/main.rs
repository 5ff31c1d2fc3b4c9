//! tg - taskgate command-line entry point
//!
//! Loads configuration, sets up logging, and runs the selected front end
//! over a freshly spawned scheduler.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use taskgate::cli::{Cli, Command, OutputFormat, generate_after_help};
use taskgate::config::Config;
use taskgate::console::{Console, format_event};
use taskgate::domain::{RequestId, WorkType};
use taskgate::events::{EventBus, spawn_event_logger};
use taskgate::executor::ExecutorSet;
use taskgate::scheduler::{ProcessController, SchedulerHandle, SchedulerStats};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskgate")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("taskgate.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None | Some(Command::Console) => {
            debug!("main: matched Console command");
            cmd_console(&config).await
        }
        Some(Command::Run { kai, kantra, format }) => {
            debug!(kai, kantra, ?format, "main: matched Run command");
            cmd_run(&config, kai, kantra, format).await
        }
        Some(Command::Config) => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
    }
}

/// Everything a front end needs, wired from config
struct Runtime {
    bus: EventBus,
    handle: SchedulerHandle,
    controller: tokio::task::JoinHandle<()>,
    logger: tokio::task::JoinHandle<()>,
}

impl Runtime {
    fn start(config: &Config) -> Result<Self> {
        debug!("Runtime::start: called");
        let bus = EventBus::new(config.events.capacity);
        let log_path = config.events.resolved_log_path();
        let logger = spawn_event_logger(&bus, &log_path).context("Failed to start event logger")?;
        info!(path = %log_path.display(), "Event log");

        let executors = ExecutorSet::from_config(&config.executors).context("Failed to build executors")?;
        let (handle, controller) = ProcessController::spawn(config.scheduler.clone(), executors, bus.clone());
        Ok(Self {
            bus,
            handle,
            controller,
            logger,
        })
    }

    /// Shut the scheduler down and wait for the event log to flush
    async fn stop(self) -> Result<()> {
        debug!("Runtime::stop: called");
        if let Err(e) = self.handle.shutdown().await {
            warn!(error = %e, "Runtime::stop: scheduler already stopped");
        }
        self.controller.await.context("Scheduler task failed")?;
        drop(self.handle);
        drop(self.bus);
        self.logger.await.context("Event logger task failed")?;
        Ok(())
    }
}

async fn cmd_console(config: &Config) -> Result<()> {
    let runtime = Runtime::start(config)?;
    let mut console = Console::new(runtime.handle.clone());
    let result = console.run().await;
    drop(console);
    runtime.stop().await?;
    result
}

async fn cmd_run(config: &Config, kai: usize, kantra: usize, format: OutputFormat) -> Result<()> {
    let runtime = Runtime::start(config)?;
    let mut pending = BTreeSet::new();

    let batch = tokio::select! {
        result = run_batch(&runtime.handle, kai, kantra, &mut pending, format == OutputFormat::Text) => result.map(|_| false),
        _ = tokio::signal::ctrl_c() => {
            warn!("cmd_run: interrupted, cancelling remaining tasks");
            Ok(true)
        }
    };
    let snapshot = runtime.handle.snapshot().await;

    // Always flush the event log, whatever happened above
    runtime.stop().await?;
    let interrupted = batch?;
    let stats = snapshot?.stats;

    match format {
        OutputFormat::Text => print_summary(&stats),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
    }

    if interrupted {
        return Err(eyre::eyre!("Interrupted with {} task(s) unfinished", pending.len()));
    }
    if stats.total_failed > 0 {
        return Err(eyre::eyre!("{} task(s) failed", stats.total_failed));
    }
    Ok(())
}

/// Submit the batch, then print events until every submitted id finished
async fn run_batch(
    handle: &SchedulerHandle,
    kai: usize,
    kantra: usize,
    pending: &mut BTreeSet<RequestId>,
    print: bool,
) -> Result<()> {
    let mut rx = handle.subscribe();
    for (work_type, count) in [(WorkType::Kai, kai), (WorkType::Kantra, kantra)] {
        for _ in 0..count {
            pending.insert(handle.submit(work_type).await?.id);
        }
    }
    info!(submitted = pending.len(), "run_batch: batch submitted");

    handle
        .wait_for_finished(&mut rx, pending, |event| {
            if print {
                println!("{}", format_event(event));
            }
        })
        .await?;
    Ok(())
}

fn print_summary(stats: &SchedulerStats) {
    println!();
    println!("{}", "Summary:".bright_cyan());
    println!("  {:12} {}", "completed", stats.total_completed.to_string().bright_green());
    println!("  {:12} {}", "failed", stats.total_failed.to_string().red());
    println!("  {:12} {}", "cancelled", stats.total_cancelled.to_string().yellow());
    for work_type in WorkType::ALL {
        println!("  {:12} {}", format!("peak {}", work_type), stats.peak_active_for(work_type));
    }
}

fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to render configuration")?;
    print!("{}", yaml);
    Ok(())
}
