//! Interactive console
//!
//! A line-oriented front end over a [`SchedulerHandle`]: submit kai and
//! kantra tasks, list what is queued and running, and cancel by id or from a
//! picker. Lifecycle events are printed as they arrive.

use std::time::Duration;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::{RequestId, WorkType};
use crate::events::SchedulerEvent;
use crate::scheduler::{CancelOutcome, QueueSnapshot, SchedulerHandle};

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Submit { work_type: WorkType, count: usize },
    /// Cancel by id, or open the picker when no id is given
    Cancel(Option<RequestId>),
    List,
    Stats,
    Help,
    Quit,
}

/// Parse one console line; the leading `/` is optional
pub fn parse_command(input: &str) -> Result<ConsoleCommand, String> {
    let input = input.trim().trim_start_matches('/');
    let parts: Vec<&str> = input.split_whitespace().collect();
    let Some((cmd, args)) = parts.split_first() else {
        return Err("Empty command".to_string());
    };

    let count = |arg: Option<&&str>| -> Result<usize, String> {
        match arg {
            None => Ok(1),
            Some(s) => s
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("Invalid count '{}'", s)),
        }
    };

    match cmd.to_lowercase().as_str() {
        "kai" | "kantra" => Ok(ConsoleCommand::Submit {
            work_type: cmd.parse::<WorkType>().map_err(|e| format!("{}", e))?,
            count: count(args.first())?,
        }),
        "submit" | "s" => {
            let work_type = args
                .first()
                .ok_or_else(|| "Usage: /submit <kai|kantra> [count]".to_string())?
                .parse::<WorkType>()
                .map_err(|e| format!("{}", e))?;
            Ok(ConsoleCommand::Submit {
                work_type,
                count: count(args.get(1))?,
            })
        }
        "cancel" | "c" => match args.first() {
            None => Ok(ConsoleCommand::Cancel(None)),
            Some(id) => id
                .parse::<RequestId>()
                .map(|id| ConsoleCommand::Cancel(Some(id)))
                .map_err(|_| format!("Invalid task id '{}'", id)),
        },
        "list" | "ls" | "l" => Ok(ConsoleCommand::List),
        "stats" => Ok(ConsoleCommand::Stats),
        "help" | "h" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "q" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(format!("Unknown command: {}", other)),
    }
}

/// One-line rendering of an event for terminal output
pub fn format_event(event: &SchedulerEvent) -> String {
    let request = event.request();
    let label = format!("[{}]", request.name);
    match event {
        SchedulerEvent::Submitted { .. } => {
            format!("{} {} ({})", label.dimmed(), "queued".dimmed(), request.work_type)
        }
        SchedulerEvent::Started { .. } => {
            format!("{} {} ({})", label.bright_blue(), "started".bright_blue(), request.work_type)
        }
        SchedulerEvent::Completed { elapsed_ms, .. } => format!(
            "{} {} in {}",
            label.bright_green(),
            "completed".bright_green(),
            format_elapsed(Duration::from_millis(*elapsed_ms))
        ),
        SchedulerEvent::Failed { stage, error, .. } => {
            format!("{} {} ({}): {}", label.red(), "failed".red(), stage, error)
        }
        SchedulerEvent::Cancelled { was_running, .. } => {
            let what = if *was_running { "cancelled (was running)" } else { "cancelled (was queued)" };
            format!("{} {}", label.yellow(), what.yellow())
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

/// Print every event from `rx` until the bus closes
pub fn spawn_event_printer(mut rx: broadcast::Receiver<SchedulerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => println!("{}", format_event(&event)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

enum ConsoleResult {
    Continue,
    Quit,
}

/// Interactive session bound to a running scheduler
pub struct Console {
    handle: SchedulerHandle,
}

impl Console {
    pub fn new(handle: SchedulerHandle) -> Self {
        Self { handle }
    }

    /// Run the console main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();
        let printer = spawn_event_printer(self.handle.subscribe());

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", "tg>".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    match parse_command(input) {
                        Ok(command) => match self.execute(command, &mut rl).await? {
                            ConsoleResult::Continue => continue,
                            ConsoleResult::Quit => break,
                        },
                        Err(message) => {
                            println!("{} {}", "?".yellow(), message);
                            println!("Type {} for available commands", "/help".yellow());
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        printer.abort();
        println!("Goodbye!");
        Ok(())
    }

    async fn execute(&mut self, command: ConsoleCommand, rl: &mut DefaultEditor) -> Result<ConsoleResult> {
        debug!(?command, "Console::execute: called");
        match command {
            ConsoleCommand::Submit { work_type, count } => {
                for _ in 0..count {
                    self.handle.submit(work_type).await?;
                }
            }
            ConsoleCommand::Cancel(Some(id)) => self.cancel(id).await?,
            ConsoleCommand::Cancel(None) => {
                let snapshot = self.handle.snapshot().await?;
                if let Some(id) = pick_task(&snapshot, rl)? {
                    self.cancel(id).await?;
                }
            }
            ConsoleCommand::List => {
                let snapshot = self.handle.snapshot().await?;
                print_snapshot(&snapshot);
            }
            ConsoleCommand::Stats => {
                let snapshot = self.handle.snapshot().await?;
                print_stats(&snapshot);
            }
            ConsoleCommand::Help => self.print_help(),
            ConsoleCommand::Quit => return Ok(ConsoleResult::Quit),
        }
        Ok(ConsoleResult::Continue)
    }

    async fn cancel(&self, id: RequestId) -> Result<()> {
        match self.handle.cancel(id).await? {
            CancelOutcome::Running(_) | CancelOutcome::Dequeued(_) => {}
            CancelOutcome::NotFound => {
                println!("{}", format!("Task {} is not queued or running.", id).dimmed());
            }
        }
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "taskgate console".bright_cyan().bold());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:24} Submit kai tasks", "/kai [count]".yellow());
        println!("  {:24} Submit kantra tasks", "/kantra [count]".yellow());
        println!("  {:24} Submit tasks of a type", "/submit <type> [count]".yellow());
        println!("  {:24} Cancel a task (picker without id)", "/cancel [id]".yellow());
        println!("  {:24} Show queued and running tasks", "/list".yellow());
        println!("  {:24} Show scheduler statistics", "/stats".yellow());
        println!("  {:24} Show this help", "/help".yellow());
        println!("  {:24} Exit the console", "/quit".yellow());
        println!();
    }
}

/// Picker entries: running first (id order), then queued (arrival order)
pub fn picker_entries(snapshot: &QueueSnapshot) -> Vec<(RequestId, String)> {
    let running = snapshot.running.iter().map(|e| {
        (
            e.request.id,
            format!("{} ({}, running {})", e.request.name, e.request.work_type, format_elapsed(e.elapsed)),
        )
    });
    let queued = snapshot
        .queued
        .iter()
        .map(|r| (r.id, format!("{} ({}, queued)", r.name, r.work_type)));
    running.chain(queued).collect()
}

fn pick_task(snapshot: &QueueSnapshot, rl: &mut DefaultEditor) -> Result<Option<RequestId>> {
    let entries = picker_entries(snapshot);
    if entries.is_empty() {
        println!("{}", "No tasks to cancel.".dimmed());
        return Ok(None);
    }

    println!("{}", "Select task to cancel:".bright_cyan());
    for (index, (_, label)) in entries.iter().enumerate() {
        println!("  {:>3}  {}", (index + 1).to_string().yellow(), label);
    }

    let answer = match rl.readline("number (empty to abort)> ") {
        Ok(answer) => answer,
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
        Err(err) => return Err(eyre::eyre!("Readline error: {}", err)),
    };
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(None);
    }
    match answer.parse::<usize>().ok().and_then(|n| n.checked_sub(1)).and_then(|i| entries.get(i)) {
        Some((id, _)) => Ok(Some(*id)),
        None => {
            println!("{} No entry '{}'", "?".yellow(), answer);
            Ok(None)
        }
    }
}

fn print_snapshot(snapshot: &QueueSnapshot) {
    if snapshot.is_idle() {
        println!("{}", "Nothing queued or running.".dimmed());
        return;
    }
    println!("{}", "Running:".bright_cyan());
    for entry in &snapshot.running {
        println!(
            "  {:>4}  {:10} {:7} {}",
            entry.request.id.0,
            entry.request.name,
            entry.request.work_type,
            format_elapsed(entry.elapsed)
        );
    }
    println!("{}", "Queued:".bright_cyan());
    for request in &snapshot.queued {
        println!("  {:>4}  {:10} {}", request.id.0, request.name, request.work_type);
    }
}

fn print_stats(snapshot: &QueueSnapshot) {
    let stats = &snapshot.stats;
    println!("{}", "Scheduler Statistics:".bright_cyan());
    println!("  {:18} {}", "submitted", stats.total_submitted);
    println!("  {:18} {}", "started", stats.total_started);
    println!("  {:18} {}", "completed", stats.total_completed);
    println!("  {:18} {}", "failed", stats.total_failed);
    println!("  {:18} {}", "cancelled", stats.total_cancelled);
    println!("  {:18} {}", "peak queue depth", stats.peak_queue_depth);
    for work_type in WorkType::ALL {
        println!(
            "  {:18} {} active, peak {}",
            work_type.to_string(),
            snapshot.active_for(work_type),
            stats.peak_active_for(work_type)
        );
    }
}
