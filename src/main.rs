mod cli;
mod config;
mod coordinator;
mod error;
mod fileops;
mod history;
mod inventory;
mod locations;
mod metadata;
mod output;
mod pipeline;
mod progress;
mod relocate;
mod safety;
mod store;
#[cfg(test)]
mod test_support;
mod tui;
mod utils;

use anyhow::Result;
use cli::{Cli, Commands, ConfigActions, OutputFormat};
use config::Config;
use coordinator::{RemovalCoordinator, RemovalEvent};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use error::SweepError;
use history::HistoryLogger;
use inventory::{InventoryScanner, InventorySnapshot, RemovableUnit};
use locations::Locations;
use output::{ListResult, RemovalResult};
use pipeline::{OutcomeStatus, RemovalContext, RemovalOptions};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use store::ConfigStore;
use tui::App;
use utils::format_size;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.command.is_none());

    let result = match Config::load() {
        Ok(config) => run(cli, config),
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => code,
        Err(e) => match e.downcast_ref::<SweepError>() {
            Some(SweepError::Fatal(msg)) => {
                eprintln!("Error: {}", msg);
                eprintln!("libsweep must be run with administrator rights.");
                ExitCode::from(2)
            }
            _ => {
                eprintln!("Error: {}", e);
                ExitCode::from(1)
            }
        },
    }
}

/// Commands log to stderr; the TUI owns the terminal, so it logs to a file.
fn init_logging(tui: bool) {
    let default_filter = if tui { "info" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));

    if tui {
        let dir = Config::data_dir();
        let file = fs::create_dir_all(&dir).and_then(|_| {
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("libsweep.log"))
        });
        match file {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(_) => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }

    let _ = builder.try_init();
}

struct Host {
    locations: Locations,
    store: Arc<dyn ConfigStore>,
    history: Arc<HistoryLogger>,
}

impl Host {
    fn open(config: &Config, require_write: bool) -> Result<Self> {
        let locations = Locations::system();
        let store: Arc<dyn ConfigStore> = Arc::from(store::system_store(&locations)?);
        if require_write {
            store.check_write_access().map_err(SweepError::from)?;
        }

        let history = if config.log.history {
            HistoryLogger::new()
        } else {
            HistoryLogger::in_memory()
        };

        Ok(Self {
            locations,
            store,
            history: Arc::new(history),
        })
    }

    fn context(&self) -> RemovalContext {
        RemovalContext::new(
            Arc::clone(&self.store),
            self.locations.clone(),
            Arc::clone(&self.history),
        )
    }

    fn scan(&self) -> Result<Vec<RemovableUnit>> {
        Ok(InventoryScanner::new().scan(self.store.as_ref())?)
    }
}

fn run(cli: Cli, config: Config) -> Result<ExitCode> {
    match cli.command {
        None => run_tui(config)?,
        Some(Commands::List { sizes, format }) => run_list(&config, sizes, format)?,
        Some(Commands::Remove {
            names,
            delete_content,
            keep_content,
            no_backup,
            yes,
            format,
        }) => {
            let mut options = RemovalOptions::from(&config.removal);
            if delete_content {
                options.delete_content_dir = true;
            }
            if keep_content {
                options.delete_content_dir = false;
            }
            if no_backup {
                options.backup_config_entry = false;
            }
            return run_remove(&config, &names, options, yes, format);
        }
        Some(Commands::Relocate { name, to, yes }) => run_relocate(&config, &name, &to, yes)?,
        Some(Commands::Config { action }) => run_config(action, config)?,
        Some(Commands::History { limit }) => run_history(&config, limit)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn run_tui(config: Config) -> Result<()> {
    let host = Host::open(&config, true)?;
    let mut app = App::new(config, host.context());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_list(config: &Config, sizes: bool, format: OutputFormat) -> Result<()> {
    let host = Host::open(config, false)?;
    let units = host.scan()?;
    if sizes {
        inventory::compute_sizes(&units);
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ListResult::new(&units))?);
        }
        OutputFormat::Human => {
            if units.is_empty() {
                println!("No removable libraries found.");
                return Ok(());
            }

            println!("Removable libraries ({}):\n", units.len());
            for unit in &units {
                let size = unit
                    .known_size()
                    .map(format_size)
                    .unwrap_or_default();
                let content = if unit.has_content_dir() {
                    unit.content_dir.display().to_string()
                } else {
                    "(no content directory)".to_string()
                };
                println!("  {:<40} {:>10}  {}", unit.name, size, content);
            }

            if sizes {
                let total: u64 = units.iter().filter_map(RemovableUnit::known_size).sum();
                println!("\nTotal: {}", format_size(total));
            }
        }
    }

    Ok(())
}

fn run_remove(
    config: &Config,
    names: &[String],
    options: RemovalOptions,
    yes: bool,
    format: OutputFormat,
) -> Result<ExitCode> {
    let host = Host::open(config, yes)?;
    let units = host.scan()?;
    let snapshot = InventorySnapshot::from_units(&units);

    let mut selected = Vec::new();
    for name in names {
        match InventoryScanner::find(&units, name) {
            Some(unit) => selected.push(unit.clone()),
            None => return Err(SweepError::NotFound(name.clone()).into()),
        }
    }

    if !yes {
        println!("Will remove {} librar{}:", selected.len(), if selected.len() == 1 { "y" } else { "ies" });
        for unit in &selected {
            println!("  - {}", unit.name);
        }
        println!();
        println!("  Back up registry entry: {}", options.backup_config_entry);
        println!("  Delete content directory: {}", options.delete_content_dir);
        println!();
        println!("Use --yes to execute");
        return Ok(ExitCode::SUCCESS);
    }

    let start = Instant::now();
    let coordinator = RemovalCoordinator::new(host.context());
    if !coordinator.begin_removal(selected, options, snapshot) {
        anyhow::bail!("another removal is already running");
    }

    let human = matches!(format, OutputFormat::Human);
    let summary = coordinator.wait(|event| {
        if !human {
            return;
        }
        match event {
            RemovalEvent::Progress(p) => {
                println!("[{}/{}] {}: {}", p.step_index, p.step_count, p.unit, p.message);
            }
            RemovalEvent::UnitCompleted(outcome) => match outcome.status {
                OutcomeStatus::Succeeded => println!("{}: removed", outcome.unit),
                OutcomeStatus::Cancelled => println!("{}: cancelled", outcome.unit),
                OutcomeStatus::Failed => println!(
                    "{}: failed ({})",
                    outcome.unit,
                    outcome.reason.as_deref().unwrap_or("unknown error")
                ),
            },
            RemovalEvent::Finished(_) => {}
        }
    });
    coordinator.end();

    let summary = summary.ok_or_else(|| {
        SweepError::OperationFailed("removal worker exited without a summary".to_string())
    })?;
    let all_succeeded = summary.all_succeeded();
    let result = RemovalResult::new(summary, options, start.elapsed().as_millis() as u64);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Human => {
            println!("\nResults:");
            println!("  Status: {:?}", result.status);
            for outcome in &result.outcomes {
                for warning in &outcome.warnings {
                    println!("  ! {}: {}", outcome.unit, warning);
                }
                if let Some(backup) = &outcome.backup_file {
                    println!("  {}: registry backup at {}", outcome.unit, backup.display());
                }
                if outcome.is_partial() {
                    println!("  {}: partially removed; run again to finish", outcome.unit);
                }
            }
            println!("  Duration: {}ms", result.duration_ms);
        }
    }

    Ok(if all_succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn run_relocate(config: &Config, name: &str, to: &Path, yes: bool) -> Result<()> {
    let host = Host::open(config, yes)?;
    let units = host.scan()?;
    let unit = InventoryScanner::find(&units, name)
        .ok_or_else(|| SweepError::NotFound(name.to_string()))?;

    if !yes {
        println!("Will move {}", unit.content_dir.display());
        println!("  to {}", to.display());
        println!("\nUse --yes to execute");
        return Ok(());
    }

    let target = relocate::relocate(&host.context(), unit, to)?;
    println!("Moved {} to {}", unit.name, target.display());
    Ok(())
}

fn run_config(action: ConfigActions, mut config: Config) -> Result<()> {
    match action {
        ConfigActions::Show => {
            println!("Current configuration ({}):", Config::config_path().display());
            println!("  Back up registry entry: {}", config.removal.backup_config_entry);
            println!("  Delete content directory: {}", config.removal.delete_content_dir);
            println!("  Log history: {}", config.log.history);
            println!("  Shutdown timeout: {}s", config.shutdown.timeout_secs);
        }
        ConfigActions::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("Set {} to {}", key, value);
        }
    }

    Ok(())
}

fn run_history(config: &Config, limit: usize) -> Result<()> {
    if !config.log.history {
        println!("History logging is disabled.");
    }

    let logger = HistoryLogger::new();
    let entries = logger.read_history(Some(limit))?;

    if entries.is_empty() {
        println!("No history found.");
        return Ok(());
    }

    println!("Last {} action(s):\n", entries.len());

    for entry in entries {
        println!(
            "{} {} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.target
        );
    }

    Ok(())
}
