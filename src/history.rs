use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub target: String,
}

impl HistoryEntry {
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            target: target.into(),
        }
    }

    pub fn to_log_line(&self) -> String {
        format!(
            "{} {} {}\n",
            self.timestamp.to_rfc3339(),
            self.action,
            self.target
        )
    }
}

/// Append-only record of every action taken against the host.
///
/// Entries are always kept in memory for the lifetime of the logger; when a
/// path is set they are also appended to disk. Writing is best-effort: a log
/// failure is reported through `log` and never aborts the action it records.
pub struct HistoryLogger {
    log_path: Option<PathBuf>,
    entries: Mutex<Vec<HistoryEntry>>,
}

impl HistoryLogger {
    pub fn new() -> Self {
        Self::with_path(Config::data_dir().join("history.log"))
    }

    pub fn with_path(log_path: PathBuf) -> Self {
        Self {
            log_path: Some(log_path),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            log_path: None,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, action: &str, target: impl Into<String>) {
        let entry = HistoryEntry::new(action, target);
        if let Err(e) = self.append(&entry) {
            log::warn!("failed to write history entry: {}", e);
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let Some(log_path) = &self.log_path else {
            return Ok(());
        };

        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        write!(file, "{}", entry.to_log_line())?;
        Ok(())
    }

    /// Entries recorded by this logger instance, oldest first.
    pub fn session_entries(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn read_history(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        let entries = match &self.log_path {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(path)?;
                content
                    .lines()
                    .filter_map(|line| self.parse_line(line))
                    .collect()
            }
            Some(_) => Vec::new(),
            None => self.session_entries(),
        };

        let result = if let Some(n) = limit {
            entries.into_iter().rev().take(n).collect()
        } else {
            entries
        };

        Ok(result)
    }

    fn parse_line(&self, line: &str) -> Option<HistoryEntry> {
        let parts: Vec<&str> = line.splitn(3, ' ').collect();
        if parts.len() < 3 {
            return None;
        }

        let timestamp = DateTime::parse_from_rfc3339(parts[0])
            .ok()?
            .with_timezone(&Utc);

        Some(HistoryEntry {
            timestamp,
            action: parts[1].to_string(),
            target: parts[2].to_string(),
        })
    }
}

impl Default for HistoryLogger {
    fn default() -> Self {
        Self::new()
    }
}
