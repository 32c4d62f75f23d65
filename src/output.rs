use crate::coordinator::RemovalSummary;
use crate::inventory::RemovableUnit;
use crate::pipeline::{OutcomeStatus, RemovalOptions, RemovalOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResult {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub libraries: Vec<LibraryItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryItem {
    pub name: String,
    pub store_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl ListResult {
    pub fn new(units: &[RemovableUnit]) -> Self {
        let libraries: Vec<LibraryItem> = units
            .iter()
            .map(|unit| LibraryItem {
                name: unit.name.clone(),
                store_key: crate::store::display_path(unit.root, &unit.sub_key),
                content_dir: unit.has_content_dir().then(|| unit.content_dir.clone()),
                size_bytes: unit.known_size(),
            })
            .collect();

        let total_size_bytes = libraries
            .iter()
            .map(|l| l.size_bytes)
            .sum::<Option<u64>>()
            .filter(|_| !libraries.is_empty());

        Self {
            version: SCHEMA_VERSION.to_string(),
            timestamp: Utc::now(),
            libraries,
            total_size_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Success,
    PartialSuccess,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovalResult {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub status: ExecutionStatus,
    pub options: RemovalOptions,
    pub outcomes: Vec<RemovalOutcome>,
    pub duration_ms: u64,
}

impl RemovalResult {
    pub fn new(summary: RemovalSummary, options: RemovalOptions, duration_ms: u64) -> Self {
        let succeeded = summary.count(OutcomeStatus::Succeeded);
        let status = if summary.cancelled {
            ExecutionStatus::Cancelled
        } else if succeeded == summary.outcomes.len() {
            ExecutionStatus::Success
        } else if succeeded > 0 {
            ExecutionStatus::PartialSuccess
        } else {
            ExecutionStatus::Failed
        };

        Self {
            version: SCHEMA_VERSION.to_string(),
            timestamp: Utc::now(),
            status,
            options,
            outcomes: summary.outcomes,
            duration_ms,
        }
    }
}
