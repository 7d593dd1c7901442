use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::schema::LoggingConfig;

// ---------------------------------------------------------------------------
// Activity entry (JSONL)
// ---------------------------------------------------------------------------

/// A single entry in the activity log (`~/.abcxyz/activity.jsonl`).
///
/// One entry per pipeline action: upload, delete, load, refresh reload.
/// Read back by `abcxyz log`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    /// `"upload"`, `"delete"`, `"load"` or `"refresh"`.
    pub action: String,
    /// File name or endpoint the action worked on.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target: Option<String>,
    #[serde(default = "default_true")]
    pub success: bool,
    /// Server message or failure reason.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
    /// Rows rendered or affected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl ActivityEntry {
    pub fn new(action: &str, success: bool) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            action: action.to_string(),
            target: None,
            success,
            detail: None,
            rows: None,
            duration_ms: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Log file
// ---------------------------------------------------------------------------

/// Append-only JSONL activity log. Writes are best-effort.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: Option<PathBuf>,
    enabled: bool,
}

impl ActivityLog {
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            path: activity_log_path(),
            enabled: config.enabled,
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            enabled: true,
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Append an entry. Failures are ignored.
    pub fn record(&self, entry: &ActivityEntry) {
        if self.enabled {
            let _ = self.append(entry);
        }
    }

    fn append(&self, entry: &ActivityEntry) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{json}")?;

        Ok(())
    }

    /// All entries, oldest first. Malformed lines are skipped; a missing
    /// file yields nothing.
    pub fn read_all(&self) -> Vec<ActivityEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };

        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        let reader = BufReader::new(file);
        reader
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<ActivityEntry>(&line).ok())
            .collect()
    }

    /// The newest `limit` entries, newest first.
    pub fn read_recent(&self, limit: usize) -> Vec<ActivityEntry> {
        let mut entries = self.read_all();
        entries.reverse();
        entries.truncate(limit);
        entries
    }
}

/// Return the path to the activity log file.
pub fn activity_log_path() -> Option<PathBuf> {
    crate::config::home_dir().map(|home| home.join("activity.jsonl"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
