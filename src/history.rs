use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{AppError, Result};

/// How many entries the read path shows.
pub const DISPLAY_WINDOW: usize = 10;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub query: String,
    pub url: String,
    pub artifact_path: PathBuf,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Opens the store, loading any existing entries. A missing file means no history.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = read_entries(&path).await?;
        debug!(path = %path.display(), entries = entries.len(), "history loaded");
        Ok(HistoryStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the full sequence from disk.
    pub async fn load(&self) -> Result<Vec<HistoryEntry>> {
        read_entries(&self.path).await
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    /// Appends `entry` and rewrites the whole file.
    ///
    /// The in-memory sequence only grows once the file has been replaced.
    pub async fn append(&mut self, entry: HistoryEntry) -> Result<()> {
        let mut next = self.entries.clone();
        next.push(entry);
        write_entries(&self.path, &next).await?;
        self.entries = next;
        Ok(())
    }
}

async fn read_entries(path: &Path) -> Result<Vec<HistoryEntry>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content).map_err(|e| {
        AppError::PersistenceError(format!("{} is not a valid history file: {}", path.display(), e))
    })
}

async fn write_entries(path: &Path, entries: &[HistoryEntry]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(entries)?;

    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }
    fs::rename(&tmp, path).await?;
    Ok(())
}
