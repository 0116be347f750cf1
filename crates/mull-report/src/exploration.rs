//! Exploration log - append-only JSONL trail at `workspace/exploration.log`
//!
//! Every write is fail-open: a broken log never stops an iteration.

use chrono::{DateTime, Utc};
use mull_core::fail_open::fail_open;
use mull_core::{MullError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Something an iteration did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExplorationEvent {
    IterationStart {
        iteration: u64,
    },
    IterationEnd {
        iteration: u64,
        perspectives_collected: usize,
    },
    PerspectiveFound {
        id: String,
        author: String,
        post_id: String,
        preview: String,
    },
    GuardStatus {
        guard: String,
        passed: bool,
        message: String,
    },
    ReportGenerated {
        version: u32,
        output_path: PathBuf,
    },
}

/// One line of the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ExplorationEvent,
}

pub struct ExplorationLog {
    path: PathBuf,
}

impl ExplorationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event, stamped now
    pub async fn record(&self, event: ExplorationEvent) {
        fail_open("exploration_log::record", || async {
            let record = ExplorationRecord {
                timestamp: Utc::now(),
                event,
            };
            let mut line = serde_json::to_string(&record)?;
            line.push('\n');

            if let Some(dir) = self.path.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;

            Ok::<(), MullError>(())
        })
        .await;
    }

    /// Read every parseable record; unparseable lines are skipped
    pub async fn read_all(&self) -> Result<Vec<ExplorationRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_records_append_as_jsonl() {
        let dir = tempdir().unwrap();
        let log = ExplorationLog::new(dir.path().join("workspace/exploration.log"));

        log.record(ExplorationEvent::IterationStart { iteration: 1 }).await;
        log.record(ExplorationEvent::GuardStatus {
            guard: "Minimum Engagement".to_string(),
            passed: false,
            message: "Only 1/3 conversations".to_string(),
        })
        .await;

        let raw = std::fs::read_to_string(log.path()).unwrap();
        let first: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(first["event"], "iteration_start");
        assert_eq!(first["iteration"], 1);
        assert!(first["timestamp"].is_string());

        let records = log.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(
            records[1].event,
            ExplorationEvent::GuardStatus { passed: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        // parent is a file, so every append fails
        let log = ExplorationLog::new(blocker.join("exploration.log"));
        log.record(ExplorationEvent::ReportGenerated {
            version: 1,
            output_path: PathBuf::from("output/synthesis_v1.md"),
        })
        .await;

        assert!(!log.path().exists());
    }

    #[tokio::test]
    async fn test_read_skips_garbage_lines() {
        let dir = tempdir().unwrap();
        let log = ExplorationLog::new(dir.path().join("exploration.log"));
        log.record(ExplorationEvent::IterationEnd {
            iteration: 4,
            perspectives_collected: 2,
        })
        .await;
        std::fs::write(
            log.path(),
            format!("{}not json\n", std::fs::read_to_string(log.path()).unwrap()),
        )
        .unwrap();

        let records = log.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
