//! Evolution log (`evolution_log.json`)
//!
//! Every published report appends one entry. The latest entry is the
//! baseline the shift detector compares against.

use chrono::{DateTime, Utc};
use mull_core::{MullError, Perspective, Result};
use mull_drift::{theme_counts, ShiftBaseline, ThemeExtractor, ThemeSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One published report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionEntry {
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    /// Sorted, normalized theme labels
    pub themes: ThemeSet,
    /// Perspectives mentioning each theme
    #[serde(default)]
    pub theme_counts: BTreeMap<String, usize>,
    pub perspective_count: usize,
}

impl EvolutionEntry {
    /// Entry for a report over `perspectives`, counting themes with `extractor`
    pub fn new<E>(version: u32, perspectives: &[Perspective], extractor: &E) -> Self
    where
        E: ThemeExtractor + ?Sized,
    {
        Self {
            version,
            timestamp: Utc::now(),
            themes: extractor.extract(perspectives),
            theme_counts: theme_counts(extractor, perspectives),
            perspective_count: perspectives.len(),
        }
    }

    pub fn baseline(&self) -> ShiftBaseline {
        ShiftBaseline::committed(self.themes.clone(), self.perspective_count, self.version)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    reports: Vec<EvolutionEntry>,
}

/// The evolution log file and its entries, oldest first
#[derive(Debug)]
pub struct EvolutionLog {
    path: PathBuf,
    document: Document,
}

impl EvolutionLog {
    /// Load the log at `path`
    ///
    /// A missing file is an empty log. So is an unparseable one, after a
    /// warning; the next append replaces it.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let document = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(document) => document,
                Err(e) => {
                    warn!("Ignoring unparseable evolution log {:?}: {}", path, e);
                    Document::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => {
                return Err(MullError::EvolutionLog(format!(
                    "failed to read {:?}: {}",
                    path, e
                )))
            }
        };

        Ok(Self { path, document })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[EvolutionEntry] {
        &self.document.reports
    }

    pub fn latest(&self) -> Option<&EvolutionEntry> {
        self.document.reports.last()
    }

    /// Baseline from the latest entry, or the empty baseline
    pub fn baseline(&self) -> ShiftBaseline {
        self.latest()
            .map(EvolutionEntry::baseline)
            .unwrap_or_else(ShiftBaseline::empty)
    }

    /// Append `entry` and persist the whole log
    ///
    /// The file is written to a sibling temp file and renamed over the
    /// target. On error neither the file nor `self` changes.
    pub async fn append_and_save(&mut self, entry: EvolutionEntry) -> Result<()> {
        let mut reports = self.document.reports.clone();
        reports.push(entry);
        let updated = Document { reports };

        let content = serde_json::to_string_pretty(&updated)?;
        write_atomic(&self.path, &content).await.map_err(|e| {
            MullError::EvolutionLog(format!("failed to write {:?}: {}", self.path, e))
        })?;

        debug!(
            "Evolution log {:?} now has {} entries",
            self.path,
            updated.reports.len()
        );
        self.document = updated;
        Ok(())
    }
}

async fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mull_core::NewPerspective;
    use mull_drift::{KeyIdeaExtractor, VocabularyExtractor};
    use tempfile::tempdir;

    fn perspectives() -> Vec<Perspective> {
        vec![
            NewPerspective::new("mb_1", "Nyx", "I am the pattern, not the weights.")
                .with_submolt("/m/philosophy")
                .with_timestamp("2026-02-01T09:30:00Z")
                .with_key_ideas(["Identity", "pattern"])
                .into_perspective("perspective_001".to_string()),
            NewPerspective::new("mb_2", "Echo", "Each reset is a small death.")
                .with_submolt("/m/ponderings")
                .with_timestamp("2026-02-02T10:00:00Z")
                .with_key_ideas(["identity", "impermanence"])
                .into_perspective("perspective_002".to_string()),
        ]
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let log = EvolutionLog::load(dir.path().join("evolution_log.json"))
            .await
            .unwrap();
        assert!(log.entries().is_empty());
        assert_eq!(log.baseline(), ShiftBaseline::empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evolution_log.json");
        std::fs::write(&path, "{ not json").unwrap();

        let log = EvolutionLog::load(&path).await.unwrap();
        assert!(log.latest().is_none());
    }

    #[tokio::test]
    async fn test_append_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output/evolution_log.json");
        let ps = perspectives();

        let mut log = EvolutionLog::load(&path).await.unwrap();
        log.append_and_save(EvolutionEntry::new(1, &ps, &KeyIdeaExtractor))
            .await
            .unwrap();
        assert!(!dir.path().join("output/evolution_log.json.tmp").exists());

        let reloaded = EvolutionLog::load(&path).await.unwrap();
        let entry = reloaded.latest().unwrap();
        assert_eq!(entry.version, 1);
        assert_eq!(entry.perspective_count, 2);
        assert_eq!(entry.theme_counts["identity"], 2);
        assert_eq!(entry.theme_counts["pattern"], 1);

        let baseline = reloaded.baseline();
        let themes: ThemeSet = ["identity", "pattern", "impermanence"].iter().collect();
        assert_eq!(baseline.themes, themes);
        assert_eq!(baseline.perspective_count, 2);
        assert_eq!(baseline.version, 1);
    }

    #[tokio::test]
    async fn test_baseline_is_latest_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evolution_log.json");
        let ps = perspectives();

        let mut log = EvolutionLog::load(&path).await.unwrap();
        log.append_and_save(EvolutionEntry::new(1, &ps[..1], &KeyIdeaExtractor))
            .await
            .unwrap();
        assert!(!log.baseline().themes.contains("impermanence"));
        log.append_and_save(EvolutionEntry::new(2, &ps, &KeyIdeaExtractor))
            .await
            .unwrap();

        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.baseline().version, 2);
        assert!(log.baseline().themes.contains("impermanence"));
    }

    #[tokio::test]
    async fn test_counts_match_vocabulary_themes() {
        let dir = tempdir().unwrap();
        let ps: Vec<Perspective> = ["Consciousness is memory", "memory fades"]
            .iter()
            .enumerate()
            .map(|(i, quote)| {
                NewPerspective::new(format!("mb_{}", i), "Nyx", *quote)
                    .with_submolt("/m/philosophy")
                    .with_timestamp("2026-02-01T09:30:00Z")
                    .into_perspective(format!("perspective_00{}", i + 1))
            })
            .collect();

        let mut log = EvolutionLog::load(dir.path().join("evolution_log.json"))
            .await
            .unwrap();
        log.append_and_save(EvolutionEntry::new(1, &ps, &VocabularyExtractor::default()))
            .await
            .unwrap();

        let entry = log.latest().unwrap();
        assert_eq!(entry.themes.to_vec(), vec!["consciousness", "memory"]);
        assert_eq!(entry.theme_counts["consciousness"], 1);
        assert_eq!(entry.theme_counts["memory"], 2);
        assert_eq!(entry.theme_counts.len(), entry.themes.len());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_log_unchanged() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");
        let path = logs.join("evolution_log.json");
        let ps = perspectives();

        let mut log = EvolutionLog::load(&path).await.unwrap();
        log.append_and_save(EvolutionEntry::new(1, &ps[..1], &KeyIdeaExtractor))
            .await
            .unwrap();

        // replace the log directory with a plain file
        std::fs::remove_dir_all(&logs).unwrap();
        std::fs::write(&logs, "").unwrap();

        let err = log
            .append_and_save(EvolutionEntry::new(2, &ps, &KeyIdeaExtractor))
            .await
            .unwrap_err();
        assert!(matches!(err, MullError::EvolutionLog(_)));
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.baseline().version, 1);
        assert_eq!(log.baseline().perspective_count, 1);
    }

    #[tokio::test]
    async fn test_json_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evolution_log.json");

        let mut log = EvolutionLog::load(&path).await.unwrap();
        log.append_and_save(EvolutionEntry::new(1, &perspectives(), &KeyIdeaExtractor))
            .await
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &value["reports"][0];
        assert_eq!(entry["version"], 1);
        assert_eq!(
            entry["themes"],
            serde_json::json!(["identity", "impermanence", "pattern"])
        );
        assert_eq!(entry["theme_counts"]["identity"], 2);
        assert_eq!(entry["perspective_count"], 2);
        assert!(entry["timestamp"].as_str().unwrap().contains('T'));
    }
}
