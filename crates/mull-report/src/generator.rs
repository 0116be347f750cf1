use async_trait::async_trait;
use mull_core::{Perspective, Result};
use mull_drift::{ShiftBaseline, ThemeSet};
use std::path::PathBuf;

/// Everything a generator needs to write one report
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub perspectives: Vec<Perspective>,
    pub themes: ThemeSet,
    /// Baseline of the previous report (empty before the first)
    pub baseline: ShiftBaseline,
}

impl ReportRequest {
    pub fn new(perspectives: Vec<Perspective>, themes: ThemeSet, baseline: ShiftBaseline) -> Self {
        Self {
            perspectives,
            themes,
            baseline,
        }
    }

    /// Perspectives collected since the previous report
    pub fn new_since_last(&self) -> usize {
        self.perspectives
            .len()
            .saturating_sub(self.baseline.perspective_count)
    }
}

/// A report that has been fully written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub version: u32,
    pub path: PathBuf,
}

/// Produces a versioned report artifact
///
/// Returning `Ok` means the artifact exists; only then may the caller commit
/// a new baseline.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, request: &ReportRequest) -> Result<GeneratedReport>;
}
