//! Loop state persisted between runs (`workspace/state.json`)

use mull_core::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopState {
    /// Last iteration started (1-indexed, 0 = never ran)
    #[serde(default)]
    pub iteration: u64,
    #[serde(default)]
    pub last_report_iteration: Option<u64>,
    /// Store size when the last report was published
    #[serde(default)]
    pub last_report_perspectives: usize,
    #[serde(default)]
    pub conversations_since_last_report: usize,
    /// Store size at the end of the last iteration
    #[serde(default)]
    pub perspectives_seen: usize,
}

impl LoopState {
    /// Record what an iteration observed; returns perspectives new since the
    /// previous observation
    pub fn observe(&mut self, current_count: usize, since_last_report: usize) -> usize {
        let collected = current_count.saturating_sub(self.perspectives_seen);
        self.perspectives_seen = current_count;
        self.conversations_since_last_report = since_last_report;
        collected
    }

    pub fn record_report(&mut self, iteration: u64, perspective_count: usize) {
        self.last_report_iteration = Some(iteration);
        self.last_report_perspectives = perspective_count;
        self.conversations_since_last_report = 0;
    }
}

/// Load loop state; a missing file is a fresh state
pub async fn load_state(path: &Path) -> Result<LoopState> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LoopState::default()),
        Err(e) => Err(e.into()),
    }
}

pub async fn save_state(state: &LoopState, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let json = serde_json::to_string_pretty(state)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
