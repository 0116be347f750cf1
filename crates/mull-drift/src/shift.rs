//! Perspective shift detection
//!
//! A shift is measured as the Jaccard distance between the current theme set
//! and the theme set recorded at the last report:
//!
//! ```text
//! distance = 1 - |current ∩ baseline| / |current ∪ baseline|
//! ```
//!
//! Two empty sets are identical (distance 0). Exactly one empty set is a total
//! replacement (distance 1).

use serde::{Deserialize, Serialize};

use crate::themes::ThemeSet;

/// Outcome of comparing two theme sets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftResult {
    /// Whether the shift counts toward a new report
    pub fired: bool,
    /// Jaccard distance in [0, 1]
    pub distance: f64,
    /// False when the current set is too small to judge
    pub measurable: bool,
}

/// Jaccard distance between two theme sets
pub fn jaccard_distance(current: &ThemeSet, baseline: &ThemeSet) -> f64 {
    let union = current.union_len(baseline);
    if union == 0 {
        return 0.0;
    }
    let intersection = current.intersection_len(baseline);
    1.0 - intersection as f64 / union as f64
}

/// Compare `current` against `baseline`
///
/// Never fires when `|current| < min_size`, and never fires on identical sets.
/// Otherwise fires when `distance >= threshold`, so a threshold of 0 means
/// "fire on any change".
pub fn detect_shift(
    current: &ThemeSet,
    baseline: &ThemeSet,
    min_size: usize,
    threshold: f64,
) -> ShiftResult {
    let distance = jaccard_distance(current, baseline);
    let measurable = current.len() >= min_size;
    let fired = measurable && distance > 0.0 && distance >= threshold;

    ShiftResult {
        fired,
        distance,
        measurable,
    }
}

/// Strategy for deciding whether themes have shifted
///
/// Swap in an embedding-based detector without touching the guard.
pub trait ShiftDetector: Send + Sync {
    fn detect(&self, current: &ThemeSet, baseline: &ThemeSet) -> ShiftResult;

    /// Smallest current theme set the detector will judge
    fn min_size(&self) -> usize;
}

/// Threshold on plain Jaccard distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JaccardShiftDetector {
    threshold: f64,
    min_size: usize,
}

impl JaccardShiftDetector {
    /// `threshold` is clamped into [0, 1]
    pub fn new(threshold: f64, min_size: usize) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            min_size,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for JaccardShiftDetector {
    fn default() -> Self {
        Self::new(0.3, 5)
    }
}

impl ShiftDetector for JaccardShiftDetector {
    fn detect(&self, current: &ThemeSet, baseline: &ThemeSet) -> ShiftResult {
        detect_shift(current, baseline, self.min_size, self.threshold)
    }

    fn min_size(&self) -> usize {
        self.min_size
    }
}

/// Which themes emerged, faded or continued between two sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeDelta {
    pub emerging: Vec<String>,
    pub fading: Vec<String>,
    pub continuing: Vec<String>,
}

impl ThemeDelta {
    pub fn between(current: &ThemeSet, baseline: &ThemeSet) -> Self {
        Self {
            emerging: owned(current.difference(baseline)),
            fading: owned(baseline.difference(current)),
            continuing: owned(current.common(baseline)),
        }
    }

    pub fn is_stable(&self) -> bool {
        self.emerging.is_empty() && self.fading.is_empty()
    }

    /// One-line summary, e.g. "New themes: a, b; Fading themes: c; Continuing: d"
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if !self.emerging.is_empty() {
            parts.push(format!("New themes: {}", head(&self.emerging, 5)));
        }
        if !self.fading.is_empty() {
            parts.push(format!("Fading themes: {}", head(&self.fading, 5)));
        }
        if !self.continuing.is_empty() {
            parts.push(format!("Continuing: {}", head(&self.continuing, 3)));
        }

        if parts.is_empty() {
            "Minimal thematic change".to_string()
        } else {
            parts.join("; ")
        }
    }
}

fn owned(labels: Vec<&str>) -> Vec<String> {
    labels.into_iter().map(str::to_string).collect()
}

fn head(labels: &[String], n: usize) -> String {
    labels.iter().take(n).cloned().collect::<Vec<_>>().join(", ")
}
