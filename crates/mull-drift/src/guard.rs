//! Report guards
//!
//! Guard 1: minimum engagement (perspectives collected since the last report)
//! Guard 2: perspective shift (themes drifted from the last report)
//!
//! A report is owed only when BOTH pass.

use mull_core::GuardConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::phase::GuardPhase;
use crate::shift::{JaccardShiftDetector, ShiftDetector, ShiftResult, ThemeDelta};
use crate::themes::ThemeSet;

/// Themes and perspective count as of the last successful report
///
/// Replaced wholesale after each confirmed report, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftBaseline {
    pub themes: ThemeSet,
    pub perspective_count: usize,
    /// Report version that produced this baseline (0 = no report yet)
    #[serde(default)]
    pub version: u32,
}

impl ShiftBaseline {
    /// Baseline before the first report
    pub fn empty() -> Self {
        Self::default()
    }

    /// Baseline recorded by a confirmed report
    pub fn committed(themes: ThemeSet, perspective_count: usize, version: u32) -> Self {
        Self {
            themes,
            perspective_count,
            version,
        }
    }

    pub fn is_initial(&self) -> bool {
        self.version == 0
    }
}

/// Engagement counter: perspectives collected since the last report
///
/// Derived rather than stored: the store only grows, so the count since the
/// last report is the store size minus the size the baseline recorded. It
/// rises with every saved perspective and drops to zero when a commit moves
/// the baseline, and it survives restarts with the evolution log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardState {
    since_last_report: usize,
}

impl GuardState {
    /// Derive the counter from the store size and the baseline
    pub fn since(current_count: usize, baseline: &ShiftBaseline) -> Self {
        Self {
            since_last_report: current_count.saturating_sub(baseline.perspective_count),
        }
    }

    pub fn since_last_report(&self) -> usize {
        self.since_last_report
    }
}

/// Result of one guard check, for logs and status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
}

/// Everything one evaluation found out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardDecision {
    pub ready: bool,
    pub engagement: usize,
    pub min_conversations: usize,
    pub shift: ShiftResult,
    pub min_size: usize,
    pub current_count: usize,
    pub theme_count: usize,
    pub delta: ThemeDelta,
}

impl GuardDecision {
    /// Phase implied by this evaluation alone
    pub fn phase(&self) -> GuardPhase {
        if self.ready {
            GuardPhase::Ready
        } else {
            GuardPhase::Waiting
        }
    }

    pub fn engagement_passed(&self) -> bool {
        self.engagement >= self.min_conversations
    }

    pub fn checks(&self) -> [GuardCheck; 2] {
        [self.engagement_check(), self.shift_check()]
    }

    fn engagement_check(&self) -> GuardCheck {
        let message = if self.engagement_passed() {
            format!(
                "{} conversations (>= {})",
                self.engagement, self.min_conversations
            )
        } else {
            format!(
                "Only {}/{} conversations",
                self.engagement, self.min_conversations
            )
        };

        GuardCheck {
            name: "Minimum Engagement".to_string(),
            passed: self.engagement_passed(),
            message,
        }
    }

    fn shift_check(&self) -> GuardCheck {
        let message = if !self.shift.measurable {
            format!(
                "Only {}/{} themes collected",
                self.theme_count, self.min_size
            )
        } else if self.shift.fired {
            format!(
                "Shift detected (distance: {:.2}): {}",
                self.shift.distance,
                self.delta.summary()
            )
        } else {
            format!(
                "No significant shift (distance: {:.2}): {}",
                self.shift.distance,
                self.delta.summary()
            )
        };

        GuardCheck {
            name: "Perspective Shift".to_string(),
            passed: self.shift.fired,
            message,
        }
    }
}

/// The two-guard report gate
///
/// Holds only configuration; every call to `evaluate` is pure.
pub struct ReportGuard<D: ShiftDetector = JaccardShiftDetector> {
    min_conversations: usize,
    detector: D,
}

impl ReportGuard<JaccardShiftDetector> {
    pub fn new(min_conversations: usize, shift_threshold: f64, min_size: usize) -> Self {
        Self {
            min_conversations,
            detector: JaccardShiftDetector::new(shift_threshold, min_size),
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(
            config.min_conversations_for_report,
            config.shift_detection_threshold,
            config.min_perspectives_for_shift_detection,
        )
    }
}

impl<D: ShiftDetector> ReportGuard<D> {
    /// Use a custom shift detector
    pub fn with_detector(min_conversations: usize, detector: D) -> Self {
        Self {
            min_conversations,
            detector,
        }
    }

    pub fn min_conversations(&self) -> usize {
        self.min_conversations
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Evaluate both guards
    ///
    /// `current_count` is the number of perspectives in the store now;
    /// `current` is the theme set extracted from them.
    pub fn evaluate(
        &self,
        current_count: usize,
        current: &ThemeSet,
        baseline: &ShiftBaseline,
    ) -> GuardDecision {
        let engagement = GuardState::since(current_count, baseline).since_last_report();
        let shift = self.detector.detect(current, &baseline.themes);
        let ready = engagement >= self.min_conversations && shift.fired;
        debug!(
            "Guard evaluated: engagement={}/{} distance={:.3} fired={} ready={}",
            engagement, self.min_conversations, shift.distance, shift.fired, ready
        );

        GuardDecision {
            ready,
            engagement,
            min_conversations: self.min_conversations,
            shift,
            min_size: self.detector.min_size(),
            current_count,
            theme_count: current.len(),
            delta: ThemeDelta::between(current, &baseline.themes),
        }
    }
}
