//! # mull-drift
//!
//! Decides when collected perspectives have drifted enough to deserve a new report.
//!
//! This crate provides:
//! - Theme extraction (perspectives -> normalized theme set)
//! - Shift detection (Jaccard distance against the last report's themes)
//! - The two-guard report gate (engagement AND shift)
//! - A pure phase machine for WAITING -> READY -> WAITING
//!
//! Everything here is synchronous and free of I/O. Persisting the baseline is
//! the caller's job, and only after a report is confirmed written.

mod guard;
mod phase;
mod shift;
mod themes;

pub use guard::{GuardCheck, GuardDecision, GuardState, ReportGuard, ShiftBaseline};
pub use phase::{transition, GuardAction, GuardEvent, GuardPhase};
pub use shift::{
    detect_shift, jaccard_distance, JaccardShiftDetector, ShiftDetector, ShiftResult, ThemeDelta,
};
pub use themes::{
    extract_themes, normalize_theme, theme_counts, KeyIdeaExtractor, ThemeExtractor, ThemeSet,
    VocabularyExtractor, PHILOSOPHICAL_VOCABULARY,
};
