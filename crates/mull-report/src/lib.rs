//! Report output for mull
//!
//! - `EvolutionLog`: one entry per published report; the latest entry is the
//!   shift baseline
//! - `ReportGenerator`: turns the current perspectives into a versioned report
//! - `ExplorationLog`: append-only JSONL trail of what each iteration did

mod evolution;
mod exploration;
mod generator;
mod markdown;

pub use evolution::{EvolutionEntry, EvolutionLog};
pub use exploration::{ExplorationEvent, ExplorationLog, ExplorationRecord};
pub use generator::{GeneratedReport, ReportGenerator, ReportRequest};
pub use markdown::{format_citation, group_by_theme, MarkdownReportGenerator, THEME_GROUPS};
