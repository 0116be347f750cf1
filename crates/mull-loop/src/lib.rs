//! Iteration driver for mull
//!
//! `ReportCycle` runs one guard evaluation and, when the guard is READY, one
//! report generation. `run_loop` repeats cycles until interrupted.

mod cycle;
mod runner;
mod state;

pub use cycle::{CycleOutcome, ReportCycle};
pub use runner::{run_loop, LoopSummary, StopReason};
pub use state::{load_state, save_state, LoopState};
