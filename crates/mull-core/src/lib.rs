//! # mull-core
//!
//! Core types for mull, a tracker that collects cited perspectives from an
//! exploring agent and decides when the collection has drifted far enough
//! from the last synthesis to warrant a new versioned report.
//!
//! ## Core Paradigm
//!
//! - Perspectives are immutable once saved
//! - Themes are normalized tags, compared as sets
//! - A report needs BOTH enough new engagement AND a thematic shift
//! - The baseline moves only after a report is confirmed written

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::{GuardConfig, LoopSettings, MullConfig, PathsConfig};
pub use error::{MullError, Result};
pub use types::*;
