//! # mull-store
//!
//! Append-only storage for collected perspectives.
//!
//! This crate provides:
//! - The `PerspectiveStore` boundary the drift subsystem consumes
//! - A JSON-file-per-perspective store under `workspace/perspectives/`
//! - An in-memory store for tests and dry runs

mod json_dir;
mod memory;
mod traits;

pub use json_dir::JsonPerspectiveStore;
pub use memory::MemoryPerspectiveStore;
pub use traits::PerspectiveStore;
