//! Fail-open helper for infrastructure side effects
//!
//! Use this for operations whose failure must not stop an iteration, such as
//! appending to the exploration event log.
//!
//! DO NOT use fail-open for:
//! - Saving perspectives (the store is the source of truth)
//! - Committing a report baseline (guard correctness)
//! - Loop state that drives the next decision

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// ```no_run
/// use mull_core::fail_open::fail_open;
/// use mull_core::Result;
///
/// async fn append_event() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let written = fail_open("exploration_log", || append_event()).await;
///     // written is None if append_event() failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}
