//! Store boundary consumed by the report cycle

use async_trait::async_trait;
use mull_core::{NewPerspective, Perspective, PerspectiveId, Result};

/// Append-only collection of perspectives.
///
/// Implementations must validate drafts before checking for duplicates, reject
/// duplicates with `MullError::DuplicatePerspective` instead of overwriting,
/// and hand out records in insertion order.
#[async_trait]
pub trait PerspectiveStore: Send + Sync {
    /// Save a draft, returning the newly assigned id
    async fn save(&mut self, draft: NewPerspective) -> Result<PerspectiveId>;

    /// All perspectives in insertion order
    async fn list(&self) -> Result<Vec<Perspective>>;

    /// Look up one perspective, `MullError::PerspectiveNotFound` if absent
    async fn get(&self, id: &str) -> Result<Perspective>;

    /// Number of saved perspectives
    async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }
}
