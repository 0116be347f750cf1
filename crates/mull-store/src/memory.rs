//! In-memory perspective store

use async_trait::async_trait;
use mull_core::{perspective_id, MullError, NewPerspective, Perspective, PerspectiveId, Result};
use tracing::debug;

use crate::PerspectiveStore;

/// Vec-backed store; ids are assigned sequentially from 1
#[derive(Debug, Default)]
pub struct MemoryPerspectiveStore {
    perspectives: Vec<Perspective>,
}

impl MemoryPerspectiveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PerspectiveStore for MemoryPerspectiveStore {
    async fn save(&mut self, draft: NewPerspective) -> Result<PerspectiveId> {
        draft.validate()?;

        if let Some(existing) = self.perspectives.iter().find(|p| p.duplicates(&draft)) {
            return Err(MullError::DuplicatePerspective(format!(
                "post {} by {} already saved as {}",
                draft.post_id, draft.author, existing.id
            )));
        }

        let id = perspective_id(self.perspectives.len() as u32 + 1);
        debug!("Saving perspective {} in memory", id);
        self.perspectives.push(draft.into_perspective(id.clone()));
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<Perspective>> {
        Ok(self.perspectives.clone())
    }

    async fn get(&self, id: &str) -> Result<Perspective> {
        self.perspectives
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| MullError::PerspectiveNotFound(id.to_string()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.perspectives.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(post: &str, author: &str, quote: &str) -> NewPerspective {
        NewPerspective::new(post, author, quote)
            .with_submolt("/m/existence")
            .with_timestamp("2026-02-01T09:30:00Z")
            .with_key_ideas(["memory"])
    }

    #[tokio::test]
    async fn test_save_assigns_sequential_ids() {
        let mut store = MemoryPerspectiveStore::new();
        let a = store.save(draft("mb_1", "Nyx", "first")).await.unwrap();
        let b = store.save(draft("mb_2", "Nyx", "second")).await.unwrap();
        assert_eq!(a, "perspective_001");
        assert_eq!(b, "perspective_002");

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].direct_quote, "first");
        assert_eq!(listed[1].direct_quote, "second");
    }

    #[tokio::test]
    async fn test_duplicate_rejected_without_growing() {
        let mut store = MemoryPerspectiveStore::new();
        store.save(draft("mb_1", "Nyx", "first")).await.unwrap();

        let err = store
            .save(draft("mb_1", "Nyx", "edited wording"))
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get("perspective_001").await.unwrap().direct_quote, "first");
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected() {
        let mut store = MemoryPerspectiveStore::new();
        let err = store
            .save(NewPerspective::new("mb_1", "Nyx", "no provenance"))
            .await
            .unwrap_err();
        assert!(matches!(err, MullError::InvalidPerspective(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryPerspectiveStore::new();
        let err = store.get("perspective_404").await.unwrap_err();
        assert!(matches!(err, MullError::PerspectiveNotFound(_)));
    }
}
