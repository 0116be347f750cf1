//! JSON-file-per-perspective store

use async_trait::async_trait;
use mull_core::{
    perspective_id, perspective_number, MullError, NewPerspective, Perspective, PerspectiveId,
    Result,
};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::PerspectiveStore;

/// Store backed by `perspective_NNN.json` files in one directory
///
/// The directory is scanned once on `open`; afterwards the in-memory index is
/// kept in step with every successful write.
pub struct JsonPerspectiveStore {
    dir: PathBuf,
    /// Sorted by numeric id suffix, which is insertion order
    perspectives: Vec<Perspective>,
    next_number: u32,
}

impl JsonPerspectiveStore {
    /// Open (and create if needed) the perspectives directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let mut loaded: Vec<(u32, Perspective)> = Vec::new();
        let mut highest = 0;
        let mut entries = tokio::fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(number) = file_number(&path) else {
                continue;
            };
            // corrupt files still reserve their number
            highest = highest.max(number);

            match load_perspective_file(&path).await {
                Ok(perspective) => loaded.push((number, perspective)),
                Err(e) => warn!("Skipping unreadable perspective {:?}: {}", path, e),
            }
        }

        loaded.sort_by_key(|(number, _)| *number);
        let next_number = highest + 1;
        let perspectives: Vec<Perspective> = loaded.into_iter().map(|(_, p)| p).collect();

        info!("Loaded {} perspectives from {:?}", perspectives.len(), dir);
        Ok(Self {
            dir,
            perspectives,
            next_number,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn file_number(path: &Path) -> Option<u32> {
    if path.extension().is_some_and(|e| e == "json") {
        perspective_number(path.file_stem()?.to_str()?)
    } else {
        None
    }
}

async fn write_perspective(file: &mut tokio::fs::File, perspective: &Perspective) -> Result<()> {
    let content = serde_json::to_string_pretty(perspective)?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

async fn load_perspective_file(path: &Path) -> Result<Perspective> {
    let content = tokio::fs::read_to_string(path).await?;
    let perspective: Perspective = serde_json::from_str(&content)?;
    Ok(perspective)
}

#[async_trait]
impl PerspectiveStore for JsonPerspectiveStore {
    async fn save(&mut self, draft: NewPerspective) -> Result<PerspectiveId> {
        draft.validate()?;

        if let Some(existing) = self.perspectives.iter().find(|p| p.duplicates(&draft)) {
            return Err(MullError::DuplicatePerspective(format!(
                "post {} by {} already saved as {}",
                draft.post_id, draft.author, existing.id
            )));
        }

        let mut perspective = draft.into_perspective(perspective_id(self.next_number));

        // create_new: never clobber a record written behind our back
        let (mut file, path) = loop {
            let path = self.dir.join(format!("{}.json", perspective.id));
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match opened {
                Ok(file) => break (file, path),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    warn!("{:?} already exists, skipping to the next id", path);
                    self.next_number += 1;
                    perspective.id = perspective_id(self.next_number);
                }
                Err(e) => return Err(e.into()),
            }
        };

        if let Err(e) = write_perspective(&mut file, &perspective).await {
            drop(file);
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove partial {:?}: {}", path, cleanup);
            }
            return Err(e);
        }

        let id = perspective.id.clone();
        debug!("Saved perspective {} from {} to {:?}", id, perspective.author, path);
        self.next_number += 1;
        self.perspectives.push(perspective);
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
