//! Durable poll storage
//!
//! Polls are persisted as one YAML document rewritten in full on every
//! mutation. The whole-collection rewrite is a deliberate choice: poll
//! volume is low and an atomic full rewrite keeps crash consistency simple.

use crate::poll::{Poll, PollResult, PollType};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// File-backed store of active poll records, keyed by poll id.
///
/// All access is serialized through a single collection-wide lock: readers
/// may run concurrently with each other, never with a writer, because the
/// backing file is one shared resource.
pub struct FilePollStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FilePollStore {
    /// Open a store at `path`, creating the parent directory and
    /// initializing a missing or unparseable file to an empty collection.
    ///
    /// # Errors
    /// Returns an error if the directory or the initial file cannot be
    /// written.
    pub async fn new(path: impl Into<PathBuf>) -> PollResult<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let store = Self {
            path,
            lock: RwLock::new(()),
        };

        match tokio::fs::read_to_string(&store.path).await {
            Ok(content) => {
                if serde_yaml::from_str::<Vec<Poll>>(&content).is_err() {
                    warn!(path = %store.path.display(), "poll storage unparseable, resetting to empty");
                    store.write_polls(&[]).await?;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %store.path.display(), "initializing empty poll storage");
                store.write_polls(&[]).await?;
            }
            Err(err) => return Err(err.into()),
        }

        Ok(store)
    }

    /// Upsert a poll by id. Visible to subsequent reads once this returns.
    ///
    /// # Errors
    /// Returns an error if the backing file cannot be read or rewritten.
    pub async fn save(&self, poll: &Poll) -> PollResult<()> {
        let _guard = self.lock.write().await;

        let mut polls = self.read_polls().await?;
        match polls.iter_mut().find(|p| p.id == poll.id) {
            Some(existing) => *existing = poll.clone(),
            None => polls.push(poll.clone()),
        }

        self.write_polls(&polls).await
    }

    /// Every currently persisted poll, in no particular order.
    ///
    /// # Errors
    /// Returns an error if the backing file cannot be read or parsed.
    pub async fn list(&self) -> PollResult<Vec<Poll>> {
        let _guard = self.lock.read().await;
        self.read_polls().await
    }

    /// Persisted polls of one type.
    ///
    /// # Errors
    /// Returns an error if the backing file cannot be read or parsed.
    pub async fn list_by_type(&self, kind: PollType) -> PollResult<Vec<Poll>> {
        let _guard = self.lock.read().await;
        let polls = self.read_polls().await?;
        Ok(polls.into_iter().filter(|p| p.kind == kind).collect())
    }

    /// Remove a poll by id. Removing an absent id is not an error.
    ///
    /// # Errors
    /// Returns an error if the backing file cannot be read or rewritten.
    pub async fn delete(&self, id: &str) -> PollResult<()> {
        let _guard = self.lock.write().await;

        let mut polls = self.read_polls().await?;
        polls.retain(|p| p.id != id);

        self.write_polls(&polls).await
    }

    /// Whether a poll id is currently persisted.
    ///
    /// # Errors
    /// Returns an error if the backing file cannot be read or parsed.
    pub async fn contains(&self, id: &str) -> PollResult<bool> {
        let _guard = self.lock.read().await;
        let polls = self.read_polls().await?;
        Ok(polls.iter().any(|p| p.id == id))
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_polls(&self) -> PollResult<Vec<Poll>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    async fn write_polls(&self, polls: &[Poll]) -> PollResult<()> {
        let yaml = serde_yaml::to_string(polls)?;
        tokio::fs::write(&self.path, yaml).await?;
        Ok(())
    }
}
