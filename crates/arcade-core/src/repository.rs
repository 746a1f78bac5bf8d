//! Repository implementations
//!
//! Provides two stores for deployed artifacts:
//! - `InMemoryRepository`: concurrent map, lost on exit
//! - `JsonFileRepository`: single JSON document rewritten on every change

use crate::error::RepositoryError;
use crate::ports::{rank, PersistedArtifact, Repository};
use crate::types::ArtifactId;
use arcade_artifact::Artifact;
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// In-process repository
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    entries: DashMap<ArtifactId, PersistedArtifact>,
}

impl InMemoryRepository {
    /// Create an empty repository
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn save(&self, artifact: Artifact) -> Result<PersistedArtifact, RepositoryError> {
        let fingerprint = artifact.fingerprint();
        if let Some(mut existing) = self
            .entries
            .iter_mut()
            .find(|e| e.artifact.fingerprint() == fingerprint)
        {
            existing.likes += 1;
            tracing::debug!(id = %existing.id, "Artifact already stored, counted as like");
            return Ok(existing.clone());
        }

        let persisted = PersistedArtifact::new(artifact);
        self.entries.insert(persisted.id, persisted.clone());
        tracing::debug!(id = %persisted.id, "Artifact saved");
        Ok(persisted)
    }

    async fn get_all(&self) -> Result<Vec<PersistedArtifact>, RepositoryError> {
        let mut all: Vec<_> = self.entries.iter().map(|e| e.value().clone()).collect();
        rank(&mut all);
        Ok(all)
    }

    async fn like(&self, id: ArtifactId) -> Result<(), RepositoryError> {
        let mut entry = self.entries.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        entry.likes += 1;
        Ok(())
    }
}

/// Repository persisted as one JSON array on disk.
///
/// A missing file is an empty repository. An unreadable file lists as
/// empty but is never overwritten: `save` and `like` fail instead.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Open (lazily) a repository at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<PersistedArtifact>, RepositoryError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn store(&self, entries: &[PersistedArtifact]) -> Result<(), RepositoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entries)?;

        // Atomic write: .tmp then rename
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Repository for JsonFileRepository {
    async fn save(&self, artifact: Artifact) -> Result<PersistedArtifact, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;

        let fingerprint = artifact.fingerprint();
        let persisted = match entries
            .iter_mut()
            .find(|e| e.artifact.fingerprint() == fingerprint)
        {
            Some(existing) => {
                existing.likes += 1;
                existing.clone()
            }
            None => {
                let persisted = PersistedArtifact::new(artifact);
                entries.push(persisted.clone());
                persisted
            }
        };

        self.store(&entries).await?;
        Ok(persisted)
    }

    async fn get_all(&self) -> Result<Vec<PersistedArtifact>, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await.unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), "Cannot read store, listing nothing: {}", err);
            Vec::new()
        });
        rank(&mut entries);
        Ok(entries)
    }

    async fn like(&self, id: ArtifactId) -> Result<(), RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(RepositoryError::NotFound(id))?;
        entry.likes += 1;
        self.store(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn artifact(title: &str) -> Artifact {
        Artifact::new(title, "", "scratch.score = 0;", "scratch.score += 1;")
    }

    #[tokio::test]
    async fn ranks_by_likes() {
        let repo = InMemoryRepository::new();
        let a = repo.save(artifact("A")).await.unwrap();
        let b = repo.save(artifact("B")).await.unwrap();
        repo.like(a.id).await.unwrap();
        repo.like(a.id).await.unwrap();
        repo.like(b.id).await.unwrap();

        let all = repo.get_all().await.unwrap();
        let titles: Vec<_> = all.iter().map(|p| p.artifact.title()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(all[0].likes, 2);
    }

    #[tokio::test]
    async fn resave_counts_as_like() {
        let repo = InMemoryRepository::new();
        let first = repo.save(artifact("A")).await.unwrap();
        let again = repo.save(artifact("A")).await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.likes, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn unknown_like_is_not_found() {
        let repo = InMemoryRepository::new();
        let id = ArtifactId::new();
        assert!(matches!(repo.like(id).await, Err(RepositoryError::NotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn file_repository_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("artifacts.json");

        let repo = JsonFileRepository::new(&path);
        assert!(repo.get_all().await.unwrap().is_empty());
        let saved = repo.save(artifact("A")).await.unwrap();
        repo.like(saved.id).await.unwrap();

        let reopened = JsonFileRepository::new(&path);
        let all = reopened.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, saved.id);
        assert_eq!(all[0].likes, 1);
    }

    #[tokio::test]
    async fn unreadable_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let repo = JsonFileRepository::new(&path);
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn truncated_store_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts.json");
        let repo = JsonFileRepository::new(&path);
        let a = repo.save(artifact("A")).await.unwrap();
        repo.save(artifact("B")).await.unwrap();
        repo.save(artifact("C")).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        tokio::fs::write(&path, &text[..text.len() - 3]).await.unwrap();

        assert!(matches!(
            repo.save(artifact("D")).await,
            Err(RepositoryError::Serialization(_))
        ));
        assert!(matches!(
            repo.like(a.id).await,
            Err(RepositoryError::Serialization(_))
        ));

        tokio::fs::write(&path, &text).await.unwrap();
        let titles: Vec<_> = repo
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.artifact.title().to_string())
            .collect();
        assert_eq!(titles.len(), 3);
        assert!(!titles.contains(&"D".to_string()));
    }

    #[tokio::test]
    async fn store_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts.json");
        let repo = JsonFileRepository::new(&path);
        repo.save(artifact("A")).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }
}
