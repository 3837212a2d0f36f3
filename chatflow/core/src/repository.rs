//! Entity Storage
//!
//! A small async repository interface keyed by string ids, plus an
//! in-memory implementation. Forms and responses are stored through it;
//! a database-backed implementation only needs to implement [`Repository`].

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

/// Something stored by id
pub trait Entity: Clone + Send + Sync + 'static {
    /// Storage key
    fn id(&self) -> &str;
}

/// Storage failures
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// No entity with this id
    #[error("no entity with id {0}")]
    NotFound(String),

    /// An entity with this id already exists
    #[error("entity {0} already exists")]
    Conflict(String),

    /// The storage backend failed
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Async CRUD over one entity type
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Fetch by id
    async fn get(&self, id: &str) -> Result<Option<T>, RepositoryError>;

    /// Insert a new entity; fails with `Conflict` if the id is taken
    async fn create(&self, entity: T) -> Result<T, RepositoryError>;

    /// Replace an existing entity; fails with `NotFound` if absent
    async fn update(&self, entity: T) -> Result<T, RepositoryError>;

    /// Remove by id, returning whether something was removed
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Every entity matching `filter`
    async fn list(
        &self,
        filter: &(dyn for<'a> Fn(&'a T) -> bool + Send + Sync),
    ) -> Result<Vec<T>, RepositoryError>;
}

/// Repository kept in a concurrent map
///
/// Cloning shares the underlying map.
#[derive(Clone)]
pub struct InMemoryRepository<T: Entity> {
    entries: Arc<DashMap<String, T>>,
}

impl<T: Entity> InMemoryRepository<T> {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Number of stored entities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn get(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        Ok(self.entries.get(id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, entity: T) -> Result<T, RepositoryError> {
        match self.entries.entry(entity.id().to_string()) {
            Entry::Occupied(occupied) => Err(RepositoryError::Conflict(occupied.key().clone())),
            Entry::Vacant(vacant) => {
                vacant.insert(entity.clone());
                Ok(entity)
            }
        }
    }

    async fn update(&self, entity: T) -> Result<T, RepositoryError> {
        match self.entries.get_mut(entity.id()) {
            Some(mut existing) => {
                *existing = entity.clone();
                Ok(entity)
            }
            None => Err(RepositoryError::NotFound(entity.id().to_string())),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.entries.remove(id).is_some())
    }

    async fn list(
        &self,
        filter: &(dyn for<'a> Fn(&'a T) -> bool + Send + Sync),
    ) -> Result<Vec<T>, RepositoryError> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Note {
        id: String,
        body: String,
    }

    impl Note {
        fn new(id: &str, body: &str) -> Self {
            Self {
                id: id.into(),
                body: body.into(),
            }
        }
    }

    impl Entity for Note {
        fn id(&self) -> &str {
            &self.id
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let repo = InMemoryRepository::new();
        repo.create(Note::new("a", "hello")).await.unwrap();

        assert_eq!(repo.get("a").await.unwrap(), Some(Note::new("a", "hello")));
        assert_eq!(repo.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let repo = InMemoryRepository::new();
        repo.create(Note::new("a", "one")).await.unwrap();

        assert_eq!(
            repo.create(Note::new("a", "two")).await,
            Err(RepositoryError::Conflict("a".into()))
        );
        assert_eq!(repo.get("a").await.unwrap().unwrap().body, "one");
    }

    #[tokio::test]
    async fn test_update_requires_existing() {
        let repo = InMemoryRepository::new();
        assert_eq!(
            repo.update(Note::new("a", "x")).await,
            Err(RepositoryError::NotFound("a".into()))
        );

        repo.create(Note::new("a", "x")).await.unwrap();
        repo.update(Note::new("a", "y")).await.unwrap();
        assert_eq!(repo.get("a").await.unwrap().unwrap().body, "y");
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let repo = InMemoryRepository::new();
        for (id, body) in [("a", "keep"), ("b", "drop"), ("c", "keep")] {
            repo.create(Note::new(id, body)).await.unwrap();
        }

        assert!(repo.delete("b").await.unwrap());
        assert!(!repo.delete("b").await.unwrap());

        let mut kept = repo.list(&|n: &Note| n.body == "keep").await.unwrap();
        kept.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(kept, vec![Note::new("a", "keep"), Note::new("c", "keep")]);
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let repo = InMemoryRepository::new();
        let other = repo.clone();
        repo.create(Note::new("a", "x")).await.unwrap();
        assert!(other.get("a").await.unwrap().is_some());
    }
}
