//! Entity storage with crash-safe persistence.
//!
//! An [`EntityStore`] keeps every entity in memory. A persistent store also
//! writes each mutation to a WAL before applying it and periodically folds
//! the log into a JSON snapshot:
//!
//! ```text
//! <dir>/entities.json   last snapshot
//! <dir>/wal.log         mutations since the snapshot
//! ```

pub mod snapshot;
pub mod wal;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::entity::{Entity, EntityId};
use crate::error::{Error, Result};
use crate::search::{Candidate, SearchQuery, SearchResultItem, Searcher};
use crate::similarity::SimilarityMetric;
use crate::visibility::RelationshipCheck;

use snapshot::Snapshot;
pub use wal::SyncMode;
use wal::{Wal, WalEntry, WalEntryKind};

const SNAPSHOT_FILE: &str = "entities.json";
const WAL_FILE: &str = "wal.log";

/// Configuration for an entity store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Dimensionality of entity embeddings.
    pub dimension: usize,
    /// Similarity metric used for ranking.
    pub metric: SimilarityMetric,
    /// WAL sync mode.
    pub sync_mode: SyncMode,
}

impl StoreConfig {
    /// Creates a new config with the given dimension and metric.
    pub fn new(dimension: usize, metric: SimilarityMetric) -> Self {
        Self {
            dimension,
            metric,
            sync_mode: SyncMode::Batched,
        }
    }

    /// Sets the sync mode. Chainable.
    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }
}

struct Persistence {
    dir: PathBuf,
    wal: Mutex<Wal>,
}

/// Thread-safe store of entities.
///
/// # Example
///
/// ```no_run
/// use privmatch_core::{Entity, EntityStore, SimilarityMetric, StoreConfig};
///
/// let config = StoreConfig::new(3, SimilarityMetric::Cosine);
/// let store = EntityStore::open_or_create("./entities", config).unwrap();
///
/// let id = store
///     .insert(Entity::new("person", "Ana", "user-1").with_embedding(vec![0.1, 0.2, 0.3]))
///     .unwrap();
///
/// let ranked = store.rank(&[0.1, 0.2, 0.3], Some(5)).unwrap();
/// assert_eq!(ranked[0].entity.id(), id);
///
/// store.flush().unwrap();
/// ```
pub struct EntityStore {
    config: StoreConfig,
    entities: RwLock<HashMap<EntityId, Entity>>,
    persistence: Option<Persistence>,
}

impl EntityStore {
    /// Creates a store that lives only in memory.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self {
            config,
            entities: RwLock::new(HashMap::new()),
            persistence: None,
        }
    }

    /// Opens an existing store or creates a new one under `path`.
    ///
    /// # Errors
    ///
    /// [`Error::StoreError`] if the directory cannot be created or the
    /// snapshot was written with a different dimension, and
    /// [`Error::WalCorrupted`] if the log fails its checksum.
    pub fn open_or_create<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let dir = path.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .map_err(|e| Error::StoreError(format!("create dir failed: {}", e)))?;
        }

        let mut entities = HashMap::new();
        if let Some(snapshot) = Snapshot::load(&dir.join(SNAPSHOT_FILE))? {
            if snapshot.dimension != config.dimension {
                return Err(Error::StoreError(format!(
                    "dimension mismatch: store has {}, config has {}",
                    snapshot.dimension, config.dimension
                )));
            }
            entities.extend(snapshot.entities.into_iter().map(|e| (e.id(), e)));
        }
        let from_snapshot = entities.len();

        let wal_path = dir.join(WAL_FILE);
        let replayed = Self::replay(&wal_path, &mut entities)?;
        let wal = Wal::open(&wal_path, config.sync_mode)?;

        info!(
            path = %dir.display(),
            from_snapshot,
            replayed,
            entities = entities.len(),
            "opened entity store"
        );

        Ok(Self {
            config,
            entities: RwLock::new(entities),
            persistence: Some(Persistence {
                dir,
                wal: Mutex::new(wal),
            }),
        })
    }

    fn replay(wal_path: &Path, entities: &mut HashMap<EntityId, Entity>) -> Result<usize> {
        let log = Wal::recover(wal_path)?;
        let count = log.len();
        for entry in log {
            match entry.kind {
                WalEntryKind::Upsert => {
                    if let Some(entity) = entry.entity {
                        entities.insert(entity.id(), entity);
                    }
                }
                WalEntryKind::Delete => {
                    if let Some(id) = entry.id {
                        entities.remove(&id);
                    }
                }
                WalEntryKind::Checkpoint => {}
            }
        }
        Ok(count)
    }

    fn log(&self, entry: &WalEntry) -> Result<()> {
        if let Some(persistence) = &self.persistence {
            persistence.wal.lock().append(entry)?;
        }
        Ok(())
    }

    fn validate(&self, entity: &Entity) -> Result<()> {
        if let Some(embedding) = entity.embedding() {
            if embedding.is_empty() {
                return Err(Error::EmptyVector);
            }
            if embedding.dimension() != self.config.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.config.dimension,
                    got: embedding.dimension(),
                });
            }
        }
        Ok(())
    }

    /// Inserts a new entity and returns its ID.
    pub fn insert(&self, entity: Entity) -> Result<EntityId> {
        self.validate(&entity)?;
        let id = entity.id();

        let mut entities = self.entities.write();
        if entities.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        self.log(&WalEntry::upsert(entity.clone()))?;
        entities.insert(id, entity);

        debug!(%id, "inserted entity");
        Ok(id)
    }

    /// Replaces an existing entity.
    pub fn update(&self, entity: Entity) -> Result<()> {
        self.validate(&entity)?;
        let id = entity.id();

        let mut entities = self.entities.write();
        if !entities.contains_key(&id) {
            return Err(Error::NotFound(id));
        }
        self.log(&WalEntry::upsert(entity.clone()))?;
        entities.insert(id, entity);
        Ok(())
    }

    /// Applies `f` to a copy of the entity and stores the result if `f`
    /// succeeds. Returns the updated entity.
    pub fn modify<F>(&self, id: EntityId, f: F) -> Result<Entity>
    where
        F: FnOnce(&mut Entity) -> Result<()>,
    {
        let mut entities = self.entities.write();
        let mut updated = entities.get(&id).cloned().ok_or(Error::NotFound(id))?;
        f(&mut updated)?;
        self.validate(&updated)?;

        self.log(&WalEntry::upsert(updated.clone()))?;
        entities.insert(id, updated.clone());
        Ok(updated)
    }

    /// Returns a copy of the entity.
    pub fn get(&self, id: EntityId) -> Option<Entity> {
        self.entities.read().get(&id).cloned()
    }

    /// Deletes an entity. Returns false if it did not exist.
    pub fn delete(&self, id: EntityId) -> Result<bool> {
        let mut entities = self.entities.write();
        if !entities.contains_key(&id) {
            return Ok(false);
        }
        self.log(&WalEntry::delete(id))?;
        entities.remove(&id);

        debug!(%id, "deleted entity");
        Ok(true)
    }

    /// Returns every entity owned by `user_id`, oldest first.
    pub fn list_by_owner(&self, user_id: &str) -> Vec<Entity> {
        let mut owned: Vec<Entity> = self
            .entities
            .read()
            .values()
            .filter(|e| e.is_owned_by(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then(a.id().cmp(&b.id())));
        owned
    }

    /// Returns the number of entities.
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns true if the store holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Directory backing the store, None for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.persistence.as_ref().map(|p| p.dir.as_path())
    }

    /// Scores every searchable entity with an embedding against `query`,
    /// best first. Ties are ordered by creation time.
    pub fn rank(&self, query: &[f32], limit: Option<usize>) -> Result<Vec<Candidate>> {
        if query.is_empty() {
            return Err(Error::EmptyVector);
        }
        if query.len() != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                got: query.len(),
            });
        }

        let metric = self.config.metric;
        let entities = self.entities.read();
        let mut ranked: Vec<Candidate> = entities
            .par_iter()
            .filter(|(_, e)| e.is_searchable())
            .filter_map(|(_, e)| {
                let embedding = e.embedding()?;
                Some(Candidate::new(e.clone(), metric.score(query, embedding.as_slice())))
            })
            .collect();
        drop(entities);

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.entity.created_at().cmp(&b.entity.created_at()))
                .then(a.entity.id().cmp(&b.entity.id()))
        });
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }
        Ok(ranked)
    }

    /// Ranks all entities against the query embedding, then filters and
    /// redacts them with `searcher`.
    pub fn search<R: RelationshipCheck>(
        &self,
        searcher: &Searcher<R>,
        query: &SearchQuery,
    ) -> Result<Vec<SearchResultItem>> {
        let candidates = self.rank(&query.embedding, None)?;
        Ok(searcher.search(candidates, query))
    }

    /// Writes a snapshot and truncates the WAL. No-op for in-memory stores.
    pub fn flush(&self) -> Result<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };

        // Lock order is entities then WAL, same as the writers. The read guard
        // keeps writers out between snapshot and truncate.
        let guard = self.entities.read();
        let mut wal = persistence.wal.lock();
        let entities: Vec<Entity> = guard.values().cloned().collect();
        let count = entities.len();

        Snapshot {
            dimension: self.config.dimension,
            metric: self.config.metric,
            entities,
        }
        .save(&persistence.dir.join(SNAPSHOT_FILE))?;
        wal.checkpoint()?;

        info!(entities = count, "flushed entity store");
        Ok(())
    }
}

#[cfg(feature = "async")]
mod async_api {
    use super::*;
    use std::sync::Arc;

    fn join_error(e: tokio::task::JoinError) -> Error {
        Error::StoreError(format!("spawn_blocking failed: {}", e))
    }

    /// Async wrapper for [`EntityStore`].
    ///
    /// Every call runs on tokio's blocking pool.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use privmatch_core::{AsyncEntityStore, Entity, SimilarityMetric, StoreConfig};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let config = StoreConfig::new(384, SimilarityMetric::Cosine);
    ///     let store = AsyncEntityStore::open_or_create("./entities", config).await.unwrap();
    ///     store.insert(Entity::new("person", "Ana", "user-1")).await.unwrap();
    /// }
    /// ```
    #[derive(Clone)]
    pub struct AsyncEntityStore {
        inner: Arc<EntityStore>,
    }

    impl AsyncEntityStore {
        /// Opens or creates a store asynchronously.
        pub async fn open_or_create<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
            let path = path.as_ref().to_path_buf();
            let store = tokio::task::spawn_blocking(move || EntityStore::open_or_create(path, config))
                .await
                .map_err(join_error)??;
            Ok(Self::from_sync(store))
        }

        /// Wraps an existing store.
        pub fn from_sync(store: EntityStore) -> Self {
            Self {
                inner: Arc::new(store),
            }
        }

        pub async fn insert(&self, entity: Entity) -> Result<EntityId> {
            let inner = Arc::clone(&self.inner);
            tokio::task::spawn_blocking(move || inner.insert(entity))
                .await
                .map_err(join_error)?
        }

        pub async fn update(&self, entity: Entity) -> Result<()> {
            let inner = Arc::clone(&self.inner);
            tokio::task::spawn_blocking(move || inner.update(entity))
                .await
                .map_err(join_error)?
        }

        pub async fn modify<F>(&self, id: EntityId, f: F) -> Result<Entity>
        where
            F: FnOnce(&mut Entity) -> Result<()> + Send + 'static,
        {
            let inner = Arc::clone(&self.inner);
            tokio::task::spawn_blocking(move || inner.modify(id, f))
                .await
                .map_err(join_error)?
        }

        pub async fn get(&self, id: EntityId) -> Result<Option<Entity>> {
            let inner = Arc::clone(&self.inner);
            tokio::task::spawn_blocking(move || inner.get(id))
                .await
                .map_err(join_error)
        }

        pub async fn delete(&self, id: EntityId) -> Result<bool> {
            let inner = Arc::clone(&self.inner);
            tokio::task::spawn_blocking(move || inner.delete(id))
                .await
                .map_err(join_error)?
        }

        pub async fn list_by_owner(&self, user_id: String) -> Result<Vec<Entity>> {
            let inner = Arc::clone(&self.inner);
            tokio::task::spawn_blocking(move || inner.list_by_owner(&user_id))
                .await
                .map_err(join_error)
        }

        /// Runs a full search on the blocking pool.
        pub async fn search<R>(
            &self,
            searcher: Arc<Searcher<R>>,
            query: SearchQuery,
        ) -> Result<Vec<SearchResultItem>>
        where
            R: RelationshipCheck + 'static,
        {
            let inner = Arc::clone(&self.inner);
            tokio::task::spawn_blocking(move || inner.search(&searcher, &query))
                .await
                .map_err(join_error)?
        }

        pub fn len(&self) -> usize {
            self.inner.len()
        }

        pub fn is_empty(&self) -> bool {
            self.inner.is_empty()
        }

        pub async fn flush(&self) -> Result<()> {
            let inner = Arc::clone(&self.inner);
            tokio::task::spawn_blocking(move || inner.flush())
                .await
                .map_err(join_error)?
        }

        /// Returns the wrapped synchronous store.
        pub fn inner(&self) -> &EntityStore {
            &self.inner
        }
    }
}

#[cfg(feature = "async")]
pub use async_api::AsyncEntityStore;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attributes;
    use crate::filter::FilterExpression;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_store_path() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir()
            .join("privmatch_test_store")
            .join(format!("store_{}_{}", std::process::id(), id));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn config() -> StoreConfig {
        StoreConfig::new(3, SimilarityMetric::Cosine).with_sync_mode(SyncMode::Immediate)
    }

    fn entity(owner: &str, embedding: Vec<f32>) -> Entity {
        Entity::new("person", "someone", owner).with_embedding(embedding)
    }

    #[test]
    fn test_store_insert_and_get() {
        let store = EntityStore::in_memory(config());
        let e = entity("u1", vec![1.0, 0.0, 0.0])
            .with_attributes(Attributes::new().with_field("city", "Lisbon"));
        let id = store.insert(e.clone()).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id), Some(e));
        assert!(store.path().is_none());
    }

    #[test]
    fn test_store_rejects_duplicates_and_bad_embeddings() {
        let store = EntityStore::in_memory(config());
        let e = entity("u1", vec![1.0, 0.0, 0.0]);
        store.insert(e.clone()).unwrap();
        assert!(matches!(store.insert(e), Err(Error::DuplicateId(_))));

        let wrong = entity("u1", vec![1.0, 0.0]);
        assert!(matches!(
            store.insert(wrong),
            Err(Error::DimensionMismatch { expected: 3, got: 2 })
        ));
        assert!(matches!(
            store.insert(entity("u1", vec![])),
            Err(Error::EmptyVector)
        ));
    }

    #[test]
    fn test_store_update_and_modify() {
        let store = EntityStore::in_memory(config());
        let e = entity("u1", vec![1.0, 0.0, 0.0]);
        let id = store.insert(e.clone()).unwrap();

        let mut changed = e.clone();
        changed.set_name("renamed");
        store.update(changed).unwrap();
        assert_eq!(store.get(id).unwrap().name(), "renamed");

        let updated = store
            .modify(id, |e| {
                e.set_attribute("remote", true);
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.attributes().get_bool("remote"), Some(true));

        // A failing closure leaves the entity untouched.
        let result = store.modify(id, |e| {
            e.set_attribute("remote", false);
            Err(Error::InvalidRequest("nope".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.get(id).unwrap().attributes().get_bool("remote"), Some(true));

        let missing = Entity::new("person", "x", "u1");
        assert!(matches!(store.update(missing), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_store_delete() {
        let store = EntityStore::in_memory(config());
        let id = store.insert(entity("u1", vec![1.0, 0.0, 0.0])).unwrap();

        assert!(store.delete(id).unwrap());
        assert!(!store.delete(id).unwrap());
        assert!(store.is_empty());
        assert!(store.get(id).is_none());
    }

    #[test]
    fn test_store_list_by_owner() {
        let store = EntityStore::in_memory(config());
        let first = store.insert(entity("u1", vec![1.0, 0.0, 0.0])).unwrap();
        store.insert(entity("u2", vec![1.0, 0.0, 0.0])).unwrap();
        let second = store.insert(Entity::new("job", "no embedding", "u1")).unwrap();

        let ids: Vec<_> = store.list_by_owner("u1").iter().map(Entity::id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first) && ids.contains(&second));
        assert!(store.list_by_owner("nobody").is_empty());
    }

    #[test]
    fn test_store_rank() {
        let store = EntityStore::in_memory(config());
        let near = store.insert(entity("u1", vec![1.0, 0.0, 0.0])).unwrap();
        let mid = store.insert(entity("u2", vec![1.0, 1.0, 0.0])).unwrap();
        store.insert(entity("u3", vec![0.0, 0.0, 1.0])).unwrap();
        store
            .insert(entity("u4", vec![1.0, 0.0, 0.0]).with_searchable(false))
            .unwrap();
        store.insert(Entity::new("person", "no vector", "u5")).unwrap();

        let ranked = store.rank(&[1.0, 0.0, 0.0], None).unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].entity.id(), near);
        assert_eq!(ranked[1].entity.id(), mid);
        assert!(ranked[0].score >= ranked[1].score && ranked[1].score >= ranked[2].score);

        assert_eq!(store.rank(&[1.0, 0.0, 0.0], Some(1)).unwrap().len(), 1);
        assert!(matches!(store.rank(&[], None), Err(Error::EmptyVector)));
        assert!(matches!(
            store.rank(&[1.0], None),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_store_search_filters_before_limit() {
        let store = EntityStore::in_memory(config());
        store
            .insert(
                entity("u1", vec![1.0, 0.0, 0.0])
                    .with_attributes(Attributes::new().with_field("remote", false)),
            )
            .unwrap();
        let remote = store
            .insert(
                entity("u2", vec![0.5, 0.5, 0.0])
                    .with_attributes(Attributes::new().with_field("remote", true)),
            )
            .unwrap();

        let query = SearchQuery::new(vec![1.0, 0.0, 0.0])
            .with_filter(FilterExpression::field("remote").is_true())
            .with_limit(1);
        let results = store.search(&Searcher::new(), &query).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity_id, remote);
    }

    #[test]
    fn test_store_persistence() {
        let path = temp_store_path();
        let e = entity("u1", vec![1.0, 2.0, 3.0]);

        {
            let store = EntityStore::open_or_create(&path, config()).unwrap();
            store.insert(e.clone()).unwrap();
            store.insert(entity("u2", vec![4.0, 5.0, 6.0])).unwrap();
            store.flush().unwrap();
        }

        {
            let store = EntityStore::open_or_create(&path, config()).unwrap();
            assert_eq!(store.len(), 2);
            assert_eq!(store.get(e.id()), Some(e));
            assert_eq!(store.path(), Some(path.as_path()));
        }

        let _ = fs::remove_dir_all(&path);
    }

    #[test]
    fn test_store_recovery_after_crash() {
        let path = temp_store_path();

        // No flush: state lives only in the WAL.
        let deleted = {
            let store = EntityStore::open_or_create(&path, config()).unwrap();
            store.insert(entity("u1", vec![1.0, 2.0, 3.0])).unwrap();
            let id = store.insert(entity("u2", vec![4.0, 5.0, 6.0])).unwrap();
            store.insert(entity("u3", vec![7.0, 8.0, 9.0])).unwrap();
            store.delete(id).unwrap();
            id
        };

        {
            let store = EntityStore::open_or_create(&path, config()).unwrap();
            assert_eq!(store.len(), 2);
            assert!(store.get(deleted).is_none());
        }

        let _ = fs::remove_dir_all(&path);
    }

    #[test]
    fn test_store_reopen_after_torn_wal_tail() {
        use std::io::Write;

        let path = temp_store_path();
        {
            let store = EntityStore::open_or_create(&path, config()).unwrap();
            store.insert(entity("u1", vec![1.0, 0.0, 0.0])).unwrap();
        }

        // Crash mid-append: the header claims 64 bytes, only 3 made it to disk.
        {
            let mut file = fs::OpenOptions::new()
                .append(true)
                .open(path.join(WAL_FILE))
                .unwrap();
            file.write_all(&0u32.to_le_bytes()).unwrap();
            file.write_all(&64u32.to_le_bytes()).unwrap();
            file.write_all(b"abc").unwrap();
        }

        {
            let store = EntityStore::open_or_create(&path, config()).unwrap();
            assert_eq!(store.len(), 1);
            store.insert(entity("u2", vec![0.0, 1.0, 0.0])).unwrap();
        }

        let store = EntityStore::open_or_create(&path, config()).unwrap();
        assert_eq!(store.len(), 2);

        let _ = fs::remove_dir_all(&path);
    }

    #[test]
    fn test_store_concurrent_flush_and_insert() {
        use std::sync::{mpsc, Arc};
        use std::thread;
        use std::time::Duration;

        let path = temp_store_path();
        let store = Arc::new(EntityStore::open_or_create(&path, config()).unwrap());

        let mut handles = Vec::new();
        {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..200 {
                    store.flush().unwrap();
                }
            }));
        }
        for t in 0..3 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..500 {
                    let owner = format!("u{}-{}", t, i);
                    store.insert(entity(&owner, vec![1.0, 0.0, 0.0])).unwrap();
                }
            }));
        }

        // A lock-order inversion would hang the workers; fail instead.
        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            for handle in handles {
                handle.join().unwrap();
            }
            let _ = done_tx.send(());
        });
        done_rx
            .recv_timeout(Duration::from_secs(60))
            .expect("flush and insert deadlocked");

        assert_eq!(store.len(), 1500);
        store.flush().unwrap();
        drop(store);

        let reopened = EntityStore::open_or_create(&path, config()).unwrap();
        assert_eq!(reopened.len(), 1500);

        let _ = fs::remove_dir_all(&path);
    }

    #[test]
    fn test_store_dimension_change_rejected() {
        let path = temp_store_path();
        {
            let store = EntityStore::open_or_create(&path, config()).unwrap();
            store.flush().unwrap();
        }

        let other = StoreConfig::new(4, SimilarityMetric::Cosine);
        assert!(matches!(
            EntityStore::open_or_create(&path, other),
            Err(Error::StoreError(_))
        ));

        let _ = fs::remove_dir_all(&path);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_store() {
        use std::sync::Arc;

        let store = AsyncEntityStore::from_sync(EntityStore::in_memory(config()));
        let id = store
            .insert(entity("u1", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        let results = store
            .search(Arc::new(Searcher::new()), SearchQuery::new(vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();
        assert_eq!(results[0].entity_id, id);

        assert!(store.delete(id).await.unwrap());
        assert!(store.get(id).await.unwrap().is_none());
    }
}
