use crate::error::StoreError;
use crate::models::{ContentType, LearnerKey, ProgressItem, ProgressKey};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use tokio::sync::RwLock;

/// Durable review state keyed by (learner, content type, content id).
///
/// A missing row means "never reviewed"; stores are not expected to
/// pre-populate anything.
pub trait ProgressStore: Send + Sync {
    fn get(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
    ) -> impl Future<Output = Result<Option<ProgressItem>, StoreError>> + Send;

    /// Inserts or replaces the row for `(learner, item.content_type, item.content_id)`.
    fn upsert(
        &self,
        learner: &LearnerKey,
        item: &ProgressItem,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn list(
        &self,
        learner: &LearnerKey,
        content_type: Option<ContentType>,
    ) -> impl Future<Output = Result<Vec<ProgressItem>, StoreError>> + Send;

    /// Administrative delete. Returns whether a row existed.
    fn remove(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<ProgressKey, ProgressItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl ProgressStore for MemoryStore {
    async fn get(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<Option<ProgressItem>, StoreError> {
        let key = ProgressKey::new(learner, content_type, content_id);
        Ok(self.items.read().await.get(&key).cloned())
    }

    async fn upsert(&self, learner: &LearnerKey, item: &ProgressItem) -> Result<(), StoreError> {
        let key = ProgressKey::new(learner, item.content_type, &item.content_id);
        log::debug!("memory upsert {} {}:{}", learner, item.content_type, item.content_id);
        self.items.write().await.insert(key, item.clone());
        Ok(())
    }

    async fn list(
        &self,
        learner: &LearnerKey,
        content_type: Option<ContentType>,
    ) -> Result<Vec<ProgressItem>, StoreError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|(key, _)| &key.learner == learner)
            .filter(|(key, _)| content_type.map_or(true, |t| key.content_type == t))
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn remove(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<bool, StoreError> {
        let key = ProgressKey::new(learner, content_type, content_id);
        Ok(self.items.write().await.remove(&key).is_some())
    }
}

/// Local-first store with an optional remote mirror.
///
/// The local store is authoritative: its failures are returned to the
/// caller. Remote writes are best effort and only logged when they fail.
pub struct SyncStore<L, R> {
    local: L,
    remote: Option<R>,
}

impl<L: ProgressStore, R: ProgressStore> SyncStore<L, R> {
    pub fn new(local: L, remote: Option<R>) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn remote(&self) -> Option<&R> {
        self.remote.as_ref()
    }
}

impl<L: ProgressStore, R: ProgressStore> ProgressStore for SyncStore<L, R> {
    async fn get(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<Option<ProgressItem>, StoreError> {
        if let Some(item) = self.local.get(learner, content_type, content_id).await? {
            return Ok(Some(item));
        }
        match &self.remote {
            Some(remote) => match remote.get(learner, content_type, content_id).await {
                Ok(found) => Ok(found),
                Err(e) => {
                    log::warn!("remote read failed for {} {}:{}: {}", learner, content_type, content_id, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn upsert(&self, learner: &LearnerKey, item: &ProgressItem) -> Result<(), StoreError> {
        self.local.upsert(learner, item).await?;
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.upsert(learner, item).await {
                log::warn!("failed to sync {} {}:{}: {}", learner, item.content_type, item.content_id, e);
            }
        }
        Ok(())
    }

    async fn list(
        &self,
        learner: &LearnerKey,
        content_type: Option<ContentType>,
    ) -> Result<Vec<ProgressItem>, StoreError> {
        let mut merged: BTreeMap<(ContentType, String), ProgressItem> = BTreeMap::new();
        if let Some(remote) = &self.remote {
            match remote.list(learner, content_type).await {
                Ok(items) => {
                    for item in items {
                        merged.insert((item.content_type, item.content_id.clone()), item);
                    }
                }
                Err(e) => log::warn!("remote list failed for {}: {}", learner, e),
            }
        }
        for item in self.local.list(learner, content_type).await? {
            merged.insert((item.content_type, item.content_id.clone()), item);
        }
        Ok(merged.into_values().collect())
    }

    async fn remove(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<bool, StoreError> {
        let mut existed = self.local.remove(learner, content_type, content_id).await?;
        if let Some(remote) = &self.remote {
            match remote.remove(learner, content_type, content_id).await {
                Ok(found) => existed |= found,
                Err(e) => log::warn!("remote remove failed for {} {}:{}: {}", learner, content_type, content_id, e),
            }
        }
        Ok(existed)
    }
}

/// Moves everything recorded under `from` to `to`, e.g. a guest who just
/// signed in. When both learners have a row for the same item, the one with
/// more reviews stays (ties keep `to`). Returns how many rows were moved.
pub async fn merge_learner<S: ProgressStore>(
    store: &S,
    from: &LearnerKey,
    to: &LearnerKey,
) -> Result<usize, StoreError> {
    if from == to {
        return Ok(0);
    }

    let mut moved = 0;
    for item in store.list(from, None).await? {
        let existing = store.get(to, item.content_type, &item.content_id).await?;
        let keep_source = existing.map_or(true, |current| item.review_count > current.review_count);
        if keep_source {
            store.upsert(to, &item).await?;
            moved += 1;
        }
        store.remove(from, item.content_type, &item.content_id).await?;
    }

    log::info!("merged {} progress items from {} into {}", moved, from, to);
    Ok(moved)
}
