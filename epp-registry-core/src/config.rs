//! Process-wide cache of per-TLD registry configuration.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::Tld;
use crate::store::{ResourceStore, StoreResult};

/// Read-through cache over the store's TLD configuration entries.
///
/// TLD config is read-mostly: every flow takes a point-in-time snapshot and
/// never observes a mid-flow change. Administrative tooling that mutates a
/// TLD must call [`TldCache::invalidate`] afterwards; the cache is never
/// invalidated implicitly.
pub struct TldCache {
    store: Arc<dyn ResourceStore>,
    cached: RwLock<Option<HashMap<String, Tld>>>,
}

impl TldCache {
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
        }
    }

    /// The configuration for one TLD, if managed.
    pub async fn get(&self, tld: &str) -> StoreResult<Option<Tld>> {
        Ok(self.snapshot().await?.get(tld).cloned())
    }

    /// A point-in-time snapshot of every managed TLD.
    pub async fn snapshot(&self) -> StoreResult<HashMap<String, Tld>> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            return Ok(cached.clone());
        }
        let mut guard = self.cached.write().await;
        // Another task may have filled the cache while we waited.
        if let Some(cached) = guard.as_ref() {
            return Ok(cached.clone());
        }
        let loaded: HashMap<String, Tld> = self
            .store
            .list_tlds()
            .await?
            .into_iter()
            .map(|tld| (tld.tld.clone(), tld))
            .collect();
        *guard = Some(loaded.clone());
        log::info!("tld cache loaded with {} entries", loaded.len());
        Ok(loaded)
    }

    /// Drops the cached snapshot; the next read goes to the store.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
        log::info!("tld cache invalidated");
    }

    /// Finds the longest managed TLD a fully-qualified name falls under.
    ///
    /// Multi-part TLDs ("co.test") are matched before their shorter
    /// prefixes, mirroring public-suffix semantics.
    pub async fn find_tld_for_name(&self, name: &str) -> StoreResult<Option<Tld>> {
        let snapshot = self.snapshot().await?;
        let labels: Vec<&str> = name.split('.').collect();
        // Longest candidate suffix first; a name is never its own TLD.
        for start in 1..labels.len() {
            let candidate = labels[start..].join(".");
            if let Some(tld) = snapshot.get(&candidate) {
                return Ok(Some(tld.clone()));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::InMemoryStore;

    use super::*;

    async fn cache_with(tlds: &[&str]) -> TldCache {
        let store = Arc::new(InMemoryStore::new());
        for tld in tlds {
            store.put_tld(Tld::new(*tld)).await.unwrap();
        }
        TldCache::new(store)
    }

    #[tokio::test]
    async fn snapshot_is_stale_until_invalidated() {
        let store = Arc::new(InMemoryStore::new());
        store.put_tld(Tld::new("tld")).await.unwrap();
        let cache = TldCache::new(store.clone());
        assert!(cache.get("tld").await.unwrap().is_some());

        store.put_tld(Tld::new("other")).await.unwrap();
        assert!(cache.get("other").await.unwrap().is_none());

        cache.invalidate().await;
        assert!(cache.get("other").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn multi_part_tld_wins_over_nothing() {
        let cache = cache_with(&["tld", "co.test"]).await;
        let found = cache.find_tld_for_name("ns1.example.co.test").await.unwrap();
        assert_eq!(found.unwrap().tld, "co.test");
        let found = cache.find_tld_for_name("ns1.example.tld").await.unwrap();
        assert_eq!(found.unwrap().tld, "tld");
        assert!(cache
            .find_tld_for_name("ns1.example.foo")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn a_tld_is_not_under_itself() {
        let cache = cache_with(&["tld"]).await;
        assert!(cache.find_tld_for_name("tld").await.unwrap().is_none());
    }
}
