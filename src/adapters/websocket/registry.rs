//! Concurrent key-value registries backing the hub.
//!
//! A [`Registry`] is a plain map behind a reader-writer lock: many
//! concurrent readers or one writer. It carries no business rules; the
//! hub actor is the only code path that writes to the room and member
//! registries, and everyone else reads snapshots.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::RwLock;

/// Map from key to entity guarded by a `RwLock`.
pub struct Registry<K, V> {
    items: RwLock<HashMap<K, V>>,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace. Returns the previous value, if any.
    pub async fn set(&self, key: K, value: V) -> Option<V> {
        self.items.write().await.insert(key, value)
    }

    pub async fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.read().await.get(key).cloned()
    }

    pub async fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.read().await.contains_key(key)
    }

    /// Remove a key. Returns the removed value, if any.
    pub async fn delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.write().await.remove(key)
    }

    /// Remove a key only if its current value satisfies `matches`.
    ///
    /// The check and the removal happen under one write lock.
    pub async fn delete_if<Q>(&self, key: &Q, matches: impl FnOnce(&V) -> bool) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut items = self.items.write().await;
        if items.get(key).is_some_and(matches) {
            items.remove(key)
        } else {
            None
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Visit every entry under the read lock.
    ///
    /// `act` must not call back into this registry.
    pub async fn for_each(&self, mut act: impl FnMut(&K, &V)) {
        let items = self.items.read().await;
        for (key, value) in items.iter() {
            act(key, value);
        }
    }

    /// Snapshot of all values.
    pub async fn values(&self) -> Vec<V> {
        self.items.read().await.values().cloned().collect()
    }
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Snapshot of all keys.
    pub async fn keys(&self) -> Vec<K> {
        self.items.read().await.keys().cloned().collect()
    }
}

impl<K, V> Default for Registry<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn set_get_delete_roundtrip() {
        let registry: Registry<String, u32> = Registry::new();

        assert_eq!(registry.set("a".to_string(), 1).await, None);
        assert_eq!(registry.set("a".to_string(), 2).await, Some(1));
        assert_eq!(registry.get("a").await, Some(2));
        assert!(registry.contains("a").await);

        assert_eq!(registry.delete("a").await, Some(2));
        assert_eq!(registry.get("a").await, None);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn delete_of_missing_key_is_noop() {
        let registry: Registry<String, u32> = Registry::new();
        registry.set("a".to_string(), 1).await;

        assert_eq!(registry.delete("b").await, None);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn delete_if_respects_predicate() {
        let registry: Registry<String, Arc<u32>> = Registry::new();
        let original = Arc::new(7);
        let impostor = Arc::new(7);
        registry.set("k".to_string(), original.clone()).await;

        assert!(registry
            .delete_if("k", |v| Arc::ptr_eq(v, &impostor))
            .await
            .is_none());
        assert_eq!(registry.len().await, 1);

        assert!(registry
            .delete_if("k", |v| Arc::ptr_eq(v, &original))
            .await
            .is_some());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn for_each_visits_every_entry() {
        let registry: Registry<u32, u32> = Registry::new();
        for i in 1..=4 {
            registry.set(i, i * 10).await;
        }

        let mut sum = 0;
        registry.for_each(|_, v| sum += v).await;
        assert_eq!(sum, 100);

        let mut keys = registry.keys().await;
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn concurrent_readers_and_writers_do_not_lose_updates() {
        let registry: Arc<Registry<u32, u32>> = Arc::new(Registry::new());

        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry.set(i, i).await;
                registry.len().await
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.len().await, 32);
    }
}
