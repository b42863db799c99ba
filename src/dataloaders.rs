//! Request-scoped cached loading of order relations
//!
//! A [`DataLoader`] caches customers and products within one request, so
//! orders sharing a customer or product read it from the store once. Each
//! `load`/`load_many` call fetches only the keys it has not seen yet; keys
//! are not collected across resolvers before fetching.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::model::{Customer, Product};
use crate::store::Store;
use crate::Result;

/// Batch loader trait for loading multiple items at once
#[async_trait]
pub trait BatchLoader<K, V>: Send + Sync
where
    K: Send + Sync + Clone + Eq + Hash,
    V: Send + Sync + Clone,
{
    /// Load all items for `keys` in one store call; unknown keys are absent from the map.
    async fn load_batch(&self, keys: &[K]) -> Result<HashMap<K, V>>;
}

/// DataLoader with a request-scoped cache
pub struct DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    loader: Arc<L>,
    cache: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V, L> DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    pub fn new(loader: L) -> Self {
        Self {
            loader: Arc::new(loader),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Load a single item by key
    pub async fn load(&self, key: K) -> Result<Option<V>> {
        let mut found = self.load_many(std::slice::from_ref(&key)).await?;
        Ok(found.remove(&key))
    }

    /// Load several items, fetching only the keys missing from the cache.
    ///
    /// The cache lock is held across the fetch so concurrent resolvers in
    /// the same request do not load the same key twice.
    pub async fn load_many(&self, keys: &[K]) -> Result<HashMap<K, V>> {
        let mut cache = self.cache.lock().await;
        let mut result = HashMap::with_capacity(keys.len());
        let mut uncached_keys = Vec::new();

        for key in keys {
            match cache.get(key) {
                Some(value) => {
                    result.insert(key.clone(), value.clone());
                }
                None if !uncached_keys.contains(key) => uncached_keys.push(key.clone()),
                None => {}
            }
        }

        if !uncached_keys.is_empty() {
            let batch = self.loader.load_batch(&uncached_keys).await?;
            for (k, v) in batch {
                cache.insert(k.clone(), v.clone());
                result.insert(k, v);
            }
        }

        Ok(result)
    }
}

impl<K, V, L> Clone for DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            cache: self.cache.clone(),
        }
    }
}

/// Loads customers by id
pub struct CustomerLoader {
    store: Arc<dyn Store>,
}

#[async_trait]
impl BatchLoader<u64, Customer> for CustomerLoader {
    async fn load_batch(&self, keys: &[u64]) -> Result<HashMap<u64, Customer>> {
        tracing::debug!(count = keys.len(), "batch loading customers");
        let customers = self.store.customers_by_ids(keys).await?;
        Ok(customers.into_iter().map(|c| (c.id, c)).collect())
    }
}

/// Loads products by id
pub struct ProductLoader {
    store: Arc<dyn Store>,
}

#[async_trait]
impl BatchLoader<u64, Product> for ProductLoader {
    async fn load_batch(&self, keys: &[u64]) -> Result<HashMap<u64, Product>> {
        tracing::debug!(count = keys.len(), "batch loading products");
        let products = self.store.products_by_ids(keys).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }
}

/// Per-request loaders, attached to each GraphQL request
#[derive(Clone)]
pub struct Loaders {
    pub customers: DataLoader<u64, Customer, CustomerLoader>,
    pub products: DataLoader<u64, Product, ProductLoader>,
}

impl Loaders {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            customers: DataLoader::new(CustomerLoader {
                store: store.clone(),
            }),
            products: DataLoader::new(ProductLoader { store }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::assert_ok;

    #[derive(Default)]
    struct CountingLoader {
        calls: AtomicUsize,
        keys_seen: AtomicUsize,
    }

    #[async_trait]
    impl BatchLoader<u64, String> for Arc<CountingLoader> {
        async fn load_batch(&self, keys: &[u64]) -> Result<HashMap<u64, String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.keys_seen.fetch_add(keys.len(), Ordering::SeqCst);
            Ok(keys
                .iter()
                .filter(|k| **k != 0)
                .map(|k| (*k, format!("value-{}", k)))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_dataloader_single_load() {
        let loader = DataLoader::new(Arc::new(CountingLoader::default()));
        let value = assert_ok!(loader.load(1).await);
        assert_eq!(value, Some("value-1".to_string()));
        assert_eq!(assert_ok!(loader.load(0).await), None);
    }

    #[tokio::test]
    async fn test_dataloader_caches_and_dedupes() {
        let counter = Arc::new(CountingLoader::default());
        let loader = DataLoader::new(counter.clone());

        let first = assert_ok!(loader.load_many(&[1, 2, 2, 3]).await);
        assert_eq!(first.len(), 3);

        let second = assert_ok!(loader.load_many(&[2, 3, 4]).await);
        assert_eq!(second.get(&4), Some(&"value-4".to_string()));

        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(counter.keys_seen.load(Ordering::SeqCst), 4);
    }
}
