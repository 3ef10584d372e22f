// Single-flight async cache on top of DashMap
use crate::domain::error::MistwarError;
use crate::domain::traits::Release;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Settled outcome of a producer call, shared by every waiter.
pub type CacheResult<V> = Result<V, Arc<MistwarError>>;

type Producer<K, V> = Arc<dyn Fn(K) -> BoxFuture<'static, Result<V, MistwarError>> + Send + Sync>;
type SharedResult<V> = Shared<BoxFuture<'static, CacheResult<V>>>;

struct Entry<V: Clone> {
    generation: u64,
    future: SharedResult<V>,
}

/// Async memoization with one in-flight producer call per key.
///
/// The first `get` for a key creates a shared future around the producer; every
/// caller, concurrent or later, awaits that same future and sees the same
/// success or failure. Failures (including producer panics) stay cached until
/// the key is removed. A removed key starts a new generation on its next `get`.
pub struct SingleFlightCache<K, V: Clone> {
    entries: DashMap<K, Entry<V>>,
    producer: Producer<K, V>,
    generations: AtomicU64,
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, MistwarError>> + Send + 'static,
    {
        Self {
            entries: DashMap::new(),
            producer: Arc::new(move |key| producer(key).boxed()),
            generations: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, key: K) -> CacheResult<V> {
        // The map guard must be gone before awaiting.
        let future = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| {
                let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                debug!(?key, generation, "cache miss, starting producer");
                Entry {
                    generation,
                    future: self.produce(key.clone()),
                }
            })
            .future
            .clone();

        future.await
    }

    /// Settled result for `key`, without waiting and without starting a producer.
    pub fn peek(&self, key: &K) -> Option<CacheResult<V>> {
        self.entries
            .get(key)
            .and_then(|entry| entry.future.peek().cloned())
    }

    /// Evicts `key` and hands back its value if it had settled successfully.
    ///
    /// The caller owns whatever the value holds; nothing is released here.
    pub fn remove(&self, key: &K) -> Option<V> {
        let (_, entry) = self.entries.remove(key)?;
        debug!(?key, generation = entry.generation, "cache entry removed");
        entry
            .future
            .peek()
            .and_then(|result| result.as_ref().ok().cloned())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn produce(&self, key: K) -> SharedResult<V> {
        let future = (self.producer)(key);
        AssertUnwindSafe(future)
            .catch_unwind()
            .map(|outcome| match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(Arc::new(e)),
                Err(panic) => Err(Arc::new(MistwarError::Producer(panic_message(&*panic)))),
            })
            .boxed()
            .shared()
    }
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Release + Send + Sync + 'static,
{
    /// Evicts every entry and releases each successfully settled value once.
    ///
    /// Entries still in flight are awaited so their values can be released too.
    pub async fn clear(&self) {
        let keys: Vec<K> = self.entries.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            let Some((_, entry)) = self.entries.remove(&key) else {
                continue;
            };
            if let Ok(value) = entry.future.await {
                value.release();
            }
        }
    }

    /// Like [`SingleFlightCache::clear`], but never waits.
    ///
    /// Settled values are released; entries still in flight are dropped, which
    /// cancels their producer unless another caller is still awaiting it.
    pub fn clear_now(&self) {
        let keys: Vec<K> = self.entries.iter().map(|e| e.key().clone()).collect();
        let mut abandoned = 0;
        for key in keys {
            let Some((_, entry)) = self.entries.remove(&key) else {
                continue;
            };
            match entry.future.peek() {
                Some(Ok(value)) => value.release(),
                Some(Err(_)) => {}
                None => abandoned += 1,
            }
        }
        if abandoned > 0 {
            debug!(abandoned, "dropped pending cache entries");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "producer panicked".to_string()
    }
}
