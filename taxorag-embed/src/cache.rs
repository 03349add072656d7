//! MD5-keyed, FIFO-evicted embedding cache ("Cache: MD5(text)
//! keyed map, capacity 1000, FIFO eviction. Cache hit latency must be
//! < 1 ms").

use md5::{Digest, Md5};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Hash a text for cache keying.
#[must_use]
pub fn cache_key(text: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct Inner {
    map: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
    capacity: usize,
}

/// Fixed-capacity FIFO cache keyed by MD5 hash of the source text.
///
/// Plain `Mutex` (not an async lock) because every critical section is a
/// handful of hashmap operations —: "writes to it are short".
pub struct EmbeddingCache {
    inner: Mutex<Inner>,
}

impl EmbeddingCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
                capacity: capacity.max(1),
            }),
        }
    }

    #[must_use]
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = cache_key(text);
        self.inner.lock().map.get(&key).cloned()
    }

    pub fn put(&self, text: &str, vector: Vec<f32>) {
        let key = cache_key(text);
        let mut inner = self.inner.lock();
        if inner.map.contains_key(&key) {
            inner.map.insert(key, vector);
            return;
        }
        if inner.order.len() >= inner.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
            }
        }
        inner.order.push_back(key.clone());
        inner.map.insert(key, vector);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
