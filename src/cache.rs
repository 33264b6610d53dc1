use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Read-through cache whose entries expire after `max_age`.
pub struct TtlCache<V> {
    max_age: Duration,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_at(key.into(), value, Instant::now());
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Returns the cached value or stores the one produced by `load`.
    pub fn get_or_insert_with(&self, key: &str, load: impl FnOnce() -> V) -> V {
        let now = Instant::now();
        if let Some(value) = self.get_at(key, now) {
            return value;
        }
        let value = load();
        self.put_at(key.to_string(), value.clone(), now);
        value
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn put_at(&self, key: String, value: V, stored_at: Instant) {
        self.lock().insert(key, Entry { value, stored_at });
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => now.saturating_duration_since(entry.stored_at) > self.max_age,
        };
        if expired {
            log::debug!("cache entry '{}' expired", key);
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry<V>>> {
        // a poisoned map only ever holds complete entries
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE)
    }
}
