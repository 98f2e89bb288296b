//! Caching for `ResourceRecord`s, keyed by the `Question` that
//! produced them.
//!
//! This is deliberately simple: a `HashMap` with at most one entry per
//! question, no maximum size, and no LRU. The only reclamation is
//! lazy removal of a stale entry the next time it's read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::clock::Clock;
use crate::protocol::{Question, ResourceRecord};

/// A convenience wrapper around a `Cache` which lets it be shared
/// between the resolver loop and (in principle) other tasks.
///
/// Cloning a `SharedCache` gives a new handle to the same underlying
/// cache.
#[derive(Clone)]
pub struct SharedCache {
    cache: Arc<Mutex<Cache>>,
    clock: Arc<dyn Clock>,
}

impl SharedCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: Arc::new(Mutex::new(Cache::new())),
            clock,
        }
    }

    /// Whether a fresh answer exists for `question`. A stale entry is
    /// removed as a side effect and `false` is returned.
    pub fn has_fresh(&self, question: &Question) -> bool {
        let now = self.clock.now();
        let mut cache = self.cache.lock().unwrap();
        match cache.entries.get(question) {
            Some(rr) if rr.is_fresh_at(now) => true,
            Some(_) => {
                cache.entries.remove(question);
                false
            }
            None => false,
        }
    }

    /// Fetch the stored record for `question`, if any. Does not check
    /// freshness - callers are expected to call [`has_fresh`] first.
    ///
    /// [`has_fresh`]: SharedCache::has_fresh
    pub fn get(&self, question: &Question) -> Option<ResourceRecord> {
        self.cache.lock().unwrap().entries.get(question).cloned()
    }

    /// Insert (or replace) the entry for `question`.
    pub fn put(&self, question: Question, record: ResourceRecord) {
        self.cache.lock().unwrap().entries.insert(question, record);
    }
}

/// The underlying map. Not meant to be used directly - go through
/// [`SharedCache`].
struct Cache {
    entries: HashMap<Question, ResourceRecord>,
}

impl Cache {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}
