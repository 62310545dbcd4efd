//! In-memory icon cache and the learned-redirect table.
//!
//! The cache maps cache-file paths to decoded icons or an explicit
//! known-absent marker, so "we fetched this and it was not an image" is
//! distinct from "never looked". Both tables are capacity-bounded; the
//! oldest entry is evicted when full, with lookups refreshing recency.

use image::DynamicImage;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Result of a memory-cache lookup.
pub enum CacheLookup {
    /// A decoded icon is cached for this path.
    Present(Arc<DynamicImage>),
    /// A fetch for this path completed but yielded no usable icon.
    KnownAbsent,
    /// This path has never been resolved.
    NotCached,
}

enum Entry {
    Present(Arc<DynamicImage>),
    KnownAbsent,
}

struct Bounded<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: std::hash::Hash + Eq + Clone, V> Bounded<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, key: K, value: V) {
        if self.map.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        if self.map.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
        self.order.push_back(key);
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos).unwrap();
            self.order.push_back(k);
        }
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.map.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(value)
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Shared icon cache keyed by cache-file path. All mutation happens under
/// one lock so lookup-and-insert sequences cannot interleave.
pub struct IconMemoryCache {
    inner: Mutex<Bounded<PathBuf, Entry>>,
}

impl IconMemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Bounded::new(capacity)),
        }
    }

    pub fn lookup(&self, key: &Path) -> CacheLookup {
        let mut inner = self.inner.lock().unwrap();
        let found = match inner.map.get(key) {
            Some(Entry::Present(img)) => CacheLookup::Present(Arc::clone(img)),
            Some(Entry::KnownAbsent) => return CacheLookup::KnownAbsent,
            None => return CacheLookup::NotCached,
        };
        inner.touch(&key.to_path_buf());
        found
    }

    /// Record the outcome of a fetch: a decoded icon, or `None` for a
    /// resource that could not be decoded (known absent).
    pub fn insert(&self, key: PathBuf, icon: Option<Arc<DynamicImage>>) {
        let entry = match icon {
            Some(img) => Entry::Present(img),
            None => Entry::KnownAbsent,
        };
        self.inner.lock().unwrap().insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Learned favicon redirects: page URI -> icon URI observed via a 301.
/// Entries are consumed by `take`, so one learned target serves exactly one
/// later icon resolution and the table cannot pin stale targets forever.
pub struct RedirectTable {
    inner: Mutex<Bounded<String, String>>,
}

impl RedirectTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Bounded::new(capacity)),
        }
    }

    pub fn record(&self, source: String, target: String) {
        self.inner.lock().unwrap().insert(source, target);
    }

    /// Remove and return the learned target for `source`, if any.
    pub fn take(&self, source: &str) -> Option<String> {
        self.inner.lock().unwrap().remove(&source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img() -> Arc<DynamicImage> {
        Arc::new(DynamicImage::new_rgba8(2, 2))
    }

    #[test]
    fn lookup_distinguishes_three_states() {
        let cache = IconMemoryCache::new(8);
        let present = PathBuf::from("/cache/a.ico");
        let absent = PathBuf::from("/cache/b.ico");
        cache.insert(present.clone(), Some(img()));
        cache.insert(absent.clone(), None);

        assert!(matches!(cache.lookup(&present), CacheLookup::Present(_)));
        assert!(matches!(cache.lookup(&absent), CacheLookup::KnownAbsent));
        assert!(matches!(
            cache.lookup(Path::new("/cache/c.ico")),
            CacheLookup::NotCached
        ));
    }

    #[test]
    fn insert_overwrites_known_absent() {
        let cache = IconMemoryCache::new(8);
        let key = PathBuf::from("/cache/a.ico");
        cache.insert(key.clone(), None);
        cache.insert(key.clone(), Some(img()));
        assert!(matches!(cache.lookup(&key), CacheLookup::Present(_)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let cache = IconMemoryCache::new(2);
        let a = PathBuf::from("/cache/a");
        let b = PathBuf::from("/cache/b");
        let c = PathBuf::from("/cache/c");
        cache.insert(a.clone(), Some(img()));
        cache.insert(b.clone(), Some(img()));
        cache.insert(c.clone(), Some(img()));
        assert_eq!(cache.len(), 2);
        assert!(matches!(cache.lookup(&a), CacheLookup::NotCached));
        assert!(matches!(cache.lookup(&b), CacheLookup::Present(_)));
        assert!(matches!(cache.lookup(&c), CacheLookup::Present(_)));
    }

    #[test]
    fn lookup_refreshes_recency() {
        let cache = IconMemoryCache::new(2);
        let a = PathBuf::from("/cache/a");
        let b = PathBuf::from("/cache/b");
        let c = PathBuf::from("/cache/c");
        cache.insert(a.clone(), Some(img()));
        cache.insert(b.clone(), Some(img()));
        // Touch a so b becomes the oldest.
        assert!(matches!(cache.lookup(&a), CacheLookup::Present(_)));
        cache.insert(c.clone(), Some(img()));
        assert!(matches!(cache.lookup(&a), CacheLookup::Present(_)));
        assert!(matches!(cache.lookup(&b), CacheLookup::NotCached));
    }

    #[test]
    fn redirect_take_consumes_entry() {
        let table = RedirectTable::new(8);
        table.record(
            "http://example.com/page".into(),
            "http://cdn.example.com/fav.ico".into(),
        );
        assert_eq!(
            table.take("http://example.com/page").as_deref(),
            Some("http://cdn.example.com/fav.ico")
        );
        assert!(table.take("http://example.com/page").is_none());
    }

    #[test]
    fn redirect_table_is_bounded() {
        let table = RedirectTable::new(2);
        table.record("a".into(), "1".into());
        table.record("b".into(), "2".into());
        table.record("c".into(), "3".into());
        assert!(table.take("a").is_none());
        assert_eq!(table.take("b").as_deref(), Some("2"));
        assert_eq!(table.take("c").as_deref(), Some("3"));
    }
}
