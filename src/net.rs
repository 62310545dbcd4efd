//! The fetch façade service object.
//!
//! `Net` owns the cache root, the in-memory icon cache, the learned-redirect
//! table, and the HTTP settings applied to every transfer. Construct one at
//! the application's composition root and clone it wherever fetches are
//! issued; clones share the same caches.

use crate::cache_path;
use crate::config::NetConfig;
use crate::memory_cache::{IconMemoryCache, RedirectTable};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
pub struct Net {
    inner: Arc<NetInner>,
}

struct NetInner {
    config: NetConfig,
    cache_root: PathBuf,
    memory: IconMemoryCache,
    redirects: RedirectTable,
}

impl Net {
    /// Creates the façade. The cache root comes from the config override or
    /// the user's XDG cache directory plus the application prefix.
    pub fn new(config: NetConfig) -> Result<Self> {
        let cache_root = match &config.cache_dir {
            Some(dir) => dir.clone(),
            None => xdg::BaseDirectories::with_prefix("netcache")
                .context("XDG base directories unavailable")?
                .get_cache_home(),
        };
        let capacity = config.memory_cache_capacity;
        Ok(Net {
            inner: Arc::new(NetInner {
                config,
                cache_root,
                memory: IconMemoryCache::new(capacity),
                redirects: RedirectTable::new(capacity),
            }),
        })
    }

    pub fn config(&self) -> &NetConfig {
        &self.inner.config
    }

    pub fn cache_root(&self) -> &Path {
        &self.inner.cache_root
    }

    /// Deterministic cache path for `uri` under the cache root, creating the
    /// (sub)directory as a side effect. Identical URIs map to identical
    /// paths, so the result doubles as a cache key.
    pub fn cached_path(&self, uri: &str, subfolder: Option<&str>) -> PathBuf {
        cache_path::cached_path(&self.inner.cache_root, uri, subfolder)
    }

    pub(crate) fn memory(&self) -> &IconMemoryCache {
        &self.inner.memory
    }

    pub(crate) fn redirects(&self) -> &RedirectTable {
        &self.inner.redirects
    }
}
