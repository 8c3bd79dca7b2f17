//! Proxy identity cache
//!
//! Design: one entry per (interface, object identity), holding a `Weak` to
//! the live proxy. Lookup and construction happen under the key's shard lock
//! (`DashMap` entry API), so concurrent first access builds exactly one
//! proxy. Every entry carries a generation number; the proxy owns a
//! [`CacheTicket`] that removes the entry on drop only if the generation
//! still matches, so a late removal never deletes a newer entry.
//!
//! Two process-wide caches exist, created on first use: one for native
//! proxies of foreign objects, one for host-visible proxies of native
//! objects.

use crate::error::{BridgeResult, IdentityCacheError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Global cache of native proxies wrapping foreign objects
static FOREIGN_PROXIES: Lazy<ProxyCache> = Lazy::new(|| global_cache("foreign"));

/// Global cache of host-visible proxies wrapping native objects
static NATIVE_PROXIES: Lazy<ProxyCache> = Lazy::new(|| global_cache("native"));

/// Global caches are sized from the runtime config present on first use
fn global_cache(name: &'static str) -> ProxyCache {
    ProxyCache::with_capacity(name, crate::config::runtime_config().cache.initial_capacity)
}

pub fn foreign_proxies() -> &'static ProxyCache {
    &FOREIGN_PROXIES
}

pub fn native_proxies() -> &'static ProxyCache {
    &NATIVE_PROXIES
}

/// Drop every entry of both global caches.
///
/// Live proxies keep working; they are simply no longer found by lookups.
pub fn clear_global() {
    FOREIGN_PROXIES.clear();
    NATIVE_PROXIES.clear();
}

/// Cache key: interface type plus object identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    interface: TypeId,
    object: u64,
}

impl CacheKey {
    pub fn new<I: ?Sized + 'static>(object: u64) -> Self {
        Self {
            interface: TypeId::of::<I>(),
            object,
        }
    }

    pub fn object(&self) -> u64 {
        self.object
    }
}

struct CacheSlot {
    generation: u64,
    /// `Weak<V>` for the proxy type of this entry
    proxy: Box<dyn Any + Send + Sync>,
}

struct CacheShared {
    name: &'static str,
    map: DashMap<CacheKey, CacheSlot>,
    next_generation: AtomicU64,
    created: AtomicUsize,
    hits: AtomicUsize,
    removed: AtomicUsize,
}

/// Concurrent identity map from objects to their live proxies
#[derive(Clone)]
pub struct ProxyCache {
    shared: Arc<CacheShared>,
}

impl ProxyCache {
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, 0)
    }

    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        Self {
            shared: Arc::new(CacheShared {
                name,
                map: DashMap::with_capacity(capacity),
                next_generation: AtomicU64::new(1),
                created: AtomicUsize::new(0),
                hits: AtomicUsize::new(0),
                removed: AtomicUsize::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    /// Return the live proxy for `key`, or build one with `factory`.
    ///
    /// The factory runs under the key's shard lock and must not touch this
    /// cache. It receives the ticket the new proxy has to own. If it fails,
    /// no entry is left behind.
    pub fn get_or_create<V, F>(&self, key: CacheKey, factory: F) -> BridgeResult<Arc<V>>
    where
        V: ?Sized + Send + Sync + 'static,
        F: FnOnce(CacheTicket) -> BridgeResult<Arc<V>>,
    {
        match self.shared.map.entry(key) {
            Entry::Occupied(mut occupied) => {
                let Some(weak) = occupied.get().proxy.downcast_ref::<Weak<V>>() else {
                    debug_assert!(false, "cache {} holds another proxy type for {:?}", self.name(), key);
                    return Err(IdentityCacheError::ConflictingProxy {
                        cache: self.shared.name,
                        object: key.object,
                        expected: type_name::<V>(),
                    }
                    .into());
                };

                if let Some(live) = weak.upgrade() {
                    self.shared.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(event = "proxy_cache_hit", cache = self.name(), object = key.object);
                    return Ok(live);
                }

                // The proxy died but its ticket has not run yet: replace it
                match self.construct(key, factory) {
                    Ok((slot, armed, proxy)) => {
                        occupied.insert(slot);
                        armed.store(true, Ordering::Release);
                        Ok(proxy)
                    }
                    Err(err) => {
                        occupied.remove();
                        Err(err)
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let (slot, armed, proxy) = self.construct(key, factory)?;
                vacant.insert(slot);
                armed.store(true, Ordering::Release);
                Ok(proxy)
            }
        }
    }

    fn construct<V, F>(
        &self,
        key: CacheKey,
        factory: F,
    ) -> BridgeResult<(CacheSlot, Arc<AtomicBool>, Arc<V>)>
    where
        V: ?Sized + Send + Sync + 'static,
        F: FnOnce(CacheTicket) -> BridgeResult<Arc<V>>,
    {
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        let armed = Arc::new(AtomicBool::new(false));
        let ticket = CacheTicket {
            shared: self.shared.clone(),
            key,
            generation,
            armed: armed.clone(),
        };

        let proxy = factory(ticket)?;
        self.shared.created.fetch_add(1, Ordering::Relaxed);
        crate::logging::log_proxy_created(self.name(), type_name::<V>(), key.object, generation);

        let slot = CacheSlot {
            generation,
            proxy: Box::new(Arc::downgrade(&proxy)),
        };
        Ok((slot, armed, proxy))
    }

    /// Live proxy for `key`, without creating one
    pub fn get<V: ?Sized + Send + Sync + 'static>(&self, key: &CacheKey) -> Option<Arc<V>> {
        let slot = self.shared.map.get(key)?;
        let live = slot.proxy.downcast_ref::<Weak<V>>()?.upgrade();
        live
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.shared.map.contains_key(key)
    }

    /// Number of entries, including dead ones not yet removed
    pub fn len(&self) -> usize {
        self.shared.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.map.is_empty()
    }

    pub fn clear(&self) {
        let dropped = self.shared.map.len();
        self.shared.map.clear();
        debug!(event = "proxy_cache_clear", cache = self.name(), entries = dropped);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            created: self.shared.created.load(Ordering::Relaxed),
            hits: self.shared.hits.load(Ordering::Relaxed),
            removed: self.shared.removed.load(Ordering::Relaxed),
            live: self.shared.map.len(),
        }
    }
}

impl fmt::Debug for ProxyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCache")
            .field("name", &self.shared.name)
            .field("entries", &self.shared.map.len())
            .finish()
    }
}

/// Proxy cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub created: usize,
    pub hits: usize,
    pub removed: usize,
    pub live: usize,
}

/// Removal right for one cache entry, owned by the proxy it describes
pub struct CacheTicket {
    shared: Arc<CacheShared>,
    key: CacheKey,
    generation: u64,
    armed: Arc<AtomicBool>,
}

impl CacheTicket {
    pub fn key(&self) -> CacheKey {
        self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for CacheTicket {
    fn drop(&mut self) {
        // Unarmed tickets belong to a construction that never got inserted
        if !self.armed.load(Ordering::Acquire) {
            return;
        }
        let generation = self.generation;
        let removed = self
            .shared
            .map
            .remove_if(&self.key, |_, slot| slot.generation == generation);
        if removed.is_some() {
            self.shared.removed.fetch_add(1, Ordering::Relaxed);
            crate::logging::log_proxy_removed(self.shared.name, self.key.object, generation);
        }
    }
}

impl fmt::Debug for CacheTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheTicket")
            .field("cache", &self.shared.name)
            .field("object", &self.key.object)
            .field("generation", &self.generation)
            .finish()
    }
}
