//! Per-call environment
//!
//! An [`Env`] is what every translator receives: the host being talked to,
//! the active configuration and tick clock, the two proxy caches and the
//! runtime counters. Cloning is cheap; clones share everything.

use crate::config::{self, BridgeConfig, TextPolicy};
use crate::error::ConfigError;
use crate::host::Host;
use crate::proxy::cache::{self, ProxyCache};
use crate::temporal::TickClock;
use crate::thread::AttachPolicy;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct Env {
    inner: Arc<EnvInner>,
}

struct EnvInner {
    host: Arc<dyn Host>,
    config: BridgeConfig,
    clock: TickClock,
    foreign_proxies: ProxyCache,
    native_proxies: ProxyCache,
    stats: BridgeStats,
}

impl Env {
    /// Environment with the process-wide configuration and caches
    pub fn new(host: Arc<dyn Host>) -> Self {
        let config = config::runtime_config();
        // Installed configs are validated, so this never falls back
        let clock = config.clock.tick_clock().unwrap_or_default();
        Self::build(
            host,
            config,
            clock,
            cache::foreign_proxies().clone(),
            cache::native_proxies().clone(),
        )
    }

    /// Environment using the process-wide caches
    pub fn with_config(host: Arc<dyn Host>, config: BridgeConfig) -> Result<Self, ConfigError> {
        let clock = config.clock.tick_clock()?;
        Ok(Self::build(
            host,
            config,
            clock,
            cache::foreign_proxies().clone(),
            cache::native_proxies().clone(),
        ))
    }

    /// Environment with its own private proxy caches.
    ///
    /// Identity is only preserved within the caches of one environment, so
    /// values must not travel between isolated environments.
    pub fn isolated(host: Arc<dyn Host>, config: BridgeConfig) -> Result<Self, ConfigError> {
        let clock = config.clock.tick_clock()?;
        let capacity = config.cache.initial_capacity;
        Ok(Self::build(
            host,
            config,
            clock,
            ProxyCache::with_capacity("foreign", capacity),
            ProxyCache::with_capacity("native", capacity),
        ))
    }

    fn build(
        host: Arc<dyn Host>,
        config: BridgeConfig,
        clock: TickClock,
        foreign_proxies: ProxyCache,
        native_proxies: ProxyCache,
    ) -> Self {
        Self {
            inner: Arc::new(EnvInner {
                host,
                config,
                clock,
                foreign_proxies,
                native_proxies,
                stats: BridgeStats::default(),
            }),
        }
    }

    pub fn host(&self) -> &dyn Host {
        self.inner.host.as_ref()
    }

    pub fn host_arc(&self) -> &Arc<dyn Host> {
        &self.inner.host
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn clock(&self) -> &TickClock {
        &self.inner.clock
    }

    pub fn text_policy(&self) -> TextPolicy {
        self.inner.config.text.policy
    }

    pub fn attach_policy(&self) -> AttachPolicy {
        self.inner.config.threads.attach_policy
    }

    /// Cache of native proxies wrapping foreign objects
    pub fn foreign_proxies(&self) -> &ProxyCache {
        &self.inner.foreign_proxies
    }

    /// Cache of host-visible proxies wrapping native implementations
    pub fn native_proxies(&self) -> &ProxyCache {
        &self.inner.native_proxies
    }

    /// Snapshot of the runtime counters
    pub fn stats(&self) -> InteropStats {
        self.inner.stats.snapshot()
    }

    pub(crate) fn counters(&self) -> &BridgeStats {
        &self.inner.stats
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("host", &self.inner.host.name())
            .field("clock", &self.inner.clock)
            .field("text_policy", &self.text_policy())
            .field("attach_policy", &self.attach_policy())
            .finish_non_exhaustive()
    }
}

/// Runtime counters shared by clones of one [`Env`]
#[derive(Debug, Default)]
pub(crate) struct BridgeStats {
    calls_out: AtomicUsize,
    calls_in: AtomicUsize,
    boundary_exceptions: AtomicUsize,
    marshal_errors: AtomicUsize,
    proxies_created: AtomicUsize,
}

impl BridgeStats {
    pub(crate) fn record_call_out(&self) {
        self.calls_out.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_call_in(&self) {
        self.calls_in.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_boundary_exception(&self) {
        self.boundary_exceptions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_marshal_error(&self) {
        self.marshal_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_proxy_created(&self) {
        self.proxies_created.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> InteropStats {
        InteropStats {
            calls_out: self.calls_out.load(Ordering::Relaxed),
            calls_in: self.calls_in.load(Ordering::Relaxed),
            boundary_exceptions: self.boundary_exceptions.load(Ordering::Relaxed),
            marshal_errors: self.marshal_errors.load(Ordering::Relaxed),
            proxies_created: self.proxies_created.load(Ordering::Relaxed),
        }
    }
}

/// Interop statistics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteropStats {
    pub calls_out: usize,
    pub calls_in: usize,
    pub boundary_exceptions: usize,
    pub marshal_errors: usize,
    pub proxies_created: usize,
}
