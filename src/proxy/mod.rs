//! Interface proxies - calling across the boundary through interfaces
//!
//! Design: an interface handle is an `Arc<dyn Trait>`. Whoever implements
//! the trait owns it: either native code, or a foreign object reached
//! through a native proxy. Identity is preserved in both directions:
//! - one live proxy per (interface, object), shared by all callers
//! - a proxy travelling back to its origin side is unwrapped, never wrapped
//!   a second time
//!
//! Architecture:
//! - `cache.rs` - `ProxyCache`, the concurrent identity map
//! - `handle.rs` - `ForeignHandle`, durable foreign reference used by proxies
//! - `native.rs` - `NativeProxy`, host-visible wrapper of a native object
//! - `bridge.rs` - `expose_to_host` / `expose_to_native`
//!
//! A bridged interface needs three things, normally emitted by the binding
//! generator: the trait itself with [`Interface`] as supertrait, a proxy type
//! implementing the trait over a [`ForeignHandle`], and an impl of
//! [`Bridged`] for `dyn Trait` that names the proxy constructor and the
//! [`DispatchTable`] of forwarding thunks.
//!
//! Tables name their target up front, `DispatchTable::<dyn Trait>::new(..)`,
//! so the thunk closures passed to `method` can coerce to [`Thunk`].

pub mod cache;
mod bridge;
mod handle;
mod native;

pub use bridge::{expose_to_host, expose_to_native};
pub use cache::{CacheKey, CacheStats, CacheTicket, ProxyCache};
pub use handle::ForeignHandle;
pub use native::NativeProxy;

use crate::env::Env;
use crate::error::{BridgeResult, MarshalError};
use crate::host::{Args, ForeignRef, HostValue};
use crate::interop::{mismatch, Marshal, TypeShape};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Supertrait of every bridged interface
pub trait Interface: Send + Sync + 'static {
    /// The foreign object behind this handle, if it is a native proxy
    fn foreign_origin(&self) -> Option<&ForeignRef> {
        None
    }
}

/// Binding of one interface, implemented on `dyn Trait`
pub trait Bridged: Interface {
    /// Host interface name
    const NAME: &'static str;

    /// Build the native proxy for a foreign implementation
    fn wrap_foreign(handle: ForeignHandle) -> Arc<Self>;

    /// Forwarding thunks for calls arriving from the host
    fn dispatch_table() -> &'static DispatchTable<Self>;
}

/// Forwarding thunk: unpack host arguments, call the native method, pack the
/// result
pub type Thunk<T> = fn(&T, &Env, Args) -> BridgeResult<HostValue>;

/// Method table of one interface, built once at bind time
pub struct DispatchTable<T: ?Sized> {
    interface: &'static str,
    methods: HashMap<&'static str, Thunk<T>>,
}

impl<T: ?Sized> DispatchTable<T> {
    pub fn new(interface: &'static str) -> Self {
        Self {
            interface,
            methods: HashMap::new(),
        }
    }

    pub fn method(mut self, name: &'static str, thunk: Thunk<T>) -> Self {
        self.methods.insert(name, thunk);
        self
    }

    pub fn get(&self, name: &str) -> Option<Thunk<T>> {
        self.methods.get(name).copied()
    }

    pub fn interface(&self) -> &'static str {
        self.interface
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn method_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.keys().copied()
    }
}

impl<T: ?Sized> fmt::Debug for DispatchTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("DispatchTable")
            .field("interface", &self.interface)
            .field("methods", &names)
            .finish()
    }
}

/// Interface handles; a host `Null` is only accepted through `Option<Arc<T>>`
impl<T: ?Sized + Bridged> Marshal for Arc<T> {
    const SHAPE: TypeShape = TypeShape::Interface(T::NAME);

    fn to_host(&self, env: &Env) -> BridgeResult<HostValue> {
        Ok(HostValue::Object(expose_to_host(env, self)?))
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Object(object) => expose_to_native::<T>(env, Some(&object))?
                .ok_or_else(|| MarshalError::UnexpectedNull(T::NAME.to_string()).into()),
            other => Err(mismatch::<Self>(&other).into()),
        }
    }
}
