//! In-process host runtime
//!
//! `LocalHost` behaves like a foreign VM seen through its native interface:
//! objects have their own identities, failures stay pending per thread until
//! someone takes them, calls require an attached thread, and durable
//! references are counted so leaks show up in tests.

use super::{Args, ForeignObject, ForeignRef, Host, HostException, HostValue, ObjectId};
use crate::error::BridgeResult;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::trace;

thread_local! {
    // ThreadId has no destructor, so this stays readable while other
    // thread-locals are torn down at thread exit.
    static THREAD_ID: ThreadId = thread::current().id();
}

fn current_thread() -> ThreadId {
    THREAD_ID.with(|id| *id)
}

/// Method implemented on the foreign side of a [`LocalObject`]
pub type LocalMethod =
    Arc<dyn Fn(&dyn Host, Args) -> Result<HostValue, HostException> + Send + Sync>;

/// In-process foreign runtime
pub struct LocalHost {
    name: String,
    pending: Mutex<HashMap<ThreadId, HostException>>,
    attached: Mutex<HashSet<ThreadId>>,
    attach_count: AtomicUsize,
    detach_count: AtomicUsize,
    live_refs: AtomicUsize,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::named("local")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending: Mutex::new(HashMap::new()),
            attached: Mutex::new(HashSet::new()),
            attach_count: AtomicUsize::new(0),
            detach_count: AtomicUsize::new(0),
            live_refs: AtomicUsize::new(0),
        }
    }

    /// Start building a foreign-implemented object
    pub fn object(class: impl Into<String>) -> LocalObjectBuilder {
        LocalObjectBuilder {
            class: class.into(),
            methods: HashMap::new(),
        }
    }

    /// Call a method the way foreign code would.
    ///
    /// The calling thread counts as a host-owned thread for the duration of
    /// the call. A failure comes back as the caught exception.
    pub fn call_from_host(
        &self,
        target: &ForeignRef,
        method: &str,
        args: Args,
    ) -> Result<HostValue, HostException> {
        let tid = current_thread();
        let owned = self.attached.lock().insert(tid);

        let value = self.invoke(target, method, args);
        let caught = self.take_exception();

        if owned {
            self.attached.lock().remove(&tid);
        }
        match caught {
            Some(exception) => Err(exception),
            None => Ok(value),
        }
    }

    /// Durable references handed out and not yet released
    pub fn live_refs(&self) -> usize {
        self.live_refs.load(Ordering::SeqCst)
    }

    /// Number of attach operations performed
    pub fn attach_count(&self) -> usize {
        self.attach_count.load(Ordering::SeqCst)
    }

    /// Number of detach operations performed
    pub fn detach_count(&self) -> usize {
        self.detach_count.load(Ordering::SeqCst)
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for LocalHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn retain(&self, object: &ForeignRef) -> ForeignRef {
        self.live_refs.fetch_add(1, Ordering::SeqCst);
        object.clone()
    }

    fn release(&self, object: ForeignRef) {
        let old = self.live_refs.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(old > 0, "durable reference underflow");
        drop(object);
    }

    fn invoke(&self, target: &ForeignRef, method: &str, args: Args) -> HostValue {
        if !self.is_thread_attached() {
            self.throw(HostException::new(
                "java.lang.IllegalStateException",
                "calling thread is not attached",
            ));
            return HostValue::Null;
        }
        trace!(
            host = %self.name,
            class = target.class_name(),
            method,
            args = args.len(),
            "host invoke"
        );
        target.receive(self, method, args)
    }

    fn exception_pending(&self) -> bool {
        self.pending.lock().contains_key(&current_thread())
    }

    fn take_exception(&self) -> Option<HostException> {
        self.pending.lock().remove(&current_thread())
    }

    fn throw(&self, exception: HostException) {
        // A second throw replaces the first, as in the JNI convention
        self.pending.lock().insert(current_thread(), exception);
    }

    fn is_thread_attached(&self) -> bool {
        self.attached.lock().contains(&current_thread())
    }

    fn attach_thread(&self) -> BridgeResult<()> {
        if self.attached.lock().insert(current_thread()) {
            self.attach_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn detach_thread(&self) {
        if self.attached.lock().remove(&current_thread()) {
            self.detach_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Builder for [`LocalObject`]
pub struct LocalObjectBuilder {
    class: String,
    methods: HashMap<String, LocalMethod>,
}

impl LocalObjectBuilder {
    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&dyn Host, Args) -> Result<HostValue, HostException> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(body));
        self
    }

    pub fn build(self) -> ForeignRef {
        Arc::new(LocalObject {
            id: ObjectId::fresh(),
            class: self.class,
            methods: self.methods,
        })
    }
}

/// Object implemented on the foreign side of a [`LocalHost`]
pub struct LocalObject {
    id: ObjectId,
    class: String,
    methods: HashMap<String, LocalMethod>,
}

impl ForeignObject for LocalObject {
    fn identity(&self) -> ObjectId {
        self.id
    }

    fn class_name(&self) -> &str {
        &self.class
    }

    fn receive(&self, host: &dyn Host, method: &str, args: Args) -> HostValue {
        let Some(body) = self.methods.get(method) else {
            host.throw(HostException::new(
                "java.lang.NoSuchMethodError",
                &format!("{}.{}", self.class, method),
            ));
            return HostValue::Null;
        };
        match body(host, args) {
            Ok(value) => value,
            Err(exception) => {
                host.throw(exception);
                HostValue::Null
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
