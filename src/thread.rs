//! Thread attachment
//!
//! A host can only be called from threads it knows about. Native threads are
//! attached on first call-out through an [`AttachGuard`]; what happens when
//! the guard drops depends on the [`AttachPolicy`].

use crate::error::{BridgeError, BridgeResult};
use crate::host::Host;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, warn};

/// When a thread attached by the runtime is detached again
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttachPolicy {
    /// Detach as soon as the outermost guard drops
    Scoped,
    /// Stay attached; detach from a thread-local destructor at thread exit
    #[default]
    ThreadLifetime,
}

/// Keeps the calling thread attached while alive
#[must_use]
pub struct AttachGuard {
    host: Option<Arc<dyn Host>>,
}

impl AttachGuard {
    /// Attach the calling thread if the host does not know it yet.
    ///
    /// Threads that are already attached (host-owned threads, or threads
    /// attached by an outer guard) are left alone.
    pub fn acquire(host: &Arc<dyn Host>, policy: AttachPolicy) -> BridgeResult<Self> {
        if host.is_thread_attached() {
            return Ok(Self { host: None });
        }

        host.attach_thread().map_err(|err| match err {
            BridgeError::ThreadAttach(_) => err,
            other => BridgeError::ThreadAttach(other.to_string()),
        })?;
        debug!(
            event = "thread_attach",
            host = host.name(),
            policy = ?policy,
            "Attached native thread to host"
        );

        match policy {
            AttachPolicy::Scoped => Ok(Self {
                host: Some(host.clone()),
            }),
            AttachPolicy::ThreadLifetime => {
                register_thread_exit(host.clone());
                Ok(Self { host: None })
            }
        }
    }

    /// Whether dropping this guard detaches the thread
    pub fn detaches_on_drop(&self) -> bool {
        self.host.is_some()
    }
}

impl Drop for AttachGuard {
    fn drop(&mut self) {
        if let Some(host) = self.host.take() {
            host.detach_thread();
            debug!(event = "thread_detach", host = host.name(), "Detached scoped thread");
        }
    }
}

/// Hosts this thread must detach from when it exits
struct ThreadExit {
    hosts: Vec<Arc<dyn Host>>,
}

impl Drop for ThreadExit {
    fn drop(&mut self) {
        for host in self.hosts.drain(..) {
            if host.is_thread_attached() {
                host.detach_thread();
                debug!(event = "thread_detach", host = host.name(), "Detached at thread exit");
            }
        }
    }
}

thread_local! {
    static THREAD_EXIT: RefCell<ThreadExit> = const { RefCell::new(ThreadExit { hosts: Vec::new() }) };
}

fn register_thread_exit(host: Arc<dyn Host>) {
    let registered = THREAD_EXIT.try_with(|exit| {
        let mut exit = exit.borrow_mut();
        if !exit.hosts.iter().any(|known| Arc::ptr_eq(known, &host)) {
            exit.hosts.push(host.clone());
        }
    });
    if registered.is_err() {
        // Thread is already tearing down its locals; detach right away
        warn!(
            event = "thread_exit_late",
            host = host.name(),
            "Thread exiting during attach, detaching immediately"
        );
        host.detach_thread();
    }
}
