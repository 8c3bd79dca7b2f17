//! Durable foreign reference held by native proxies

use super::cache::CacheTicket;
use crate::boundary;
use crate::env::Env;
use crate::error::{BridgeError, BridgeResult};
use crate::host::{Args, ForeignRef, HostValue, ObjectId};
use crate::interop::{self, Marshal};
use crate::thread::AttachGuard;
use std::fmt;

/// What a native proxy owns: the durable reference to its foreign object and
/// the ticket of its cache entry.
///
/// Dropping the handle releases the durable reference, then removes the
/// cache entry.
pub struct ForeignHandle {
    env: Env,
    identity: ObjectId,
    object: Option<ForeignRef>,
    _ticket: CacheTicket,
}

impl ForeignHandle {
    pub(crate) fn new(env: Env, object: ForeignRef, ticket: CacheTicket) -> Self {
        Self {
            env,
            identity: object.identity(),
            object: Some(object),
            _ticket: ticket,
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Identity of the foreign object
    pub fn identity(&self) -> ObjectId {
        self.identity
    }

    /// The foreign object; for [`Interface::foreign_origin`](super::Interface::foreign_origin)
    pub fn object(&self) -> Option<&ForeignRef> {
        self.object.as_ref()
    }

    /// Forward a call to the foreign object.
    ///
    /// Arguments are already translated. The calling thread is attached for
    /// the duration of the call if the host does not know it; a failure left
    /// pending by the callee comes back as an error.
    pub fn invoke(&self, method: &str, args: Args) -> BridgeResult<HostValue> {
        let target = self
            .object
            .as_ref()
            .ok_or_else(|| BridgeError::native(format!("{method}: foreign handle released")))?;
        let _attached = AttachGuard::acquire(self.env.host_arc(), self.env.attach_policy())?;
        boundary::call_out(&self.env, method, |host| host.invoke(target, method, args))
    }

    /// [`invoke`](Self::invoke) and translate the result
    pub fn call<R: Marshal>(&self, method: &str, args: Args) -> BridgeResult<R> {
        let value = self.invoke(method, args)?;
        interop::import(&self.env, value)
    }
}

impl Drop for ForeignHandle {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            self.env.host().release(object);
        }
    }
}

impl fmt::Debug for ForeignHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignHandle")
            .field("identity", &self.identity)
            .field("class", &self.object.as_ref().map(|o| o.class_name().to_string()))
            .finish()
    }
}
