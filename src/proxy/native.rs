//! Host-visible proxy of a native interface implementation

use super::cache::CacheTicket;
use super::Bridged;
use crate::boundary;
use crate::env::Env;
use crate::host::{Args, ForeignObject, Host, HostException, HostValue, ObjectId};
use std::any::Any;
use std::sync::Arc;

/// Wraps a native `Arc<T>` so the host can hold and call it.
///
/// Holds the target strongly; the host keeps the proxy alive for as long as
/// it references it.
pub struct NativeProxy<T: ?Sized + Bridged> {
    target: Arc<T>,
    env: Env,
    id: ObjectId,
    _ticket: CacheTicket,
}

impl<T: ?Sized + Bridged> NativeProxy<T> {
    pub(crate) fn new(target: Arc<T>, env: Env, ticket: CacheTicket) -> Self {
        Self {
            target,
            env,
            id: ObjectId::fresh(),
            _ticket: ticket,
        }
    }

    /// The native implementation behind this proxy
    pub fn target(&self) -> &Arc<T> {
        &self.target
    }
}

impl<T: ?Sized + Bridged> ForeignObject for NativeProxy<T> {
    fn identity(&self) -> ObjectId {
        self.id
    }

    fn class_name(&self) -> &str {
        T::NAME
    }

    fn receive(&self, host: &dyn Host, method: &str, args: Args) -> HostValue {
        let Some(thunk) = T::dispatch_table().get(method) else {
            host.throw(HostException::new(
                "java.lang.NoSuchMethodError",
                &format!("{}.{}", T::NAME, method),
            ));
            return HostValue::Null;
        };
        boundary::call_in(&self.env, method, || thunk(&self.target, &self.env, args))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
