//! Interface exposure in both directions

use super::cache::CacheKey;
use super::{Bridged, ForeignHandle, NativeProxy};
use crate::env::Env;
use crate::error::BridgeResult;
use crate::host::ForeignRef;
use std::sync::Arc;
use tracing::trace;

/// Hand a native interface handle to the host.
///
/// A native proxy of a foreign object gives back that object. Anything else
/// is wrapped in the (single, cached) [`NativeProxy`] for this handle.
pub fn expose_to_host<T: ?Sized + Bridged>(env: &Env, handle: &Arc<T>) -> BridgeResult<ForeignRef> {
    if let Some(origin) = handle.foreign_origin() {
        trace!(event = "unwrap_foreign", interface = T::NAME, object = origin.identity().raw());
        return Ok(origin.clone());
    }

    // The proxy holds the target, so the address stays unique while the
    // entry is live.
    let address = Arc::as_ptr(handle) as *const () as usize as u64;
    let key = CacheKey::new::<T>(address);
    let proxy = env
        .native_proxies()
        .get_or_create::<NativeProxy<T>, _>(key, |ticket| {
            env.counters().record_proxy_created();
            Ok(Arc::new(NativeProxy::new(handle.clone(), env.clone(), ticket)))
        })?;
    Ok(proxy as ForeignRef)
}

/// Take an interface reference from the host.
///
/// `None` stays `None`. A [`NativeProxy`] gives back its native target.
/// Anything else gets the (single, cached) native proxy for that object.
pub fn expose_to_native<T: ?Sized + Bridged>(
    env: &Env,
    object: Option<&ForeignRef>,
) -> BridgeResult<Option<Arc<T>>> {
    let Some(object) = object else {
        return Ok(None);
    };

    if let Some(native) = object.as_any().downcast_ref::<NativeProxy<T>>() {
        trace!(event = "unwrap_native", interface = T::NAME, object = object.identity().raw());
        return Ok(Some(native.target().clone()));
    }

    let key = CacheKey::new::<T>(object.identity().raw());
    let proxy = env.foreign_proxies().get_or_create(key, |ticket| {
        env.counters().record_proxy_created();
        let durable = env.host().retain(object);
        Ok(T::wrap_foreign(ForeignHandle::new(env.clone(), durable, ticket)))
    })?;
    Ok(Some(proxy))
}
