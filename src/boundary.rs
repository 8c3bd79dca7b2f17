//! Exception propagation across the boundary
//!
//! Design: failures never cross silently in either direction.
//! - Call-out (native into host): after the call, a pending host exception
//!   is taken (which clears it) and returned as a [`BridgeError`]
//! - Call-in (host into native): an `Err` or a panic is raised in the host as
//!   a pending exception; a failure that came from the host in the first
//!   place is re-raised as the original exception
//!
//! Every failure is logged at `warn` with the call site.

use crate::env::Env;
use crate::error::{BridgeError, BridgeResult};
use crate::host::{Host, HostException, HostValue};
use crate::logging;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run a call into the host and surface any failure it left pending
pub fn call_out<F>(env: &Env, site: &str, call: F) -> BridgeResult<HostValue>
where
    F: FnOnce(&dyn Host) -> HostValue,
{
    env.counters().record_call_out();
    let host = env.host();
    let value = call(host);

    if !host.exception_pending() {
        return Ok(value);
    }
    match host.take_exception() {
        Some(exception) => {
            env.counters().record_boundary_exception();
            let err = decode(exception);
            logging::log_boundary_exception("out", site, &err);
            Err(err)
        }
        None => Ok(value),
    }
}

/// Translate a host exception into the native error representation
pub fn decode(exception: HostException) -> BridgeError {
    let class = exception.class().to_string();
    let decoded = exception.message().map(|message| message.to_string_strict());

    match decoded {
        Some(Ok(message)) => BridgeError::Boundary {
            // An empty message still has to say something
            message: if message.is_empty() { class.clone() } else { message },
            class,
            code: exception.code(),
            origin: exception,
        },
        Some(Err(_)) => {
            let units = exception.message().map_or(0, |m| m.len());
            BridgeError::UndecodedBoundary {
                description: format!(
                    "{} with undecodable {units}-unit message",
                    describe_class(&class)
                ),
                origin: exception,
            }
        }
        None => BridgeError::UndecodedBoundary {
            description: format!("{} without message", describe_class(&class)),
            origin: exception,
        },
    }
}

fn describe_class(class: &str) -> &str {
    if class.is_empty() {
        "host exception"
    } else {
        class
    }
}

/// Run native code on behalf of a host caller.
///
/// Returns the result value, or `Null` after raising the failure in the host.
pub fn call_in<F>(env: &Env, site: &str, call: F) -> HostValue
where
    F: FnOnce() -> BridgeResult<HostValue>,
{
    env.counters().record_call_in();
    let err = match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => return value,
        Ok(Err(err)) => err,
        Err(payload) => BridgeError::native(panic_message(payload.as_ref())),
    };

    logging::log_boundary_exception("in", site, &err);
    raise(env.host(), &err);
    HostValue::Null
}

/// Make `err` pending on the host
pub fn raise(host: &dyn Host, err: &BridgeError) {
    host.throw(HostException::from(err));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic in native code".to_string()
    }
}
