//! Host runtime contract
//!
//! Design: the runtime never talks to a VM directly. Everything it needs from
//! the foreign side goes through two traits:
//! - [`Host`] - call convention, pending exceptions, durable references and
//!   thread attachment
//! - [`ForeignObject`] - a live foreign object with a stable identity
//!
//! Architecture:
//! - `value.rs` - foreign value model (`HostValue`, `HostString`, `HostRecord`)
//! - `local.rs` - in-process host used for loopback embedding and tests

mod value;
pub mod local;

pub use value::{HostRecord, HostString, HostValue};

use crate::error::{BridgeError, BridgeResult, MarshalError};
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Durable reference to a foreign object
pub type ForeignRef = Arc<dyn ForeignObject>;

/// Stable identity token of a live foreign object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

impl ObjectId {
    /// Allocate a process-unique identity
    pub fn fresh() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Identity from a host-provided token
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A live object owned by the foreign runtime
pub trait ForeignObject: Send + Sync + 'static {
    /// Identity token, stable for the object's lifetime
    fn identity(&self) -> ObjectId;

    /// Foreign class name (diagnostics only)
    fn class_name(&self) -> &str;

    /// Handle a method call issued through `host`.
    ///
    /// Failures are left pending on the host, the return value is then ignored.
    fn receive(&self, host: &dyn Host, method: &str, args: Args) -> HostValue;

    fn as_any(&self) -> &dyn Any;
}

/// Call convention of a foreign runtime
pub trait Host: Send + Sync + 'static {
    /// Runtime name for diagnostics
    fn name(&self) -> &str;

    /// Acquire a reference that stays valid beyond the current call
    fn retain(&self, object: &ForeignRef) -> ForeignRef;

    /// Release a reference obtained from [`Host::retain`]
    fn release(&self, object: ForeignRef);

    /// Call `method` on `target`; a failure is left pending on the calling thread
    fn invoke(&self, target: &ForeignRef, method: &str, args: Args) -> HostValue;

    /// Did the last call on this thread raise?
    fn exception_pending(&self) -> bool;

    /// Retrieve and clear the pending exception of this thread
    fn take_exception(&self) -> Option<HostException>;

    /// Make `exception` pending on this thread
    fn throw(&self, exception: HostException);

    fn is_thread_attached(&self) -> bool;

    fn attach_thread(&self) -> BridgeResult<()>;

    fn detach_thread(&self);
}

/// A foreign exception as reported by the host
#[derive(Clone, PartialEq, Eq)]
pub struct HostException {
    class: String,
    message: Option<HostString>,
    code: Option<i32>,
}

impl HostException {
    pub fn new(class: impl Into<String>, message: &str) -> Self {
        Self {
            class: class.into(),
            message: Some(HostString::new(message)),
            code: None,
        }
    }

    /// Exception carrying raw, possibly undecodable message units
    pub fn with_raw_message(class: impl Into<String>, message: Option<HostString>) -> Self {
        Self {
            class: class.into(),
            message,
            code: None,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn message(&self) -> Option<&HostString> {
        self.message.as_ref()
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl fmt::Debug for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostException")
            .field("class", &self.class)
            .field("message", &self.message)
            .field("code", &self.code)
            .finish()
    }
}

impl From<&BridgeError> for HostException {
    fn from(err: &BridgeError) -> Self {
        match err {
            BridgeError::Boundary { origin, .. } | BridgeError::UndecodedBoundary { origin, .. } => {
                origin.clone()
            }
            BridgeError::Marshal(inner) => {
                HostException::new("crossbind.MarshalingException", &inner.to_string())
            }
            BridgeError::IdentityCache(inner) => {
                HostException::new("crossbind.IdentityCacheException", &inner.to_string())
            }
            BridgeError::Native(message) => HostException::new("crossbind.NativeException", message),
            BridgeError::ThreadAttach(message) => {
                HostException::new("crossbind.ThreadAttachException", message)
            }
        }
    }
}

/// Already-translated call arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(SmallVec<[HostValue; 4]>);

impl Args {
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    pub fn push(&mut self, value: HostValue) {
        self.0.push(value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HostValue> {
        self.0.get(index)
    }

    /// Fail unless exactly `expected` arguments were passed
    pub fn expect_len(&self, method: &str, expected: usize) -> Result<(), MarshalError> {
        if self.0.len() != expected {
            return Err(MarshalError::ArgumentCount {
                method: method.to_string(),
                expected,
                got: self.0.len(),
            });
        }
        Ok(())
    }

    /// Take argument `index` out of the list, leaving `Null` behind
    pub fn take(&mut self, index: usize) -> HostValue {
        self.0.get_mut(index).map(std::mem::take).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostValue> {
        self.0.iter()
    }
}

impl From<Vec<HostValue>> for Args {
    fn from(values: Vec<HostValue>) -> Self {
        Self(SmallVec::from_vec(values))
    }
}

impl FromIterator<HostValue> for Args {
    fn from_iter<I: IntoIterator<Item = HostValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Translate native values into [`Args`].
///
/// ```ignore
/// let args = host_args!(env; items, 42i32)?;
/// ```
#[macro_export]
macro_rules! host_args {
    ($env:expr; $($arg:expr),* $(,)?) => {{
        let env: &$crate::Env = $env;
        (|| -> $crate::BridgeResult<$crate::host::Args> {
            let mut args = $crate::host::Args::new();
            $( args.push($crate::Marshal::to_host(&$arg, env)?); )*
            Ok(args)
        })()
    }};
}
