//! Error types for the marshaling runtime
//!
//! Every failure crossing the boundary ends up as a [`BridgeError`]. The
//! variants follow the three families of the runtime: value shape problems
//! ([`MarshalError`]), failures raised by the other side (`Boundary` and
//! `UndecodedBoundary`) and proxy cache invariant violations
//! ([`IdentityCacheError`]).

use crate::host::HostException;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Top-level bridge error
#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    /// A value did not match its declared category
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// The foreign callee raised an exception that decoded cleanly
    #[error("{class}: {message}")]
    Boundary {
        /// Foreign exception class
        class: String,
        /// Decoded diagnostic message
        message: String,
        /// Optional numeric code carried by the exception
        code: Option<i32>,
        /// The exception as the host reported it
        origin: HostException,
    },

    /// The foreign callee raised an exception whose payload could not be decoded
    #[error("boundary exception: {description}")]
    UndecodedBoundary {
        /// Best-effort description of the undecoded payload
        description: String,
        /// The exception as the host reported it
        origin: HostException,
    },

    /// The proxy cache found a state it should never be in
    #[error(transparent)]
    IdentityCache(#[from] IdentityCacheError),

    /// A native implementation failed or panicked
    #[error("native failure: {0}")]
    Native(String),

    /// The host refused to attach the calling thread
    #[error("thread attach failed: {0}")]
    ThreadAttach(String),
}

impl BridgeError {
    /// Failure reported by native code on behalf of a foreign caller
    pub fn native(message: impl Into<String>) -> Self {
        BridgeError::Native(message.into())
    }

    /// Whether this failure was raised by the foreign side
    pub fn is_boundary(&self) -> bool {
        matches!(
            self,
            BridgeError::Boundary { .. } | BridgeError::UndecodedBoundary { .. }
        )
    }

    /// The original host exception, when the failure came from the host
    pub fn host_exception(&self) -> Option<&HostException> {
        match self {
            BridgeError::Boundary { origin, .. } | BridgeError::UndecodedBoundary { origin, .. } => {
                Some(origin)
            }
            _ => None,
        }
    }
}

/// Value shape errors raised by translators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarshalError {
    /// Foreign value kind does not match the declared native shape
    #[error("type mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Declared native shape
        expected: String,
        /// Kind of the foreign value
        got: &'static str,
    },

    /// Foreign null in a slot that is not optional
    #[error("unexpected null for non-optional {0}")]
    UnexpectedNull(String),

    /// Text that cannot be re-encoded without losing code points
    #[error("invalid text: {0}")]
    InvalidText(String),

    /// Numeric or temporal value outside the target range
    #[error("{value} is out of range for {target}")]
    OutOfRange {
        /// Target type name
        target: &'static str,
        /// Rendered source value
        value: String,
    },

    /// Enum ordinal with no matching variant
    #[error("ordinal {ordinal} has no variant in enum {name}")]
    EnumOrdinal {
        /// Enum name
        name: &'static str,
        /// Offending ordinal
        ordinal: i32,
    },

    /// A forwarded call received the wrong number of arguments
    #[error("{method}: expected {expected} arguments, got {got}")]
    ArgumentCount {
        /// Method being dispatched
        method: String,
        /// Arity expected by the thunk
        expected: usize,
        /// Arity received
        got: usize,
    },
}

/// Proxy cache invariant violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityCacheError {
    /// An entry exists for the key but holds a proxy of another type
    #[error("cache {cache}: entry for object {object} holds a proxy of another type than {expected}")]
    ConflictingProxy {
        /// Cache name
        cache: &'static str,
        /// Raw object key
        object: u64,
        /// Expected proxy type
        expected: &'static str,
    },
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for the schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but holds an unusable value
    #[error("invalid config: {0}")]
    Invalid(String),
}
