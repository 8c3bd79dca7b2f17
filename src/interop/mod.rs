//! Interoperability - value translation across the boundary
//!
//! Design: every native type that can cross the boundary implements
//! [`Marshal`]. Its [`TypeShape`] is an associated constant, so the category
//! (and with it the translation strategy) is fixed per static type at compile
//! time and never re-derived from runtime values.
//!
//! Architecture:
//! - `category.rs` - `TypeShape`, `TypeCategory`, the priority classifier
//! - `primitive.rs` - scalars, text, byte buffers, void
//! - `container.rs` - optional, list, set, map (recursive over the element)
//! - `record.rs` - record and enum adapter contracts plus their macros
//!
//! Interface handles (`Arc<dyn Trait>`) implement `Marshal` in `proxy`, time
//! values in `temporal`.

mod category;
mod container;
mod primitive;
mod record;

pub use category::{TypeCategory, TypeShape};
pub use primitive::text_from_utf8;
pub use record::{enum_from_host, enum_to_host, record_from_host, record_to_host, Enumeration, Record};

use crate::env::Env;
use crate::error::{BridgeResult, MarshalError};
use crate::host::HostValue;
use tracing::debug;

/// Bidirectional translation between a native type and host values
pub trait Marshal: Sized {
    /// Static structure of the type
    const SHAPE: TypeShape;

    /// `'static` handle on `SHAPE` for building container shapes
    #[doc(hidden)]
    const SHAPE_REF: &'static TypeShape = &Self::SHAPE;

    /// Translation strategy, resolved once per type
    const CATEGORY: TypeCategory = Self::SHAPE.category();

    /// Native to foreign
    fn to_host(&self, env: &Env) -> BridgeResult<HostValue>;

    /// Foreign to native
    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self>;
}

/// Category of `T`
pub const fn classify<T: Marshal>() -> TypeCategory {
    T::CATEGORY
}

/// Shape mismatch for a value that arrived as the wrong kind
pub(crate) fn mismatch<T: Marshal>(got: &HostValue) -> MarshalError {
    mismatch_shape(&T::SHAPE, got)
}

pub(crate) fn mismatch_shape(expected: &TypeShape, got: &HostValue) -> MarshalError {
    if got.is_null() {
        MarshalError::UnexpectedNull(expected.to_string())
    } else {
        MarshalError::ShapeMismatch {
            expected: expected.to_string(),
            got: got.kind(),
        }
    }
}

/// Translate to the host, counting failures on the environment
pub fn export<T: Marshal>(env: &Env, value: &T) -> BridgeResult<HostValue> {
    value.to_host(env).map_err(|err| {
        env.counters().record_marshal_error();
        debug!(event = "marshal_error", direction = "to_host", shape = %T::SHAPE, error = %err);
        err
    })
}

/// Translate from the host, counting failures on the environment
pub fn import<T: Marshal>(env: &Env, value: HostValue) -> BridgeResult<T> {
    T::from_host(env, value).map_err(|err| {
        env.counters().record_marshal_error();
        debug!(event = "marshal_error", direction = "from_host", shape = %T::SHAPE, error = %err);
        err
    })
}

#[cfg(test)]
mod tests;
