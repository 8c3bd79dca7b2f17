//! Record and enum adapters
//!
//! Records are opaque to the runtime: an adapter (usually generated) knows how
//! to lay a native struct out as positional host fields and back. The runtime
//! only checks that the host value is a record of the adapter's class.
//!
//! Enums travel as ordinals. Native variant N is host ordinal N.

use super::{mismatch_shape, TypeShape};
use crate::env::Env;
use crate::error::{BridgeResult, MarshalError};
use crate::host::{HostRecord, HostValue};

/// Adapter contract for a value record
pub trait Record: Sized {
    /// Host class name
    const CLASS: &'static str;

    /// Lay the native value out as host fields
    fn from_native(&self, env: &Env) -> BridgeResult<HostRecord>;

    /// Rebuild the native value from host fields
    fn to_native(env: &Env, record: HostRecord) -> BridgeResult<Self>;
}

/// Adapter contract for a field-less enum
pub trait Enumeration: Sized + Copy {
    /// Host enum name
    const NAME: &'static str;

    fn ordinal(self) -> i32;

    fn from_ordinal(ordinal: i32) -> Option<Self>;
}

pub fn record_to_host<R: Record>(value: &R, env: &Env) -> BridgeResult<HostValue> {
    let record = value.from_native(env)?;
    debug_assert_eq!(record.class(), R::CLASS, "record adapter produced another class");
    Ok(HostValue::Record(record))
}

pub fn record_from_host<R: Record>(env: &Env, value: HostValue) -> BridgeResult<R> {
    match value {
        HostValue::Record(record) if record.class() == R::CLASS => R::to_native(env, record),
        HostValue::Record(record) => Err(MarshalError::ShapeMismatch {
            expected: format!("{} (host sent {})", R::CLASS, record.class()),
            got: "record",
        }
        .into()),
        other => Err(mismatch_shape(&TypeShape::Named(R::CLASS), &other).into()),
    }
}

pub fn enum_to_host<E: Enumeration>(value: E) -> HostValue {
    HostValue::Enum(value.ordinal())
}

pub fn enum_from_host<E: Enumeration>(value: HostValue) -> BridgeResult<E> {
    match value {
        HostValue::Enum(ordinal) => E::from_ordinal(ordinal).ok_or_else(|| {
            MarshalError::EnumOrdinal {
                name: E::NAME,
                ordinal,
            }
            .into()
        }),
        other => Err(mismatch_shape(&TypeShape::Enumerated(E::NAME), &other).into()),
    }
}

/// Implement [`Marshal`](crate::Marshal) for a type that implements
/// [`Record`](crate::interop::Record).
///
/// ```ignore
/// impl Record for Point { const CLASS: &'static str = "geo.Point"; /* ... */ }
/// bridge_record!(Point);
/// ```
#[macro_export]
macro_rules! bridge_record {
    ($ty:ty) => {
        impl $crate::Marshal for $ty {
            const SHAPE: $crate::TypeShape =
                $crate::TypeShape::Named(<$ty as $crate::interop::Record>::CLASS);

            fn to_host(&self, env: &$crate::Env) -> $crate::BridgeResult<$crate::HostValue> {
                $crate::interop::record_to_host(self, env)
            }

            fn from_host(
                env: &$crate::Env,
                value: $crate::HostValue,
            ) -> $crate::BridgeResult<Self> {
                $crate::interop::record_from_host(env, value)
            }
        }
    };
}

/// Implement [`Enumeration`](crate::interop::Enumeration) and
/// [`Marshal`](crate::Marshal) for a field-less `Copy` enum.
///
/// Ordinals follow the order the variants are listed in, which must be the
/// declaration order and must name every variant.
///
/// ```ignore
/// bridge_enum!(Color as "ui.Color" { Red, Green, Blue });
/// ```
#[macro_export]
macro_rules! bridge_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        $crate::bridge_enum!(@impl $ty, stringify!($ty), [$($variant),+]);
    };
    ($ty:ident as $name:literal { $($variant:ident),+ $(,)? }) => {
        $crate::bridge_enum!(@impl $ty, $name, [$($variant),+]);
    };
    (@impl $ty:ident, $name:expr, [$($variant:ident),+]) => {
        impl $crate::interop::Enumeration for $ty {
            const NAME: &'static str = $name;

            fn ordinal(self) -> i32 {
                const VARIANTS: &[$ty] = &[$($ty::$variant),+];
                VARIANTS
                    .iter()
                    .position(|v| *v as i32 == self as i32)
                    .map_or(-1, |index| index as i32)
            }

            fn from_ordinal(ordinal: i32) -> Option<Self> {
                const VARIANTS: &[$ty] = &[$($ty::$variant),+];
                usize::try_from(ordinal)
                    .ok()
                    .and_then(|index| VARIANTS.get(index))
                    .copied()
            }
        }

        impl $crate::Marshal for $ty {
            const SHAPE: $crate::TypeShape = $crate::TypeShape::Enumerated(
                <$ty as $crate::interop::Enumeration>::NAME,
            );

            fn to_host(&self, _env: &$crate::Env) -> $crate::BridgeResult<$crate::HostValue> {
                Ok($crate::interop::enum_to_host(*self))
            }

            fn from_host(
                _env: &$crate::Env,
                value: $crate::HostValue,
            ) -> $crate::BridgeResult<Self> {
                $crate::interop::enum_from_host(value)
            }
        }
    };
}
