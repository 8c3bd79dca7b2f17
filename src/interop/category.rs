//! Type categories and the static classifier
//!
//! Every marshalable type carries a [`TypeShape`] as an associated constant.
//! The classifier folds a shape into one [`TypeCategory`] using a fixed
//! priority order, so a type that structurally matches several rules (a byte
//! buffer is also a sequence) always lands in the same translator.

use std::fmt;

/// Translation strategy selected for a static type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeCategory {
    Primitive,
    Optional,
    List,
    Set,
    Map,
    Enum,
    Interface,
    Record,
}

impl TypeCategory {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Primitive => "primitive",
            Self::Optional => "optional",
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structural description of a native type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeShape {
    Void,
    Bool,
    I8,
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Text,
    Timestamp,
    Interval,
    Optional(&'static TypeShape),
    Sequence(&'static TypeShape),
    Unordered(&'static TypeShape),
    Keyed(&'static TypeShape, &'static TypeShape),
    Interface(&'static str),
    Enumerated(&'static str),
    Named(&'static str),
}

impl TypeShape {
    /// Classify in priority order: primitive, optional, list, set, map,
    /// interface, enum, record.
    pub const fn category(&self) -> TypeCategory {
        if self.is_primitive() {
            TypeCategory::Primitive
        } else if matches!(self, TypeShape::Optional(_)) {
            TypeCategory::Optional
        } else if matches!(self, TypeShape::Sequence(_)) {
            TypeCategory::List
        } else if matches!(self, TypeShape::Unordered(_)) {
            TypeCategory::Set
        } else if matches!(self, TypeShape::Keyed(..)) {
            TypeCategory::Map
        } else if matches!(self, TypeShape::Interface(_)) {
            TypeCategory::Interface
        } else if matches!(self, TypeShape::Enumerated(_)) {
            TypeCategory::Enum
        } else {
            TypeCategory::Record
        }
    }

    /// Primitive rule: scalars, text, time values and raw byte buffers
    pub const fn is_primitive(&self) -> bool {
        match self {
            TypeShape::Sequence(inner) => matches!(inner, TypeShape::U8),
            _ => self.is_scalar() || matches!(self, TypeShape::Text | TypeShape::Void),
        }
    }

    /// Fixed-size values the host boxes when they are optional
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self,
            TypeShape::Bool
                | TypeShape::I8
                | TypeShape::U8
                | TypeShape::I16
                | TypeShape::I32
                | TypeShape::I64
                | TypeShape::F32
                | TypeShape::F64
                | TypeShape::Timestamp
                | TypeShape::Interval
        )
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Void => f.write_str("void"),
            TypeShape::Bool => f.write_str("bool"),
            TypeShape::I8 => f.write_str("i8"),
            TypeShape::U8 => f.write_str("u8"),
            TypeShape::I16 => f.write_str("i16"),
            TypeShape::I32 => f.write_str("i32"),
            TypeShape::I64 => f.write_str("i64"),
            TypeShape::F32 => f.write_str("f32"),
            TypeShape::F64 => f.write_str("f64"),
            TypeShape::Text => f.write_str("string"),
            TypeShape::Timestamp => f.write_str("date"),
            TypeShape::Interval => f.write_str("duration"),
            TypeShape::Sequence(TypeShape::U8) => f.write_str("binary"),
            TypeShape::Optional(inner) => write!(f, "optional<{inner}>"),
            TypeShape::Sequence(inner) => write!(f, "list<{inner}>"),
            TypeShape::Unordered(inner) => write!(f, "set<{inner}>"),
            TypeShape::Keyed(key, value) => write!(f, "map<{key}, {value}>"),
            TypeShape::Interface(name) | TypeShape::Enumerated(name) | TypeShape::Named(name) => {
                f.write_str(name)
            }
        }
    }
}
