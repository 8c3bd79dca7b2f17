//! Value representations on the foreign side of the boundary
//!
//! Mirrors what a managed VM or component-object runtime hands across a call:
//! boxed scalars, UTF-16 strings, collections and object references.

use super::{ForeignRef, ObjectId};
use crate::env::Env;
use crate::error::{BridgeResult, MarshalError};
use crate::interop::Marshal;
use std::fmt;

/// UTF-16 string as held by the host runtime
///
/// May contain unpaired surrogates; decoding to native text is checked.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct HostString(Vec<u16>);

impl HostString {
    /// Encode native text (always valid)
    pub fn new(text: &str) -> Self {
        Self(text.encode_utf16().collect())
    }

    /// Wrap raw code units without validation
    pub fn from_units(units: Vec<u16>) -> Self {
        Self(units)
    }

    /// Raw code units
    pub fn units(&self) -> &[u16] {
        &self.0
    }

    /// Length in code units
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode, failing on unpaired surrogates
    pub fn to_string_strict(&self) -> Result<String, MarshalError> {
        String::from_utf16(&self.0).map_err(|_| {
            MarshalError::InvalidText(format!(
                "unpaired surrogate in {}-unit host string",
                self.0.len()
            ))
        })
    }

    /// Decode, replacing unpaired surrogates with U+FFFD
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }
}

impl From<&str> for HostString {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Debug for HostString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

/// Foreign record instance: class name plus positional fields
#[derive(Debug, Clone, PartialEq)]
pub struct HostRecord {
    class: String,
    fields: Vec<HostValue>,
}

impl HostRecord {
    pub fn new(class: impl Into<String>, fields: Vec<HostValue>) -> Self {
        Self {
            class: class.into(),
            fields,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn fields(&self) -> &[HostValue] {
        &self.fields
    }

    /// Take field `index` and translate it to a native value.
    ///
    /// The slot is left as `Null`; a missing field reads as `Null`.
    pub fn field<T: Marshal>(&mut self, env: &Env, index: usize) -> BridgeResult<T> {
        let value = self
            .fields
            .get_mut(index)
            .map(std::mem::take)
            .unwrap_or_default();
        T::from_host(env, value)
    }
}

/// A value as seen by the foreign runtime
#[derive(Clone, Default)]
pub enum HostValue {
    #[default]
    Null,
    Bool(bool),
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(HostString),
    Bytes(Vec<u8>),
    /// Nullable box around a scalar (`Integer`, `IntRef`, ...)
    Boxed(Box<HostValue>),
    List(Vec<HostValue>),
    Set(Vec<HostValue>),
    /// Pairs in enumeration order; keys may repeat
    Map(Vec<(HostValue, HostValue)>),
    Enum(i32),
    Record(HostRecord),
    /// Absolute time in host ticks
    DateTime(i64),
    /// Duration in host ticks
    TimeSpan(i64),
    Object(ForeignRef),
}

impl HostValue {
    /// Host string from native text
    pub fn str(text: &str) -> Self {
        HostValue::Str(HostString::new(text))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Kind name used in diagnostics
    pub const fn kind(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Byte(_) => "byte",
            HostValue::Short(_) => "short",
            HostValue::Int(_) => "int",
            HostValue::Long(_) => "long",
            HostValue::Float(_) => "float",
            HostValue::Double(_) => "double",
            HostValue::Str(_) => "string",
            HostValue::Bytes(_) => "byte[]",
            HostValue::Boxed(_) => "boxed",
            HostValue::List(_) => "list",
            HostValue::Set(_) => "set",
            HostValue::Map(_) => "map",
            HostValue::Enum(_) => "enum",
            HostValue::Record(_) => "record",
            HostValue::DateTime(_) => "datetime",
            HostValue::TimeSpan(_) => "timespan",
            HostValue::Object(_) => "object",
        }
    }

    /// Identity of an object reference
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            HostValue::Object(object) => Some(object.identity()),
            _ => None,
        }
    }
}

// Floats compare by bit pattern and objects by identity, so that a value
// always equals its own copy.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        use HostValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Byte(a), Byte(b)) => a == b,
            (Short(a), Short(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Str(a), Str(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Boxed(a), Boxed(b)) => a == b,
            (List(a), List(b)) | (Set(a), Set(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Enum(a), Enum(b)) => a == b,
            (Record(a), Record(b)) => a == b,
            (DateTime(a), DateTime(b)) | (TimeSpan(a), TimeSpan(b)) => a == b,
            (Object(a), Object(b)) => a.identity() == b.identity(),
            _ => false,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use HostValue::*;
        match self {
            Null => write!(f, "Null"),
            Bool(v) => write!(f, "Bool({v})"),
            Byte(v) => write!(f, "Byte({v})"),
            Short(v) => write!(f, "Short({v})"),
            Int(v) => write!(f, "Int({v})"),
            Long(v) => write!(f, "Long({v})"),
            Float(v) => write!(f, "Float({v})"),
            Double(v) => write!(f, "Double({v})"),
            Str(v) => write!(f, "Str({v:?})"),
            Bytes(v) => write!(f, "Bytes({v:?})"),
            Boxed(v) => write!(f, "Boxed({v:?})"),
            List(v) => f.debug_tuple("List").field(v).finish(),
            Set(v) => f.debug_tuple("Set").field(v).finish(),
            Map(v) => f.debug_tuple("Map").field(v).finish(),
            Enum(v) => write!(f, "Enum({v})"),
            Record(v) => write!(f, "{v:?}"),
            DateTime(v) => write!(f, "DateTime({v})"),
            TimeSpan(v) => write!(f, "TimeSpan({v})"),
            Object(v) => write!(f, "Object({}#{})", v.class_name(), v.identity().raw()),
        }
    }
}
