//! Primitive translators - scalars, text, byte buffers and void
//!
//! Numeric kinds map one-to-one onto host kinds with no implicit widening or
//! narrowing. `i8` is reinterpreted as the host's unsigned byte.

use super::{mismatch, Marshal, TypeShape};
use crate::config::TextPolicy;
use crate::env::Env;
use crate::error::{BridgeResult, MarshalError};
use crate::host::{HostString, HostValue};
use tracing::warn;

macro_rules! impl_scalar {
    ($ty:ty, $shape:ident, $variant:ident) => {
        impl Marshal for $ty {
            const SHAPE: TypeShape = TypeShape::$shape;

            #[inline]
            fn to_host(&self, _env: &Env) -> BridgeResult<HostValue> {
                Ok(HostValue::$variant(*self))
            }

            #[inline]
            fn from_host(_env: &Env, value: HostValue) -> BridgeResult<Self> {
                match value {
                    HostValue::$variant(v) => Ok(v),
                    other => Err(mismatch::<Self>(&other).into()),
                }
            }
        }
    };
}

impl_scalar!(bool, Bool, Bool);
impl_scalar!(u8, U8, Byte);
impl_scalar!(i16, I16, Short);
impl_scalar!(i32, I32, Int);
impl_scalar!(i64, I64, Long);
impl_scalar!(f32, F32, Float);
impl_scalar!(f64, F64, Double);

impl Marshal for i8 {
    const SHAPE: TypeShape = TypeShape::I8;

    #[inline]
    fn to_host(&self, _env: &Env) -> BridgeResult<HostValue> {
        Ok(HostValue::Byte(*self as u8))
    }

    #[inline]
    fn from_host(_env: &Env, value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Byte(b) => Ok(b as i8),
            other => Err(mismatch::<Self>(&other).into()),
        }
    }
}

/// Void: the host value, if any, is discarded
impl Marshal for () {
    const SHAPE: TypeShape = TypeShape::Void;

    fn to_host(&self, _env: &Env) -> BridgeResult<HostValue> {
        Ok(HostValue::Null)
    }

    fn from_host(_env: &Env, _value: HostValue) -> BridgeResult<Self> {
        Ok(())
    }
}

impl Marshal for String {
    const SHAPE: TypeShape = TypeShape::Text;

    fn to_host(&self, _env: &Env) -> BridgeResult<HostValue> {
        Ok(HostValue::Str(HostString::new(self)))
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Str(text) => decode_host_string(env.text_policy(), &text),
            other => Err(mismatch::<Self>(&other).into()),
        }
    }
}

fn decode_host_string(policy: TextPolicy, text: &HostString) -> BridgeResult<String> {
    match text.to_string_strict() {
        Ok(decoded) => Ok(decoded),
        Err(err) if policy == TextPolicy::Lossy => {
            warn!(event = "lossy_text", units = text.len(), error = %err, "Replacing unpaired surrogates");
            Ok(text.to_string_lossy())
        }
        Err(err) => Err(err.into()),
    }
}

/// Decode native bytes that are supposed to hold text.
///
/// Under [`TextPolicy::Strict`] the bytes must be UTF-8. Under
/// [`TextPolicy::Lossy`] invalid input is widened byte by byte as Latin-1,
/// which never fails but does not reproduce the original characters.
pub fn text_from_utf8(env: &Env, bytes: &[u8]) -> BridgeResult<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_owned()),
        Err(err) if env.text_policy() == TextPolicy::Lossy => {
            warn!(event = "lossy_text", bytes = bytes.len(), error = %err, "Widening bytes as Latin-1");
            Ok(widen_bytes(bytes))
        }
        Err(err) => Err(MarshalError::InvalidText(format!(
            "{err} in {}-byte native buffer",
            bytes.len()
        ))
        .into()),
    }
}

fn widen_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Byte buffer to the host's native byte array
pub(super) fn bytes_to_host<T: Marshal>(env: &Env, items: &[T]) -> BridgeResult<HostValue> {
    let mut bytes = Vec::with_capacity(items.len());
    for item in items {
        match item.to_host(env)? {
            HostValue::Byte(b) => bytes.push(b),
            other => return Err(mismatch::<u8>(&other).into()),
        }
    }
    Ok(HostValue::Bytes(bytes))
}

/// Host byte array to a byte buffer
pub(super) fn bytes_from_host<T: Marshal>(env: &Env, bytes: Vec<u8>) -> BridgeResult<Vec<T>> {
    bytes
        .into_iter()
        .map(|b| T::from_host(env, HostValue::Byte(b)))
        .collect()
}
