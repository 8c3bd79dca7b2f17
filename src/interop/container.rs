//! Container translators - optional, list, set and map
//!
//! Every container is generic over its elements and recurses through the
//! element's own `Marshal` impl. A host `Null` in place of a collection reads
//! as an empty collection.

use super::{mismatch, mismatch_shape, primitive, Marshal, TypeCategory, TypeShape};
use crate::env::Env;
use crate::error::BridgeResult;
use crate::host::HostValue;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// `None` is the host null; `Some` of a scalar travels in a nullable box.
///
/// Nested optionals collapse: `Some(None)` and `None` both become `Null`.
impl<T: Marshal> Marshal for Option<T> {
    const SHAPE: TypeShape = TypeShape::Optional(T::SHAPE_REF);

    fn to_host(&self, env: &Env) -> BridgeResult<HostValue> {
        let Some(value) = self else {
            return Ok(HostValue::Null);
        };
        let inner = value.to_host(env)?;
        if T::SHAPE.is_scalar() {
            Ok(HostValue::Boxed(Box::new(inner)))
        } else {
            Ok(inner)
        }
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Null => Ok(None),
            HostValue::Boxed(inner) => T::from_host(env, *inner).map(Some),
            other => T::from_host(env, other).map(Some),
        }
    }
}

/// Ordered list, or the host byte array when the element is `u8`
impl<T: Marshal> Marshal for Vec<T> {
    const SHAPE: TypeShape = TypeShape::Sequence(T::SHAPE_REF);

    fn to_host(&self, env: &Env) -> BridgeResult<HostValue> {
        if Self::CATEGORY == TypeCategory::Primitive {
            return primitive::bytes_to_host(env, self);
        }
        let items = self
            .iter()
            .map(|item| item.to_host(env))
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(HostValue::List(items))
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Null => Ok(Vec::new()),
            HostValue::List(items) => items
                .into_iter()
                .map(|item| T::from_host(env, item))
                .collect(),
            HostValue::Bytes(bytes) if Self::CATEGORY == TypeCategory::Primitive => {
                primitive::bytes_from_host(env, bytes)
            }
            other => Err(mismatch::<Self>(&other).into()),
        }
    }
}

fn set_items<T: Marshal>(env: &Env, shape: &TypeShape, value: HostValue) -> BridgeResult<Vec<T>> {
    match value {
        HostValue::Null => Ok(Vec::new()),
        HostValue::Set(items) | HostValue::List(items) => items
            .into_iter()
            .map(|item| T::from_host(env, item))
            .collect(),
        other => Err(mismatch_shape(shape, &other).into()),
    }
}

fn map_pairs<K: Marshal, V: Marshal>(
    env: &Env,
    shape: &TypeShape,
    value: HostValue,
) -> BridgeResult<Vec<(K, V)>> {
    match value {
        HostValue::Null => Ok(Vec::new()),
        HostValue::Map(pairs) => pairs
            .into_iter()
            .map(|(k, v)| Ok((K::from_host(env, k)?, V::from_host(env, v)?)))
            .collect(),
        other => Err(mismatch_shape(shape, &other).into()),
    }
}

fn to_host_pairs<'a, K, V>(
    env: &Env,
    pairs: impl Iterator<Item = (&'a K, &'a V)>,
) -> BridgeResult<HostValue>
where
    K: Marshal + 'a,
    V: Marshal + 'a,
{
    let pairs = pairs
        .map(|(k, v)| Ok((k.to_host(env)?, v.to_host(env)?)))
        .collect::<BridgeResult<Vec<_>>>()?;
    Ok(HostValue::Map(pairs))
}

/// Unordered set; accepts a host set or list, duplicates collapse
impl<T: Marshal + Eq + Hash> Marshal for HashSet<T> {
    const SHAPE: TypeShape = TypeShape::Unordered(T::SHAPE_REF);

    fn to_host(&self, env: &Env) -> BridgeResult<HostValue> {
        let items = self
            .iter()
            .map(|item| item.to_host(env))
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(HostValue::Set(items))
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        Ok(set_items::<T>(env, &Self::SHAPE, value)?.into_iter().collect())
    }
}

impl<T: Marshal + Ord> Marshal for BTreeSet<T> {
    const SHAPE: TypeShape = TypeShape::Unordered(T::SHAPE_REF);

    fn to_host(&self, env: &Env) -> BridgeResult<HostValue> {
        let items = self
            .iter()
            .map(|item| item.to_host(env))
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(HostValue::Set(items))
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        Ok(set_items::<T>(env, &Self::SHAPE, value)?.into_iter().collect())
    }
}

/// Keyed map; a repeated host key overwrites the earlier pair
impl<K: Marshal + Eq + Hash, V: Marshal> Marshal for HashMap<K, V> {
    const SHAPE: TypeShape = TypeShape::Keyed(K::SHAPE_REF, V::SHAPE_REF);

    fn to_host(&self, env: &Env) -> BridgeResult<HostValue> {
        to_host_pairs(env, self.iter())
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        Ok(map_pairs::<K, V>(env, &Self::SHAPE, value)?.into_iter().collect())
    }
}

impl<K: Marshal + Ord, V: Marshal> Marshal for BTreeMap<K, V> {
    const SHAPE: TypeShape = TypeShape::Keyed(K::SHAPE_REF, V::SHAPE_REF);

    fn to_host(&self, env: &Env) -> BridgeResult<HostValue> {
        to_host_pairs(env, self.iter())
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        Ok(map_pairs::<K, V>(env, &Self::SHAPE, value)?.into_iter().collect())
    }
}
