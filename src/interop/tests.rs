//! Test suite for the interop module

use super::*;
use crate::config::{BridgeConfig, TextPolicy};
use crate::error::BridgeError;
use crate::host::local::LocalHost;
use crate::host::{HostRecord, HostString};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

fn env() -> Env {
    Env::isolated(Arc::new(LocalHost::new()), BridgeConfig::default()).unwrap()
}

fn lossy_env() -> Env {
    let mut config = BridgeConfig::default();
    config.text.policy = TextPolicy::Lossy;
    Env::isolated(Arc::new(LocalHost::new()), config).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: i32,
    y: i32,
    label: Option<String>,
}

impl Record for Point {
    const CLASS: &'static str = "geo.Point";

    fn from_native(&self, env: &Env) -> BridgeResult<HostRecord> {
        Ok(HostRecord::new(
            Self::CLASS,
            vec![self.x.to_host(env)?, self.y.to_host(env)?, self.label.to_host(env)?],
        ))
    }

    fn to_native(env: &Env, mut record: HostRecord) -> BridgeResult<Self> {
        Ok(Point {
            x: record.field(env, 0)?,
            y: record.field(env, 1)?,
            label: record.field(env, 2)?,
        })
    }
}

crate::bridge_record!(Point);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

crate::bridge_enum!(Suit as "cards.Suit" { Clubs, Diamonds, Hearts, Spades });

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sparse {
    Low = 10,
    High = 20,
}

crate::bridge_enum!(Sparse { Low, High });

fn roundtrip<T: Marshal>(env: &Env, value: &T) -> T {
    let host = value.to_host(env).unwrap();
    T::from_host(env, host).unwrap()
}

#[test]
fn test_classify_priority() {
    assert_eq!(classify::<i32>(), TypeCategory::Primitive);
    assert_eq!(classify::<String>(), TypeCategory::Primitive);
    assert_eq!(classify::<()>(), TypeCategory::Primitive);
    // Byte buffer wins over list
    assert_eq!(classify::<Vec<u8>>(), TypeCategory::Primitive);
    assert_eq!(classify::<Vec<i8>>(), TypeCategory::List);
    assert_eq!(classify::<Vec<Vec<u8>>>(), TypeCategory::List);
    assert_eq!(classify::<Option<Vec<u8>>>(), TypeCategory::Optional);
    assert_eq!(classify::<HashSet<String>>(), TypeCategory::Set);
    assert_eq!(classify::<HashMap<String, i64>>(), TypeCategory::Map);
    assert_eq!(classify::<Suit>(), TypeCategory::Enum);
    assert_eq!(classify::<Point>(), TypeCategory::Record);
}

#[test]
fn test_shape_display() {
    assert_eq!(<Vec<u8>>::SHAPE.to_string(), "binary");
    assert_eq!(<HashMap<String, Vec<i32>>>::SHAPE.to_string(), "map<string, list<i32>>");
    assert_eq!(<Option<Suit>>::SHAPE.to_string(), "optional<cards.Suit>");
}

#[test]
fn test_scalars() {
    let env = env();
    assert_eq!(true.to_host(&env).unwrap(), HostValue::Bool(true));
    assert_eq!(7u8.to_host(&env).unwrap(), HostValue::Byte(7));
    assert_eq!((-1i8).to_host(&env).unwrap(), HostValue::Byte(0xff));
    assert_eq!(i8::from_host(&env, HostValue::Byte(0x80)).unwrap(), -128);
    assert_eq!(i64::MIN.to_host(&env).unwrap(), HostValue::Long(i64::MIN));
    assert_eq!(roundtrip(&env, &-3.25f64), -3.25);
    assert!(roundtrip(&env, &f32::NAN).is_nan());
    assert_eq!(roundtrip(&env, &i16::MAX), i16::MAX);
    assert_eq!(().to_host(&env).unwrap(), HostValue::Null);
    assert!(<()>::from_host(&env, HostValue::Int(4)).is_ok());
}

#[test]
fn test_no_implicit_narrowing() {
    let env = env();
    let err = i32::from_host(&env, HostValue::Long(1)).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Marshal(MarshalError::ShapeMismatch { got: "long", .. })
    ));

    let err = i32::from_host(&env, HostValue::Null).unwrap_err();
    assert!(matches!(err, BridgeError::Marshal(MarshalError::UnexpectedNull(_))));
}

#[test]
fn test_text_roundtrip_preserves_code_points() {
    let env = env();
    for text in ["", "plain", "naïve café", "日本語", "emoji 🦀 and 𝄞"] {
        let host = text.to_string().to_host(&env).unwrap();
        if let HostValue::Str(units) = &host {
            assert_eq!(units.units().len(), text.encode_utf16().count());
        }
        assert_eq!(String::from_host(&env, host).unwrap(), text);
    }
}

#[test]
fn test_host_string_encodes_utf16() {
    let text = HostString::new("a𝄞");
    assert_eq!(text.units(), &[0x0061, 0xD834, 0xDD1E]);
    assert_eq!(text, HostString::from("a𝄞"));
    assert_eq!(HostValue::str("a𝄞"), HostValue::Str(text.clone()));
    assert_eq!(text.to_string_strict().unwrap(), "a𝄞");
}

#[test]
fn test_unpaired_surrogate_policy() {
    let broken = HostValue::Str(HostString::from_units(vec![0x0068, 0xDC00, 0x0069]));

    let err = String::from_host(&env(), broken.clone()).unwrap_err();
    assert!(matches!(err, BridgeError::Marshal(MarshalError::InvalidText(_))));

    let text = String::from_host(&lossy_env(), broken).unwrap();
    assert_eq!(text, "h\u{FFFD}i");
}

#[test]
fn test_text_from_utf8() {
    assert_eq!(text_from_utf8(&env(), "ok ✓".as_bytes()).unwrap(), "ok ✓");
    assert!(text_from_utf8(&env(), b"\xc3\x28").is_err());
    assert_eq!(text_from_utf8(&lossy_env(), b"\xe9t\xe9").unwrap(), "été");
}

#[test]
fn test_byte_buffer() {
    let env = env();
    let data = vec![0u8, 1, 254, 255];
    assert_eq!(data.to_host(&env).unwrap(), HostValue::Bytes(data.clone()));
    assert_eq!(roundtrip(&env, &data), data);
    assert_eq!(Vec::<u8>::from_host(&env, HostValue::Null).unwrap(), Vec::<u8>::new());

    // Signed bytes are an ordinary list
    let signed = vec![-1i8, 2];
    assert_eq!(
        signed.to_host(&env).unwrap(),
        HostValue::List(vec![HostValue::Byte(0xff), HostValue::Byte(2)])
    );
}

#[test]
fn test_list_preserves_order_and_count() {
    let env = env();
    let values = vec![5, -1, 5, 0, i32::MAX];
    let host = values.to_host(&env).unwrap();
    match &host {
        HostValue::List(items) => assert_eq!(items.len(), values.len()),
        other => panic!("expected list, got {other:?}"),
    }
    assert_eq!(Vec::<i32>::from_host(&env, host).unwrap(), values);
}

#[test]
fn test_null_list_is_empty() {
    let env = env();
    assert!(Vec::<String>::from_host(&env, HostValue::Null).unwrap().is_empty());
    assert!(HashSet::<i32>::from_host(&env, HostValue::Null).unwrap().is_empty());
    assert!(HashMap::<String, i32>::from_host(&env, HostValue::Null).unwrap().is_empty());
}

#[test]
fn test_nested_containers() {
    let env = env();
    let nested: Vec<Vec<Option<String>>> = vec![
        vec![Some("a".into()), None],
        vec![],
        vec![Some(String::new())],
    ];
    assert_eq!(roundtrip(&env, &nested), nested);

    let mut grouped: HashMap<String, Vec<i64>> = HashMap::new();
    grouped.insert("odd".into(), vec![1, 3]);
    grouped.insert("even".into(), vec![]);
    assert_eq!(roundtrip(&env, &grouped), grouped);
}

#[test]
fn test_optional_boxing() {
    let env = env();
    assert_eq!(Some(3i32).to_host(&env).unwrap(), HostValue::Boxed(Box::new(HostValue::Int(3))));
    assert_eq!(None::<i32>.to_host(&env).unwrap(), HostValue::Null);
    assert_eq!(Some("x".to_string()).to_host(&env).unwrap(), HostValue::str("x"));

    assert_eq!(Option::<i32>::from_host(&env, HostValue::Null).unwrap(), None);
    assert_eq!(Option::<i32>::from_host(&env, HostValue::Int(9)).unwrap(), Some(9));
    assert_eq!(roundtrip(&env, &Some(false)), Some(false));
}

#[test]
fn test_nested_optional_collapses() {
    let env = env();
    let host = Some(None::<i32>).to_host(&env).unwrap();
    assert_eq!(host, HostValue::Null);
    assert_eq!(Option::<Option<i32>>::from_host(&env, host).unwrap(), None);
}

#[test]
fn test_set_accepts_list_and_dedups() {
    let env = env();
    let host = HostValue::List(vec![HostValue::Int(1), HostValue::Int(2), HostValue::Int(1)]);
    let set = HashSet::<i32>::from_host(&env, host).unwrap();
    assert_eq!(set.len(), 2);

    let strings: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
    match strings.to_host(&env).unwrap() {
        HostValue::Set(items) => assert_eq!(items.len(), 2),
        other => panic!("expected set, got {other:?}"),
    }
}

#[test]
fn test_map_duplicate_keys_overwrite() {
    let env = env();
    let host = HostValue::Map(vec![
        (HostValue::str("k"), HostValue::Int(1)),
        (HostValue::str("j"), HostValue::Int(2)),
        (HostValue::str("k"), HostValue::Int(3)),
    ]);
    let map = BTreeMap::<String, i32>::from_host(&env, host.clone()).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["k"], 3);

    let hashed = HashMap::<String, i32>::from_host(&env, host).unwrap();
    assert_eq!(hashed["k"], 3);
}

#[test]
fn test_map_with_enum_keys() {
    let env = env();
    let mut scores = HashMap::new();
    scores.insert(Suit::Hearts, 3i32);
    scores.insert(Suit::Spades, -1);
    assert_eq!(roundtrip(&env, &scores), scores);
}

#[test]
fn test_enum_ordinals() {
    let env = env();
    assert_eq!(Suit::Clubs.to_host(&env).unwrap(), HostValue::Enum(0));
    assert_eq!(Suit::Spades.to_host(&env).unwrap(), HostValue::Enum(3));
    assert_eq!(Suit::from_host(&env, HostValue::Enum(2)).unwrap(), Suit::Hearts);

    let err = Suit::from_host(&env, HostValue::Enum(4)).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Marshal(MarshalError::EnumOrdinal { name: "cards.Suit", ordinal: 4 })
    ));
    assert!(Suit::from_host(&env, HostValue::Enum(-1)).is_err());
}

#[test]
fn test_enum_ordinal_is_position() {
    assert_eq!(Sparse::Low.ordinal(), 0);
    assert_eq!(Sparse::High.ordinal(), 1);
    assert_eq!(Sparse::from_ordinal(1), Some(Sparse::High));
    assert_eq!(Sparse::NAME, "Sparse");
}

#[test]
fn test_record_roundtrip() {
    let env = env();
    let point = Point { x: 3, y: -4, label: Some("origin-ish".into()) };
    let host = point.to_host(&env).unwrap();
    match &host {
        HostValue::Record(record) => {
            assert_eq!(record.class(), "geo.Point");
            assert_eq!(record.fields().len(), 3);
        }
        other => panic!("expected record, got {other:?}"),
    }
    assert_eq!(Point::from_host(&env, host).unwrap(), point);

    let points = vec![point.clone(), Point { x: 0, y: 0, label: None }];
    assert_eq!(roundtrip(&env, &points), points);
}

#[test]
fn test_record_class_checked() {
    let env = env();
    let other = HostValue::Record(HostRecord::new("geo.Vector", vec![]));
    let err = Point::from_host(&env, other).unwrap_err();
    assert!(matches!(err, BridgeError::Marshal(MarshalError::ShapeMismatch { .. })));

    let err = Point::from_host(&env, HostValue::Null).unwrap_err();
    assert!(matches!(err, BridgeError::Marshal(MarshalError::UnexpectedNull(_))));
}

#[test]
fn test_import_counts_failures() {
    let env = env();
    assert!(import::<i32>(&env, HostValue::str("nope")).is_err());
    assert!(export(&env, &7i32).is_ok());
    assert_eq!(env.stats().marshal_errors, 1);
}
