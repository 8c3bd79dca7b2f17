//! Property tests: values survive a trip to the host and back

use chrono::{DateTime, TimeDelta, Utc};
use crossbind_runtime::config::ClockPreset;
use crossbind_runtime::host::local::LocalHost;
use crossbind_runtime::{BridgeConfig, Env, HostValue, Marshal};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn env() -> Env {
    Env::isolated(Arc::new(LocalHost::new()), BridgeConfig::default()).unwrap()
}

fn java_env() -> Env {
    let mut config = BridgeConfig::default();
    config.clock.preset = Some(ClockPreset::Java);
    Env::isolated(Arc::new(LocalHost::new()), config).unwrap()
}

fn roundtrip<T: Marshal>(env: &Env, value: &T) -> T {
    let host = value.to_host(env).unwrap();
    T::from_host(env, host).unwrap()
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0).unwrap()
}

/// CLR ticks of 1970-01-01T00:00:00Z
const CLR_UNIX_EPOCH: i64 = 621_355_968_000_000_000;

proptest! {
    #[test]
    fn prop_scalars(b in any::<bool>(), x in any::<i8>(), y in any::<i16>(), z in any::<i64>()) {
        let env = env();
        prop_assert_eq!(roundtrip(&env, &b), b);
        prop_assert_eq!(roundtrip(&env, &x), x);
        prop_assert_eq!(roundtrip(&env, &y), y);
        prop_assert_eq!(roundtrip(&env, &z), z);
    }

    #[test]
    fn prop_floats_keep_bits(f in any::<f32>(), d in any::<f64>()) {
        let env = env();
        prop_assert_eq!(roundtrip(&env, &f).to_bits(), f.to_bits());
        prop_assert_eq!(roundtrip(&env, &d).to_bits(), d.to_bits());
    }

    #[test]
    fn prop_text(text in any::<String>()) {
        let env = env();
        prop_assert_eq!(roundtrip(&env, &text), text);
    }

    #[test]
    fn prop_bytes_stay_a_buffer(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let env = env();
        let host = bytes.to_host(&env).unwrap();
        prop_assert!(matches!(host, HostValue::Bytes(_)));
        prop_assert_eq!(Vec::<u8>::from_host(&env, host).unwrap(), bytes);
    }

    #[test]
    fn prop_list_keeps_order(items in proptest::collection::vec(any::<i32>(), 0..64)) {
        let env = env();
        prop_assert_eq!(roundtrip(&env, &items), items);
    }

    #[test]
    fn prop_optional(value in proptest::option::of(any::<i32>())) {
        let env = env();
        prop_assert_eq!(roundtrip(&env, &value), value);
    }

    #[test]
    fn prop_maps_and_sets(
        map in proptest::collection::hash_map(".{0,8}", any::<i64>(), 0..16),
        set in proptest::collection::btree_set(any::<i16>(), 0..16),
    ) {
        let env = env();
        prop_assert_eq!(roundtrip(&env, &map), map.clone());
        prop_assert_eq!(roundtrip(&env, &set), set);

        let sorted: BTreeMap<String, i64> = map.clone().into_iter().collect();
        prop_assert_eq!(roundtrip(&env, &sorted), sorted);
    }

    #[test]
    fn prop_nested_containers(
        groups in proptest::collection::vec(
            proptest::collection::hash_map(any::<u8>(), proptest::option::of(".{0,4}"), 0..4),
            0..4,
        )
    ) {
        let env = env();
        let value: Vec<HashMap<u8, Option<String>>> = groups;
        prop_assert_eq!(roundtrip(&env, &value), value);
    }

    #[test]
    fn prop_datetime_ticks_exact(ticks in -1_000_000_000_000_000_000i64..3_000_000_000_000_000_000i64) {
        let env = env();
        let value = DateTime::<Utc>::from_host(&env, HostValue::DateTime(ticks)).unwrap();
        prop_assert_eq!(value.to_host(&env).unwrap(), HostValue::DateTime(ticks));

        let value = SystemTime::from_host(&env, HostValue::DateTime(ticks)).unwrap();
        prop_assert_eq!(value.to_host(&env).unwrap(), HostValue::DateTime(ticks));
    }

    #[test]
    fn prop_duration_truncates_to_tick(nanos in 0u64..u64::MAX / 2) {
        let env = env();
        let back = roundtrip(&env, &Duration::from_nanos(nanos));
        prop_assert_eq!(back, Duration::from_nanos(nanos - nanos % 100));
    }

    #[test]
    fn prop_timedelta_ticks_exact(ticks in -1_000_000_000_000_000i64..1_000_000_000_000_000i64) {
        let env = env();
        let value = TimeDelta::from_host(&env, HostValue::TimeSpan(ticks)).unwrap();
        prop_assert_eq!(value.num_nanoseconds(), Some(ticks * 100));
        prop_assert_eq!(value.to_host(&env).unwrap(), HostValue::TimeSpan(ticks));
    }

    #[test]
    fn prop_java_millis(millis in -10_000_000_000_000i64..10_000_000_000_000i64) {
        let env = java_env();
        let value = DateTime::<Utc>::from_host(&env, HostValue::DateTime(millis)).unwrap();
        prop_assert_eq!(value.timestamp_millis(), millis);
        prop_assert_eq!(value.to_host(&env).unwrap(), HostValue::DateTime(millis));
    }
}

#[test]
fn test_unix_epoch_is_clock_offset() {
    let env = env();
    let epoch = unix_epoch();
    assert_eq!(epoch.to_host(&env).unwrap(), HostValue::DateTime(CLR_UNIX_EPOCH));

    let one_tick = DateTime::<Utc>::from_host(&env, HostValue::DateTime(CLR_UNIX_EPOCH + 1)).unwrap();
    assert_eq!(one_tick.timestamp_nanos_opt(), Some(100));
}

#[test]
fn test_sub_tick_instants_floor() {
    let env = env();
    let before_epoch = unix_epoch() - TimeDelta::nanoseconds(1);
    assert_eq!(
        before_epoch.to_host(&env).unwrap(),
        HostValue::DateTime(CLR_UNIX_EPOCH - 1)
    );

    let after_epoch = unix_epoch() + TimeDelta::nanoseconds(99);
    assert_eq!(after_epoch.to_host(&env).unwrap(), HostValue::DateTime(CLR_UNIX_EPOCH));
}

#[test]
fn test_sets_accept_lists() {
    let env = env();
    let host = HostValue::List(vec![HostValue::Short(3), HostValue::Short(1), HostValue::Short(3)]);
    let set = BTreeSet::<i16>::from_host(&env, host).unwrap();
    assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![1, 3]);
}
