//! Temporal adapters - epoch/tick arithmetic for time values
//!
//! Design: the host counts time in fixed-size ticks from its own epoch. A
//! [`TickClock`] describes that counter; all arithmetic runs in `i128`
//! nanoseconds so that no intermediate step can overflow.
//! - Absolute time floors toward negative infinity (sub-tick precision is
//!   dropped consistently on both sides of the epoch)
//! - Durations truncate toward zero in both directions
//! - Results that do not fit the target are `OutOfRange`, never wrapped

use crate::env::Env;
use crate::error::{BridgeResult, ConfigError, MarshalError};
use crate::host::HostValue;
use crate::interop::{mismatch, Marshal, TypeShape};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Tick counter of a host runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickClock {
    epoch_offset_secs: i64,
    tick_nanos: u32,
}

impl TickClock {
    /// 100 ns ticks since 0001-01-01T00:00:00Z
    pub const CLR: Self = Self {
        epoch_offset_secs: 62_135_596_800,
        tick_nanos: 100,
    };

    /// Milliseconds since the Unix epoch
    pub const JAVA: Self = Self {
        epoch_offset_secs: 0,
        tick_nanos: 1_000_000,
    };

    /// `epoch_offset_secs` is the distance from the host epoch to the Unix
    /// epoch; `tick_nanos` must divide one second.
    pub fn new(epoch_offset_secs: i64, tick_nanos: u32) -> Result<Self, ConfigError> {
        if tick_nanos == 0 || 1_000_000_000 % tick_nanos != 0 {
            return Err(ConfigError::Invalid(format!(
                "clock: tick length of {tick_nanos} ns does not divide one second"
            )));
        }
        Ok(Self {
            epoch_offset_secs,
            tick_nanos,
        })
    }

    pub const fn epoch_offset_secs(&self) -> i64 {
        self.epoch_offset_secs
    }

    pub const fn tick_nanos(&self) -> u32 {
        self.tick_nanos
    }

    pub const fn ticks_per_second(&self) -> i64 {
        1_000_000_000 / self.tick_nanos as i64
    }

    /// Host tick count of the Unix epoch
    pub fn unix_epoch_ticks(&self) -> i128 {
        self.epoch_offset_secs as i128 * self.ticks_per_second() as i128
    }

    /// Absolute time: nanoseconds since the Unix epoch to host ticks
    pub fn ticks_from_unix_nanos(&self, nanos: i128) -> Result<i64, MarshalError> {
        let ticks = nanos.div_euclid(self.tick_nanos as i128) + self.unix_epoch_ticks();
        i64::try_from(ticks).map_err(|_| MarshalError::OutOfRange {
            target: "host ticks",
            value: format!("{nanos} ns since the Unix epoch"),
        })
    }

    /// Absolute time: host ticks to nanoseconds since the Unix epoch
    pub fn unix_nanos_from_ticks(&self, ticks: i64) -> i128 {
        (ticks as i128 - self.unix_epoch_ticks()) * self.tick_nanos as i128
    }

    /// Duration in nanoseconds to host ticks, truncating toward zero
    pub fn ticks_from_span_nanos(&self, nanos: i128) -> Result<i64, MarshalError> {
        i64::try_from(nanos / self.tick_nanos as i128).map_err(|_| MarshalError::OutOfRange {
            target: "host ticks",
            value: format!("{nanos} ns"),
        })
    }

    /// Duration in host ticks to nanoseconds
    pub fn span_nanos_from_ticks(&self, ticks: i64) -> i128 {
        ticks as i128 * self.tick_nanos as i128
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::CLR
    }
}

fn expect_datetime<T: Marshal>(value: HostValue) -> BridgeResult<i64> {
    match value {
        HostValue::DateTime(ticks) => Ok(ticks),
        other => Err(mismatch::<T>(&other).into()),
    }
}

fn expect_timespan<T: Marshal>(value: HostValue) -> BridgeResult<i64> {
    match value {
        HostValue::TimeSpan(ticks) => Ok(ticks),
        other => Err(mismatch::<T>(&other).into()),
    }
}

fn split_nanos(nanos: i128, target: &'static str) -> Result<(i64, u32), MarshalError> {
    let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SEC)).map_err(|_| {
        MarshalError::OutOfRange {
            target,
            value: format!("{nanos} ns"),
        }
    })?;
    // rem_euclid of a positive modulus is in 0..1e9
    Ok((secs, nanos.rem_euclid(NANOS_PER_SEC) as u32))
}

impl Marshal for SystemTime {
    const SHAPE: TypeShape = TypeShape::Timestamp;

    fn to_host(&self, env: &Env) -> BridgeResult<HostValue> {
        let nanos = match self.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_nanos() as i128,
            Err(before) => -(before.duration().as_nanos() as i128),
        };
        Ok(HostValue::DateTime(env.clock().ticks_from_unix_nanos(nanos)?))
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        let ticks = expect_datetime::<Self>(value)?;
        let nanos = env.clock().unix_nanos_from_ticks(ticks);
        let out_of_range = || MarshalError::OutOfRange {
            target: "SystemTime",
            value: format!("{ticks} ticks"),
        };

        let magnitude = nanos.unsigned_abs();
        let secs = u64::try_from(magnitude / NANOS_PER_SEC as u128).map_err(|_| out_of_range())?;
        let offset = Duration::new(secs, (magnitude % NANOS_PER_SEC as u128) as u32);
        let time = if nanos >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        Ok(time.ok_or_else(out_of_range)?)
    }
}

impl Marshal for Duration {
    const SHAPE: TypeShape = TypeShape::Interval;

    fn to_host(&self, env: &Env) -> BridgeResult<HostValue> {
        let ticks = env.clock().ticks_from_span_nanos(self.as_nanos() as i128)?;
        Ok(HostValue::TimeSpan(ticks))
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        let ticks = expect_timespan::<Self>(value)?;
        if ticks < 0 {
            return Err(MarshalError::OutOfRange {
                target: "std::time::Duration",
                value: format!("{ticks} ticks"),
            }
            .into());
        }
        let (secs, subsec) = split_nanos(env.clock().span_nanos_from_ticks(ticks), "Duration")?;
        // ticks >= 0 so secs >= 0
        Ok(Duration::new(secs as u64, subsec))
    }
}

impl Marshal for DateTime<Utc> {
    const SHAPE: TypeShape = TypeShape::Timestamp;

    fn to_host(&self, env: &Env) -> BridgeResult<HostValue> {
        let nanos =
            self.timestamp() as i128 * NANOS_PER_SEC + self.timestamp_subsec_nanos() as i128;
        Ok(HostValue::DateTime(env.clock().ticks_from_unix_nanos(nanos)?))
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        let ticks = expect_datetime::<Self>(value)?;
        let (secs, subsec) =
            split_nanos(env.clock().unix_nanos_from_ticks(ticks), "DateTime<Utc>")?;
        DateTime::from_timestamp(secs, subsec).ok_or_else(|| {
            MarshalError::OutOfRange {
                target: "DateTime<Utc>",
                value: format!("{ticks} ticks"),
            }
            .into()
        })
    }
}

impl Marshal for TimeDelta {
    const SHAPE: TypeShape = TypeShape::Interval;

    fn to_host(&self, env: &Env) -> BridgeResult<HostValue> {
        let nanos = self.num_seconds() as i128 * NANOS_PER_SEC + self.subsec_nanos() as i128;
        Ok(HostValue::TimeSpan(env.clock().ticks_from_span_nanos(nanos)?))
    }

    fn from_host(env: &Env, value: HostValue) -> BridgeResult<Self> {
        let ticks = expect_timespan::<Self>(value)?;
        let (secs, subsec) = split_nanos(env.clock().span_nanos_from_ticks(ticks), "TimeDelta")?;
        TimeDelta::new(secs, subsec).ok_or_else(|| {
            MarshalError::OutOfRange {
                target: "TimeDelta",
                value: format!("{ticks} ticks"),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::host::local::LocalHost;
    use crate::interop::{classify, TypeCategory};
    use std::sync::Arc;

    const CLR_UNIX_EPOCH: i64 = 621_355_968_000_000_000;

    fn clr_env() -> Env {
        Env::isolated(Arc::new(LocalHost::new()), BridgeConfig::default()).unwrap()
    }

    fn java_env() -> Env {
        let mut config = BridgeConfig::default();
        config.clock.preset = Some(crate::config::ClockPreset::Java);
        Env::isolated(Arc::new(LocalHost::new()), config).unwrap()
    }

    #[test]
    fn test_clock_validation() {
        assert!(TickClock::new(0, 100).is_ok());
        assert!(TickClock::new(0, 0).is_err());
        assert!(TickClock::new(0, 3).is_err());
        assert_eq!(TickClock::CLR.ticks_per_second(), 10_000_000);
        assert_eq!(TickClock::JAVA.ticks_per_second(), 1_000);
    }

    #[test]
    fn test_epoch_maps_to_offset() {
        let env = clr_env();
        assert_eq!(
            UNIX_EPOCH.to_host(&env).unwrap(),
            HostValue::DateTime(CLR_UNIX_EPOCH)
        );
        assert_eq!(
            SystemTime::from_host(&env, HostValue::DateTime(CLR_UNIX_EPOCH)).unwrap(),
            UNIX_EPOCH
        );

        let java = java_env();
        assert_eq!(UNIX_EPOCH.to_host(&java).unwrap(), HostValue::DateTime(0));
    }

    #[test]
    fn test_one_tick_after_epoch() {
        let env = clr_env();
        let later = UNIX_EPOCH + Duration::from_nanos(100);
        assert_eq!(
            later.to_host(&env).unwrap(),
            HostValue::DateTime(CLR_UNIX_EPOCH + 1)
        );
    }

    #[test]
    fn test_absolute_time_floors() {
        let env = clr_env();
        let inside_tick = UNIX_EPOCH + Duration::from_nanos(150);
        assert_eq!(
            inside_tick.to_host(&env).unwrap(),
            HostValue::DateTime(CLR_UNIX_EPOCH + 1)
        );

        let before = UNIX_EPOCH - Duration::from_nanos(1);
        assert_eq!(
            before.to_host(&env).unwrap(),
            HostValue::DateTime(CLR_UNIX_EPOCH - 1)
        );
    }

    #[test]
    fn test_pre_epoch_roundtrip() {
        let env = clr_env();
        let ticks = CLR_UNIX_EPOCH - 12_345;
        let time = SystemTime::from_host(&env, HostValue::DateTime(ticks)).unwrap();
        assert_eq!(time.to_host(&env).unwrap(), HostValue::DateTime(ticks));

        let chrono_time = DateTime::<Utc>::from_host(&env, HostValue::DateTime(ticks)).unwrap();
        assert_eq!(chrono_time.to_host(&env).unwrap(), HostValue::DateTime(ticks));
    }

    #[test]
    fn test_chrono_datetime() {
        let env = clr_env();
        let time = DateTime::from_timestamp(1_700_000_000, 123_456_700).unwrap();
        let host = time.to_host(&env).unwrap();
        assert_eq!(
            host,
            HostValue::DateTime(CLR_UNIX_EPOCH + 1_700_000_000 * 10_000_000 + 1_234_567)
        );
        assert_eq!(DateTime::<Utc>::from_host(&env, host).unwrap(), time);

        // Host year 0001 is representable
        let min = DateTime::<Utc>::from_host(&env, HostValue::DateTime(0)).unwrap();
        assert_eq!(min.timestamp(), -62_135_596_800);
    }

    #[test]
    fn test_duration_truncates_toward_zero() {
        let env = clr_env();
        assert_eq!(
            Duration::from_nanos(250).to_host(&env).unwrap(),
            HostValue::TimeSpan(2)
        );
        assert_eq!(
            TimeDelta::nanoseconds(-250).to_host(&env).unwrap(),
            HostValue::TimeSpan(-2)
        );
        assert_eq!(
            TimeDelta::from_host(&env, HostValue::TimeSpan(-3)).unwrap(),
            TimeDelta::nanoseconds(-300)
        );
        assert_eq!(
            Duration::from_host(&env, HostValue::TimeSpan(15_000_000)).unwrap(),
            Duration::from_millis(1_500)
        );
    }

    #[test]
    fn test_negative_span_into_std_duration() {
        let env = clr_env();
        let err = Duration::from_host(&env, HostValue::TimeSpan(-1)).unwrap_err();
        assert!(matches!(
            err,
            crate::BridgeError::Marshal(MarshalError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_out_of_range_is_not_wrapped() {
        let env = clr_env();
        let far = Duration::from_secs(u64::MAX);
        assert!(far.to_host(&env).is_err());

        let err = SystemTime::from_host(&env, HostValue::Long(5)).unwrap_err();
        assert!(matches!(
            err,
            crate::BridgeError::Marshal(MarshalError::ShapeMismatch { got: "long", .. })
        ));
    }

    #[test]
    fn test_temporal_types_are_primitive() {
        assert_eq!(classify::<SystemTime>(), TypeCategory::Primitive);
        assert_eq!(classify::<Duration>(), TypeCategory::Primitive);
        assert_eq!(classify::<DateTime<Utc>>(), TypeCategory::Primitive);
        assert_eq!(classify::<Option<TimeDelta>>(), TypeCategory::Optional);
    }
}
