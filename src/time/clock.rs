//! Session Clock
//!
//! Wraps `std::time::Instant` behind a process-wide epoch so that timestamps are
//! plain integers. Every stage of the pipeline measures elapsed time with
//! [`Timestamp::duration_since`], which saturates instead of panicking.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Process-wide epoch, captured once on first use
static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Access to the process-wide monotonic epoch.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock;

impl SessionClock {
    /// Pin the epoch. Optional; the first call to [`Timestamp::now`] does the same.
    pub fn init() {
        EPOCH.get_or_init(Instant::now);
    }

    /// Nanoseconds elapsed since the epoch.
    #[inline]
    pub fn now_nanos() -> u64 {
        let epoch = *EPOCH.get_or_init(Instant::now);
        // u64 nanoseconds cover ~584 years of uptime
        epoch.elapsed().as_nanos() as u64
    }
}

/// A point in time, stored as nanoseconds since the session epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Capture the current timestamp.
    #[inline]
    pub fn now() -> Self {
        Self(SessionClock::now_nanos())
    }

    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000_000)
    }

    /// Build a timestamp from fractional seconds. Negative input clamps to zero.
    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs.max(0.0) * 1_000_000_000.0).round() as u64)
    }

    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Elapsed time since `earlier`; zero if `earlier` is in the future.
    #[inline]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// This timestamp shifted forward by `delta`.
    #[inline]
    pub fn advanced_by(&self, delta: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(delta.as_nanos() as u64))
    }

    #[inline]
    pub fn is_after(&self, other: Timestamp) -> bool {
        self.0 > other.0
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        self.advanced_by(rhs)
    }
}

impl serde::Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Timestamp(nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonicity() {
        SessionClock::init();
        let t1 = Timestamp::now();
        std::thread::sleep(Duration::from_micros(100));
        let t2 = Timestamp::now();

        assert!(t2.is_after(t1));
        assert!(t2.duration_since(t1) >= Duration::from_micros(100));
    }

    #[test]
    fn test_duration_since_saturates() {
        let t1 = Timestamp::from_millis(1000);
        let t2 = Timestamp::from_millis(500);
        assert_eq!(t2.duration_since(t1), Duration::ZERO);
    }

    #[test]
    fn test_unit_constructors_agree() {
        assert_eq!(Timestamp::from_millis(1500), Timestamp::from_secs_f64(1.5));
        assert_eq!(Timestamp::from_nanos(2_000_000).as_millis(), 2);
        assert_eq!(Timestamp::from_secs_f64(-3.0), Timestamp::default());
    }

    #[test]
    fn test_advance() {
        let t = Timestamp::from_millis(100) + Duration::from_millis(250);
        assert_eq!(t.as_millis(), 350);
    }

    #[test]
    fn test_timestamp_serialization() {
        let ts = Timestamp::from_nanos(123456789);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "123456789");

        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
