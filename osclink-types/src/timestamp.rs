//! NTP64 time tags.
//!
//! Upper 32 bits: seconds since 1900-01-01T00:00:00Z.
//! Lower 32 bits: fraction of a second in units of 2^-32 s.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

const NANOS_PER_SEC: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Reserved time tag meaning "dispatch as soon as received".
    pub const IMMEDIATE: Timestamp = Timestamp(1);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn from_parts(seconds: u32, fraction: u32) -> Self {
        Self(((seconds as u64) << 32) | fraction as u64)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn seconds(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn fraction(self) -> u32 {
        self.0 as u32
    }

    pub const fn is_immediate(self) -> bool {
        self.0 == Self::IMMEDIATE.0
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Time tag `delay` from now.
    pub fn after(delay: Duration) -> Self {
        Self::from_system_time(SystemTime::now() + delay)
    }

    /// Convert wall-clock time, going through the 1900 epoch.
    ///
    /// Seconds wrap modulo 2^32 (NTP eras); times before 1900 are not
    /// representable and wrap as well.
    pub fn from_system_time(time: SystemTime) -> Self {
        let (secs, nanos) = match time.duration_since(UNIX_EPOCH) {
            Ok(since) => (
                NTP_UNIX_OFFSET.wrapping_add(since.as_secs()),
                since.subsec_nanos() as u64,
            ),
            Err(err) => {
                let before = err.duration();
                let mut secs = NTP_UNIX_OFFSET.wrapping_sub(before.as_secs());
                let mut nanos = before.subsec_nanos() as u64;
                if nanos > 0 {
                    secs = secs.wrapping_sub(1);
                    nanos = NANOS_PER_SEC - nanos;
                }
                (secs, nanos)
            }
        };
        let fraction = (nanos << 32) / NANOS_PER_SEC;
        Self::from_parts(secs as u32, fraction as u32)
    }

    /// Wall-clock time of this tag within NTP era 0.
    pub fn to_system_time(self) -> SystemTime {
        let secs = self.seconds() as u64;
        let nanos = Duration::from_nanos((self.fraction() as u64 * NANOS_PER_SEC) >> 32);
        if secs >= NTP_UNIX_OFFSET {
            UNIX_EPOCH + Duration::from_secs(secs - NTP_UNIX_OFFSET) + nanos
        } else {
            UNIX_EPOCH - Duration::from_secs(NTP_UNIX_OFFSET - secs) + nanos
        }
    }
}

impl From<u64> for Timestamp {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_immediate() {
            return f.write_str("immediate");
        }
        let millis = (self.fraction() as u64 * 1000) >> 32;
        write!(f, "{}.{:03}", self.seconds(), millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_maps_to_ntp_offset() {
        let ts = Timestamp::from_system_time(UNIX_EPOCH);
        assert_eq!(ts.seconds() as u64, NTP_UNIX_OFFSET);
        assert_eq!(ts.fraction(), 0);
        assert_eq!(ts.to_system_time(), UNIX_EPOCH);
    }

    #[test]
    fn fraction_is_scaled_not_raw_millis() {
        let half = UNIX_EPOCH + Duration::from_millis(1500);
        let ts = Timestamp::from_system_time(half);
        assert_eq!(ts.seconds() as u64, NTP_UNIX_OFFSET + 1);
        assert_eq!(ts.fraction(), 1 << 31);
    }

    #[test]
    fn roundtrip_within_a_nanosecond() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        let back = Timestamp::from_system_time(time).to_system_time();
        let diff = time.duration_since(back).unwrap_or_else(|e| e.duration());
        assert!(diff <= Duration::from_nanos(1), "diff was {:?}", diff);
    }

    #[test]
    fn before_unix_epoch() {
        let time = UNIX_EPOCH - Duration::from_millis(500);
        let ts = Timestamp::from_system_time(time);
        assert_eq!(ts.seconds() as u64, NTP_UNIX_OFFSET - 1);
        assert_eq!(ts.fraction(), 1 << 31);
        assert_eq!(ts.to_system_time(), time);
    }

    #[test]
    fn parts_and_raw_agree() {
        let ts = Timestamp::from_parts(0xDEAD_BEEF, 0x0000_0001);
        assert_eq!(ts.raw(), 0xDEAD_BEEF_0000_0001);
        assert_eq!(Timestamp::from_raw(1), Timestamp::IMMEDIATE);
        assert!(Timestamp::IMMEDIATE.is_immediate());
        assert_eq!(Timestamp::IMMEDIATE.to_string(), "immediate");
    }

    #[test]
    fn now_is_after_2020() {
        let jan_2020_ntp = NTP_UNIX_OFFSET + 1_577_836_800;
        assert!(Timestamp::now().seconds() as u64 > jan_2020_ntp);
    }
}
