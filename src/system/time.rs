//! Time keeping module for PineTime

use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike, Utc};
use embassy_time::{Duration, Instant};

use crate::WatchError;

/// Source of wall-clock time.
pub trait ClockSource {
    /// Current local wall-clock time
    fn now(&self) -> Result<NaiveDateTime, WatchError>;
}

/// Wall-clock time sampled for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockReading {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl ClockReading {
    /// Take the clock fields of any chrono time value
    pub fn from_time<T: Timelike>(time: &T) -> Self {
        // Leap seconds report up to 1999 ms
        let millisecond = (time.nanosecond() / 1_000_000).min(999) as u16;
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            second: time.second() as u8,
            millisecond,
        }
    }

    /// Sample the clock source
    pub fn sample<C: ClockSource + ?Sized>(clock: &C) -> Result<Self, WatchError> {
        clock.now().map(|now| Self::from_time(&now))
    }

    /// Elapsed part of the current hour, in `[0, 1)`.
    pub fn sweep_fraction(&self) -> f32 {
        (self.minute as f32 + self.second as f32 / 60.0) / 60.0
    }

    /// Hour as shown on the face: 0-23, no padding.
    pub fn hour_label<'a>(&self, buf: &'a mut [u8; 2]) -> &'a str {
        format_no_std::show(buf, format_args!("{}", self.hour)).unwrap_or("")
    }

    /// Delay until the next whole second
    pub fn until_next_second(&self) -> Duration {
        Duration::from_millis(1000 - u64::from(self.millisecond.min(999)))
    }
}

pub struct TimeReference {
    /// Clock time
    time: NaiveDateTime,
    /// Related system time
    instant: Instant,
}

impl Default for TimeReference {
    fn default() -> Self {
        Self {
            time: DateTime::<Utc>::UNIX_EPOCH.naive_utc(),
            instant: Instant::from_ticks(0),
        }
    }
}

impl TimeReference {
    /// Create new time reference from NaiveDateTime
    pub fn from_datetime(time: NaiveDateTime) -> Self {
        Self {
            time,
            instant: Instant::now(),
        }
    }

    /// Create new time reference from a UTC epoch and a timezone offset in seconds
    pub fn from_timestamp(utc_secs: i64, offset_secs: i32) -> Option<Self> {
        let local = utc_secs.checked_add(i64::from(offset_secs))?;
        DateTime::from_timestamp(local, 0).map(|time| Self::from_datetime(time.naive_utc()))
    }
}

pub struct TimeManager {
    reference: TimeReference,
}

impl TimeManager {
    /// Initialize time measurement on boot
    pub fn init() -> Self {
        Self {
            reference: TimeReference::default(),
        }
    }

    /// Update time reference
    pub fn set_time(&mut self, reference: TimeReference) {
        debug!("Time reference updated");
        self.reference = reference;
    }
}

impl ClockSource for TimeManager {
    fn now(&self) -> Result<NaiveDateTime, WatchError> {
        let elapsed = Instant::now()
            .checked_duration_since(self.reference.instant)
            .ok_or(WatchError::ClockUnavailable)?;
        let micros = i64::try_from(elapsed.as_micros()).map_err(|_| WatchError::ClockUnavailable)?;
        self.reference
            .time
            .checked_add_signed(TimeDelta::microseconds(micros))
            .ok_or(WatchError::ClockUnavailable)
    }
}
