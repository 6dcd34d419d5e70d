//! Cycle scheduling.
//!
//! Two policies are supported:
//!
//! - [`Schedule::FixedDelay`] sleeps a constant duration between cycles.
//! - [`Schedule::ClockAligned`] sleeps until the next multiple of a tick
//!   length plus an offset, so fetches land just after every round boundary
//!   (e.g. five seconds after every two-minute mark).
//!
//! Waiting goes through the [`Clock`] trait so the synchronizer can be driven
//! by a fake clock in tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

/// Default round length of the game server.
pub const DEFAULT_TICK_SECS: u64 = 120;

/// Default delay after a round boundary before fetching.
pub const DEFAULT_OFFSET_SECS: u64 = 5;

/// Errors raised when building a schedule from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("fixed delay must be greater than zero")]
    NonPositiveDelay,

    #[error("tick length must be greater than zero")]
    NonPositiveTick,

    #[error("offset ({offset:?}) must be smaller than the tick length ({tick:?})")]
    OffsetNotBelowTick { tick: Duration, offset: Duration },
}

/// When the next cycle starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Constant pause between the end of one cycle and the start of the next.
    FixedDelay { delay: Duration },
    /// Next multiple of `tick` since the Unix epoch, plus `offset`.
    ClockAligned { tick: Duration, offset: Duration },
}

impl Schedule {
    /// Build a fixed-delay schedule.
    ///
    /// # Errors
    /// Returns `ScheduleError::NonPositiveDelay` for a zero delay.
    pub fn fixed_delay(delay: Duration) -> Result<Self, ScheduleError> {
        if delay.is_zero() {
            return Err(ScheduleError::NonPositiveDelay);
        }
        Ok(Self::FixedDelay { delay })
    }

    /// Build a clock-aligned schedule.
    ///
    /// # Errors
    /// Returns an error if `tick` is zero or `offset` is not strictly below it.
    pub fn clock_aligned(tick: Duration, offset: Duration) -> Result<Self, ScheduleError> {
        if tick.is_zero() {
            return Err(ScheduleError::NonPositiveTick);
        }
        if offset >= tick {
            return Err(ScheduleError::OffsetNotBelowTick { tick, offset });
        }
        Ok(Self::ClockAligned { tick, offset })
    }

    /// The instant the next cycle should start, given the current time.
    #[must_use]
    pub fn next_run(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Schedule::FixedDelay { delay } => TimeDelta::from_std(delay)
                .ok()
                .and_then(|delta| now.checked_add_signed(delta))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            Schedule::ClockAligned { tick, offset } => aligned_target(now, tick, offset),
        }
    }

    /// How long to sleep before the next cycle.
    ///
    /// For the clock-aligned policy a target already in the past yields a
    /// zero wait.
    #[must_use]
    pub fn wait_from(&self, now: DateTime<Utc>) -> Duration {
        match *self {
            Schedule::FixedDelay { delay } => delay,
            Schedule::ClockAligned { .. } => (self.next_run(now) - now)
                .to_std()
                .unwrap_or(Duration::ZERO),
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::ClockAligned {
            tick: Duration::from_secs(DEFAULT_TICK_SECS),
            offset: Duration::from_secs(DEFAULT_OFFSET_SECS),
        }
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schedule::FixedDelay { delay } => write!(f, "every {}s", delay.as_secs_f64()),
            Schedule::ClockAligned { tick, offset } => write!(
                f,
                "{}s past every {}s boundary",
                offset.as_secs_f64(),
                tick.as_secs_f64()
            ),
        }
    }
}

/// `(floor(now / tick) + 1) * tick + offset`, in milliseconds since the epoch.
fn aligned_target(now: DateTime<Utc>, tick: Duration, offset: Duration) -> DateTime<Utc> {
    let (Ok(tick_ms), Ok(offset_ms)) = (
        i64::try_from(tick.as_millis()),
        i64::try_from(offset.as_millis()),
    ) else {
        return now;
    };
    if tick_ms <= 0 {
        return now;
    }

    let now_ms = now.timestamp_millis();
    now_ms
        .div_euclid(tick_ms)
        .checked_add(1)
        .and_then(|ticks| ticks.checked_mul(tick_ms))
        .and_then(|boundary| boundary.checked_add(offset_ms))
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or(now)
}

/// Source of time and the single suspension point of the sync loop.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `chrono` and `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

// ---------- Test-only manual clock ----------

#[cfg(test)]
use std::sync::{Arc, Mutex};

/// Virtual clock: sleeping records the duration and advances time instantly.
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualClockInner>>,
}

#[cfg(test)]
struct ManualClockInner {
    now: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualClockInner {
                now,
                sleeps: Vec::new(),
            })),
        }
    }

    pub fn at_epoch_secs(secs: i64) -> Self {
        Self::at(DateTime::<Utc>::from_timestamp(secs, 0).expect("valid epoch seconds"))
    }

    pub fn advance(&self, by: Duration) {
        let mut inner = self.inner.lock().expect("manual clock lock");
        inner.now += TimeDelta::from_std(by).expect("duration in range");
    }

    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner.lock().expect("manual clock lock").sleeps.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().expect("manual clock lock").now
    }

    async fn sleep(&self, duration: Duration) {
        let mut inner = self.inner.lock().expect("manual clock lock");
        inner.sleeps.push(duration);
        inner.now += TimeDelta::from_std(duration).expect("duration in range");
    }
}
