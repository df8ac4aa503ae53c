//! Snowflake ID Library
//!
//! Mints collision-free, time-ordered `i64` identifiers without central
//! coordination. Every write path (videos, likes) owns one generator per
//! process, keyed by a `(datacenter, worker)` slot.
//!
//! **Layout** (high to low bits):
//!
//! ```text
//! | 1 sign | 41 timestamp (ms since EPOCH_MS) | 5 datacenter | 5 worker | 12 sequence |
//! ```
//!
//! **Usage**:
//! ```
//! use snowflake_id::Snowflake;
//!
//! let generator = Snowflake::new(1, 1).unwrap();
//! let id = generator.next_id().unwrap();
//! let parts = snowflake_id::decompose(id);
//! assert_eq!((parts.datacenter_id, parts.worker_id), (1, 1));
//! ```
//!
//! Small backward clock steps (NTP slew) are absorbed by waiting for the
//! clock to catch up; anything larger than the configured tolerance is
//! reported as [`SnowflakeError::ClockMovedBackwards`] and no id is issued.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

// ============================================================================
// Layout
// ============================================================================

/// 2020-01-01T00:00:00Z in milliseconds.
pub const EPOCH_MS: i64 = 1_577_808_000_000;

const WORKER_ID_BITS: u32 = 5;
const DATACENTER_ID_BITS: u32 = 5;
const SEQUENCE_BITS: u32 = 12;
const TIMESTAMP_BITS: u32 = 41;

pub const MAX_WORKER_ID: i64 = (1 << WORKER_ID_BITS) - 1;
pub const MAX_DATACENTER_ID: i64 = (1 << DATACENTER_ID_BITS) - 1;
pub const MAX_TIMESTAMP: i64 = (1 << TIMESTAMP_BITS) - 1;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

const WORKER_SHIFT: u32 = SEQUENCE_BITS;
const DATACENTER_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;

/// Default tolerance for a backward clock step before minting fails.
pub const DEFAULT_MAX_BACKWARD_MS: i64 = 5;

/// Ceiling for a configured tolerance. `next_id` spins while it waits out a
/// backward step, so this also bounds how long a caller's thread can block.
pub const MAX_BACKWARD_TOLERANCE_MS: i64 = 50;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnowflakeError {
    #[error("datacenter id {0} out of range 0..=31")]
    InvalidDatacenterId(i64),

    #[error("worker id {0} out of range 0..=31")]
    InvalidWorkerId(i64),

    #[error("timestamp {elapsed_ms}ms since epoch does not fit in 41 bits")]
    TimestampOutOfRange { elapsed_ms: i64 },

    #[error("clock moved backwards by {drift_ms}ms")]
    ClockMovedBackwards { drift_ms: i64 },
}

// ============================================================================
// Clock
// ============================================================================

/// Millisecond wall clock used by the generator.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

// ============================================================================
// Generator
// ============================================================================

#[derive(Debug, Default)]
struct State {
    last_timestamp: i64,
    sequence: i64,
}

/// Concurrency-safe id generator for one `(datacenter, worker)` slot.
pub struct Snowflake {
    datacenter_id: i64,
    worker_id: i64,
    max_backward_ms: i64,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl std::fmt::Debug for Snowflake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snowflake")
            .field("datacenter_id", &self.datacenter_id)
            .field("worker_id", &self.worker_id)
            .field("max_backward_ms", &self.max_backward_ms)
            .finish()
    }
}

impl Snowflake {
    pub fn new(datacenter_id: i64, worker_id: i64) -> Result<Self, SnowflakeError> {
        Self::with_clock(datacenter_id, worker_id, Arc::new(SystemClock))
    }

    /// Build a generator on a caller-supplied clock.
    ///
    /// Rejects ids outside `0..=31` and a clock that is already outside the
    /// 41-bit window.
    pub fn with_clock(
        datacenter_id: i64,
        worker_id: i64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SnowflakeError> {
        if !(0..=MAX_DATACENTER_ID).contains(&datacenter_id) {
            return Err(SnowflakeError::InvalidDatacenterId(datacenter_id));
        }
        if !(0..=MAX_WORKER_ID).contains(&worker_id) {
            return Err(SnowflakeError::InvalidWorkerId(worker_id));
        }
        check_timestamp(clock.now_millis())?;

        Ok(Self {
            datacenter_id,
            worker_id,
            max_backward_ms: DEFAULT_MAX_BACKWARD_MS,
            clock,
            state: Mutex::new(State::default()),
        })
    }

    /// Override how far the clock may step back before `next_id` errors.
    ///
    /// Clamped to `0..=MAX_BACKWARD_TOLERANCE_MS`.
    pub fn with_max_backward_ms(mut self, max_backward_ms: i64) -> Self {
        self.max_backward_ms = max_backward_ms.clamp(0, MAX_BACKWARD_TOLERANCE_MS);
        self
    }

    pub fn max_backward_ms(&self) -> i64 {
        self.max_backward_ms
    }

    pub fn datacenter_id(&self) -> i64 {
        self.datacenter_id
    }

    pub fn worker_id(&self) -> i64 {
        self.worker_id
    }

    /// Mint the next id.
    ///
    /// Blocks the calling thread (holding the generator lock) for at most
    /// `max_backward_ms` after a small clock regression, or until the next
    /// millisecond when 4096 ids were already issued in the current one.
    pub fn next_id(&self) -> Result<i64, SnowflakeError> {
        // A panic while holding the lock cannot leave the state half-written:
        // both fields are assigned only after all fallible checks.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut now = self.clock.now_millis();
        if now < state.last_timestamp {
            let drift_ms = state.last_timestamp - now;
            if drift_ms > self.max_backward_ms {
                return Err(SnowflakeError::ClockMovedBackwards { drift_ms });
            }
            now = self.wait_until(state.last_timestamp);
        }

        let sequence = if now == state.last_timestamp {
            let next = (state.sequence + 1) & SEQUENCE_MASK;
            if next == 0 {
                now = self.wait_until(state.last_timestamp + 1);
            }
            next
        } else {
            0
        };

        let elapsed = check_timestamp(now)?;
        state.last_timestamp = now;
        state.sequence = sequence;

        Ok((elapsed << TIMESTAMP_SHIFT)
            | (self.datacenter_id << DATACENTER_SHIFT)
            | (self.worker_id << WORKER_SHIFT)
            | sequence)
    }

    /// Share of the 41-bit timestamp budget already consumed, in `0.0..=1.0`.
    pub fn timestamp_usage(&self) -> f64 {
        let elapsed = (self.clock.now_millis() - EPOCH_MS).clamp(0, MAX_TIMESTAMP);
        elapsed as f64 / MAX_TIMESTAMP as f64
    }

    fn wait_until(&self, target: i64) -> i64 {
        loop {
            let now = self.clock.now_millis();
            if now >= target {
                return now;
            }
            std::hint::spin_loop();
        }
    }
}

fn check_timestamp(now_ms: i64) -> Result<i64, SnowflakeError> {
    let elapsed_ms = now_ms - EPOCH_MS;
    if !(0..=MAX_TIMESTAMP).contains(&elapsed_ms) {
        return Err(SnowflakeError::TimestampOutOfRange { elapsed_ms });
    }
    Ok(elapsed_ms)
}

// ============================================================================
// Decoding
// ============================================================================

/// Fields recovered from an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnowflakeParts {
    /// Absolute unix milliseconds.
    pub timestamp_ms: i64,
    pub datacenter_id: i64,
    pub worker_id: i64,
    pub sequence: i64,
}

impl SnowflakeParts {
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }
}

pub fn decompose(id: i64) -> SnowflakeParts {
    SnowflakeParts {
        timestamp_ms: (id >> TIMESTAMP_SHIFT) + EPOCH_MS,
        datacenter_id: (id >> DATACENTER_SHIFT) & MAX_DATACENTER_ID,
        worker_id: (id >> WORKER_SHIFT) & MAX_WORKER_ID,
        sequence: id & SEQUENCE_MASK,
    }
}

/// `(datacenter_id, worker_id)` that minted `id`.
pub fn device_of(id: i64) -> (i64, i64) {
    let parts = decompose(id);
    (parts.datacenter_id, parts.worker_id)
}

/// Unix milliseconds embedded in `id`.
pub fn timestamp_of(id: i64) -> i64 {
    decompose(id).timestamp_ms
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::thread;

    /// Clock driven by the test; each read advances by `step` ms.
    struct StepClock {
        now: AtomicI64,
        step: i64,
    }

    impl StepClock {
        fn new(start: i64, step: i64) -> Arc<Self> {
            Arc::new(Self {
                now: AtomicI64::new(start),
                step,
            })
        }

        fn set(&self, value: i64) {
            self.now.store(value, Ordering::SeqCst);
        }
    }

    impl Clock for StepClock {
        fn now_millis(&self) -> i64 {
            self.now.fetch_add(self.step, Ordering::SeqCst)
        }
    }

    const T0: i64 = EPOCH_MS + 1_000_000;

    #[test]
    fn rejects_out_of_range_slots() {
        assert_eq!(
            Snowflake::new(32, 0).unwrap_err(),
            SnowflakeError::InvalidDatacenterId(32)
        );
        assert_eq!(
            Snowflake::new(0, -1).unwrap_err(),
            SnowflakeError::InvalidWorkerId(-1)
        );
        assert!(Snowflake::new(31, 31).is_ok());
    }

    #[test]
    fn rejects_clock_outside_window() {
        let before_epoch = StepClock::new(EPOCH_MS - 1, 0);
        assert!(matches!(
            Snowflake::with_clock(0, 0, before_epoch),
            Err(SnowflakeError::TimestampOutOfRange { .. })
        ));

        let past_budget = StepClock::new(EPOCH_MS + MAX_TIMESTAMP + 1, 0);
        assert!(matches!(
            Snowflake::with_clock(0, 0, past_budget),
            Err(SnowflakeError::TimestampOutOfRange { .. })
        ));
    }

    #[test]
    fn same_millisecond_increments_sequence() {
        let clock = StepClock::new(T0, 0);
        let gen = Snowflake::with_clock(3, 7, clock).unwrap();

        let a = decompose(gen.next_id().unwrap());
        let b = decompose(gen.next_id().unwrap());

        assert_eq!(a.timestamp_ms, T0);
        assert_eq!(b.timestamp_ms, T0);
        assert_eq!(a.sequence, 0);
        assert_eq!(b.sequence, 1);
    }

    #[test]
    fn sequence_wrap_waits_for_next_millisecond() {
        let clock = StepClock::new(T0, 0);
        let gen = Snowflake::with_clock(0, 0, clock.clone()).unwrap();

        for _ in 0..=SEQUENCE_MASK {
            gen.next_id().unwrap();
        }

        // The clock is frozen; let it advance while the generator spins.
        let handle = {
            let clock = clock.clone();
            thread::spawn(move || {
                thread::sleep(std::time::Duration::from_millis(20));
                clock.set(T0 + 1);
            })
        };
        let parts = decompose(gen.next_id().unwrap());
        handle.join().unwrap();

        assert_eq!(parts.timestamp_ms, T0 + 1);
        assert_eq!(parts.sequence, 0);
    }

    #[test]
    fn small_backward_step_waits_large_step_errors() {
        let clock = StepClock::new(T0, 0);
        let gen = Snowflake::with_clock(0, 0, clock.clone())
            .unwrap()
            .with_max_backward_ms(5);

        let first = gen.next_id().unwrap();

        clock.set(T0 - 100);
        assert_eq!(
            gen.next_id().unwrap_err(),
            SnowflakeError::ClockMovedBackwards { drift_ms: 100 }
        );

        // Within tolerance: the generator waits until it reaches T0 again.
        let stepping = StepClock::new(T0 - 3, 1);
        let gen2 = Snowflake::with_clock(0, 0, stepping.clone()).unwrap();
        stepping.set(T0);
        let a = gen2.next_id().unwrap();
        stepping.set(T0 - 3);
        let b = gen2.next_id().unwrap();
        assert!(b > a);
        assert!(decompose(b).timestamp_ms >= decompose(a).timestamp_ms);

        assert!(first > 0);
    }

    #[test]
    fn backward_tolerance_is_capped() {
        let clock = StepClock::new(T0, 0);
        let gen = Snowflake::with_clock(0, 0, clock.clone())
            .unwrap()
            .with_max_backward_ms(10_000);
        assert_eq!(gen.max_backward_ms(), MAX_BACKWARD_TOLERANCE_MS);

        gen.next_id().unwrap();
        clock.set(T0 - 100);
        assert_eq!(
            gen.next_id().unwrap_err(),
            SnowflakeError::ClockMovedBackwards { drift_ms: 100 }
        );

        let negative = Snowflake::new(0, 0).unwrap().with_max_backward_ms(-3);
        assert_eq!(negative.max_backward_ms(), 0);
    }

    #[test]
    fn decode_recovers_slot_and_time() {
        let gen = Snowflake::new(17, 9).unwrap();
        let before = Utc::now().timestamp_millis();
        let id = gen.next_id().unwrap();
        let after = Utc::now().timestamp_millis();

        assert_eq!(device_of(id), (17, 9));
        let ts = timestamp_of(id);
        assert!(ts >= before && ts <= after);
        assert!(decompose(id).generated_at().is_some());
    }

    #[test]
    fn ids_are_unique_across_threads() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 5_000;

        let gen = Arc::new(Snowflake::new(1, 2).unwrap());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let gen = gen.clone();
                thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| gen.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), THREADS * PER_THREAD);
    }

    #[test]
    fn ids_increase_within_a_generator() {
        let gen = Snowflake::new(0, 1).unwrap();
        let mut last = 0;
        for _ in 0..10_000 {
            let id = gen.next_id().unwrap();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn timestamp_usage_is_a_fraction() {
        let gen = Snowflake::new(0, 0).unwrap();
        let usage = gen.timestamp_usage();
        assert!(usage > 0.0 && usage < 1.0);
    }
}
