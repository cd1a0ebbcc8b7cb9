use crate::{
    clock::{Clock, SystemClock},
    error::Error,
    snowflake_id::{MACHINE_ID_BITS, SEQUENCE_BITS},
    SnowflakeId,
};
use jiff::Timestamp;
use std::sync::Mutex;
use std::time::Duration;
use typed_builder::TypedBuilder;

const MAX_TIMESTAMP_MILLIS: i64 = (1_i64 << 42) - 1;
const MAX_MACHINE_ID: u16 = (1 << MACHINE_ID_BITS) - 1;
const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;

pub const DEFAULT_MAX_CLOCK_DRIFT: Duration = Duration::from_millis(5);

/// Configures a Snowflake generator instance.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct SnowflakeSettings {
    /// A unique instance index in the range `[0, 1023]`.
    #[builder(default)]
    pub machine_id: u16,
    /// Zero point for the 42-bit millisecond timestamp field.
    #[builder(default = Timestamp::UNIX_EPOCH)]
    pub start_epoch: Timestamp,
    /// How far the clock may step backwards before `next_id` fails instead
    /// of blocking until it catches up.
    #[builder(default = DEFAULT_MAX_CLOCK_DRIFT)]
    pub max_clock_drift: Duration,
}

#[derive(Debug, Default)]
struct GeneratorState {
    /// Last used millisecond, relative to the unix epoch.
    last_millis: Option<i64>,
    sequence: u16,
}

/// Snowflake ID generator. Waits for the next millisecond when the
/// per-millisecond sequence is exhausted.
///
/// Waiting happens on the calling thread with the state lock held, so other
/// callers block too. A wait is bounded by `max_clock_drift` plus one
/// millisecond.
pub struct Snowflake<C: Clock> {
    start_time: Timestamp,
    machine_id: u16,
    max_drift_millis: i64,
    clock: C,
    state: Mutex<GeneratorState>,
}

impl Snowflake<SystemClock> {
    /// Creates a generator backed by the real system clock.
    pub fn new(settings: SnowflakeSettings) -> Result<Self, Error> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> Snowflake<C> {
    pub fn with_clock(settings: SnowflakeSettings, clock: C) -> Result<Self, Error> {
        if settings.machine_id > MAX_MACHINE_ID {
            return Err(Error::InvalidMachineId {
                machine_id: settings.machine_id,
                max_machine_id: MAX_MACHINE_ID,
            });
        }

        let now = clock.now();
        if settings.start_epoch > now {
            return Err(Error::EpochAhead {
                epoch: settings.start_epoch,
                now,
            });
        }

        Ok(Self {
            start_time: settings.start_epoch,
            machine_id: settings.machine_id,
            max_drift_millis: i64::try_from(settings.max_clock_drift.as_millis())
                .unwrap_or(i64::MAX),
            clock,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    pub fn machine_id(&self) -> u16 {
        self.machine_id
    }

    /// Generates the next unique id.
    ///
    /// - if the per-millisecond sequence is exhausted, wait for the next millisecond
    /// - if the clock moves backward by at most `max_clock_drift`, wait until
    ///   it catches up; further back fails with [`Error::ClockMovedBackwards`]
    pub fn next_id(&self) -> Result<SnowflakeId, Error> {
        let mut state = self.state.lock().map_err(|_| Error::StatePoisoned)?;

        let mut now = self.clock.now().as_millisecond();

        match state.last_millis {
            None => {
                state.sequence = 0;
            }
            Some(last) => {
                if now < last {
                    let drift_millis = last - now;
                    if drift_millis > self.max_drift_millis {
                        return Err(Error::ClockMovedBackwards { drift_millis });
                    }
                    // Without waiting, a repeated (timestamp, sequence) pair
                    // could be handed out twice.
                    self.clock.wait_until(millis_to_timestamp(last)?);
                    now = self.clock.now().as_millisecond();
                }

                if now == last {
                    if state.sequence < MAX_SEQUENCE {
                        state.sequence += 1;
                    } else {
                        self.clock.wait_until(millis_to_timestamp(last + 1)?);
                        now = self.clock.now().as_millisecond();
                        state.sequence = 0;
                    }
                } else {
                    state.sequence = 0;
                }
            }
        }

        let elapsed = now - self.start_time.as_millisecond();
        if !(0..=MAX_TIMESTAMP_MILLIS).contains(&elapsed) {
            return Err(Error::OverTimeLimit);
        }

        let id = SnowflakeId::new()
            .with_timestamp(elapsed as u64)
            .with_machine_id(self.machine_id)
            .with_sequence(state.sequence);

        state.last_millis = Some(now);

        Ok(id)
    }
}

fn millis_to_timestamp(millis: i64) -> Result<Timestamp, Error> {
    Timestamp::from_millisecond(millis).map_err(|_| Error::OverTimeLimit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_clock::TestClock;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn at(millis: i64) -> Timestamp {
        Timestamp::from_millisecond(millis).unwrap()
    }

    fn make_generator(machine_id: u16, clock_millis: i64) -> (Snowflake<TestClock>, TestClock) {
        let settings = SnowflakeSettings::builder()
            .machine_id(machine_id)
            .start_epoch(at(0))
            .build();
        let clock = TestClock::new(at(clock_millis));
        let gen = Snowflake::with_clock(settings, clock.clone()).unwrap();
        (gen, clock)
    }

    #[test]
    fn first_id_has_sequence_zero() {
        let (gen, _) = make_generator(0, 100);
        let id = gen.next_id().unwrap();
        assert_eq!(id.sequence(), 0);
    }

    #[test]
    fn same_millisecond_increments_sequence() {
        let (gen, _) = make_generator(0, 100);
        let id0 = gen.next_id().unwrap();
        let id1 = gen.next_id().unwrap();
        let id2 = gen.next_id().unwrap();
        assert_eq!(id0.sequence(), 0);
        assert_eq!(id1.sequence(), 1);
        assert_eq!(id2.sequence(), 2);
    }

    #[test]
    fn new_millisecond_resets_sequence() {
        let (gen, clock) = make_generator(0, 100);
        gen.next_id().unwrap();
        gen.next_id().unwrap();

        clock.set(at(101));
        let id = gen.next_id().unwrap();
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.timestamp(), 101);
    }

    #[test]
    fn sequence_overflow_advances_clock() {
        let (gen, clock) = make_generator(0, 100);
        // Exhaust all 4096 ids allocated to millisecond 100.
        for _ in 0..=MAX_SEQUENCE {
            gen.next_id().unwrap();
        }
        let id = gen.next_id().unwrap();
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.timestamp(), 101);
        assert_eq!(clock.waits(), 1);
    }

    #[test]
    fn small_backwards_step_waits_for_last_millisecond() {
        let (gen, clock) = make_generator(0, 500);
        let first = gen.next_id().unwrap();

        clock.set(at(497));
        let second = gen.next_id().unwrap();

        assert_eq!(clock.waits(), 1);
        assert!(second.as_u64() > first.as_u64());
    }

    #[test]
    fn large_backwards_step_fails_without_waiting() {
        let (gen, clock) = make_generator(0, 500);
        gen.next_id().unwrap();

        clock.set(at(400));
        assert_eq!(
            gen.next_id(),
            Err(Error::ClockMovedBackwards { drift_millis: 100 })
        );
        assert_eq!(clock.waits(), 0);

        // Once the clock is past the last id again, generation resumes.
        clock.set(at(501));
        assert_eq!(gen.next_id().unwrap().timestamp(), 501);
    }

    #[test]
    fn drift_tolerance_is_configurable() {
        let settings = SnowflakeSettings::builder()
            .start_epoch(at(0))
            .max_clock_drift(Duration::from_millis(200))
            .build();
        let clock = TestClock::new(at(500));
        let gen = Snowflake::with_clock(settings, clock.clone()).unwrap();
        let first = gen.next_id().unwrap();

        clock.set(at(400));
        let second = gen.next_id().unwrap();

        assert_eq!(clock.waits(), 1);
        assert!(second.as_u64() > first.as_u64());
    }

    #[test]
    fn machine_id_is_embedded() {
        let (gen, _) = make_generator(1023, 100);
        let id = gen.next_id().unwrap();
        assert_eq!(id.machine_id(), 1023);
        assert_eq!((id.as_u64() >> 12) & 0x3FF, 1023);
    }

    #[test]
    fn invalid_machine_id_is_rejected() {
        let settings = SnowflakeSettings::builder().machine_id(1024).build();
        let err = Snowflake::with_clock(settings, TestClock::new(at(100)))
            .err()
            .unwrap();
        assert_eq!(
            err,
            Error::InvalidMachineId {
                machine_id: 1024,
                max_machine_id: 1023
            }
        );
    }

    #[test]
    fn epoch_ahead_is_rejected() {
        let settings = SnowflakeSettings::builder().start_epoch(at(1_000)).build();
        let result = Snowflake::with_clock(settings, TestClock::new(at(100)));
        assert!(matches!(result, Err(Error::EpochAhead { .. })));
    }

    #[test]
    fn timestamp_field_reflects_elapsed_millis() {
        let settings = SnowflakeSettings::builder().start_epoch(at(200)).build();
        let gen = Snowflake::with_clock(settings, TestClock::new(at(500))).unwrap();
        assert_eq!(gen.next_id().unwrap().timestamp(), 300);
    }

    #[test]
    fn overtime_limit_returns_error() {
        let settings = SnowflakeSettings::builder().start_epoch(at(0)).build();
        let clock = TestClock::new(at(MAX_TIMESTAMP_MILLIS + 1));
        let gen = Snowflake::with_clock(settings, clock).unwrap();
        assert_eq!(gen.next_id(), Err(Error::OverTimeLimit));
    }

    #[test]
    fn ids_are_strictly_increasing_on_system_clock() {
        let gen = Snowflake::new(SnowflakeSettings::builder().build()).unwrap();
        let mut last = 0;
        for _ in 0..10_000 {
            let id = gen.next_id().unwrap().as_u64();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn concurrent_callers_never_share_an_id() {
        let gen = Arc::new(Snowflake::new(SnowflakeSettings::builder().build()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gen = Arc::clone(&gen);
                std::thread::spawn(move || {
                    (0..1_250)
                        .map(|_| gen.next_id().unwrap().as_u64())
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
        assert_eq!(seen.len(), 10_000);
    }
}
