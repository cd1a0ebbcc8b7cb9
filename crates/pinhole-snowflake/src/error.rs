use jiff::Timestamp;
use thiserror::Error;

/// Errors returned by Snowflake initialization and id generation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid machine id {machine_id}; expected 0..={max_machine_id}")]
    InvalidMachineId { machine_id: u16, max_machine_id: u16 },
    #[error("epoch is ahead of current clock time: epoch={epoch}, now={now}")]
    EpochAhead { epoch: Timestamp, now: Timestamp },
    #[error("clock moved backwards by {drift_millis}ms")]
    ClockMovedBackwards { drift_millis: i64 },
    #[error("overtime limit")]
    OverTimeLimit,
    #[error("generator state lock is poisoned")]
    StatePoisoned,
}
