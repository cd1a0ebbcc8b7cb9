//! Time-ordered 64-bit id generation.
//!
//! Ids are laid out as `timestamp_millis << 22 | machine_id << 12 | sequence`
//! and are strictly increasing for a single [`Snowflake`] instance.

mod clock;
pub mod error;
mod snowflake;
mod snowflake_id;

pub use clock::{Clock, SystemClock};
pub use error::Error;
pub use snowflake::{Snowflake, SnowflakeSettings, DEFAULT_MAX_CLOCK_DRIFT};
pub use snowflake_id::SnowflakeId;
