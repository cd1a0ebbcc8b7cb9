use modular_bitfield::prelude::*;
use std::fmt;

pub(crate) const SEQUENCE_BITS: u32 = 12;
pub(crate) const MACHINE_ID_BITS: u32 = 10;
pub(crate) const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + MACHINE_ID_BITS;

#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnowflakeId {
    /// 12 bits for sequence number (resets every millisecond).
    pub sequence: B12,
    /// 10 bits for machine ID (allows up to 1024 instances).
    pub machine_id: B10,
    /// 42 bits for timestamp (milliseconds since the configured epoch).
    pub timestamp: B42,
}

impl SnowflakeId {
    /// Packs the fields into `timestamp << 22 | machine_id << 12 | sequence`.
    pub fn as_u64(&self) -> u64 {
        (self.timestamp() << TIMESTAMP_SHIFT)
            | (u64::from(self.machine_id()) << SEQUENCE_BITS)
            | u64::from(self.sequence())
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.as_u64()
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("timestamp", &self.timestamp())
            .field("machine_id", &self.machine_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}
