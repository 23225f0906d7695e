//! Identifier Allocation
//!
//! Sequence numbers and local SEIDs. Both counters are monotonic; running
//! out of either is reported instead of wrapping onto a value in use.

use std::sync::Mutex;

use ogs_pfcp::header::PFCP_MAX_SEQUENCE_NUMBER;

use crate::error::{PfcpSimError, SimResult};
use crate::lock;

/// Per-client identifier allocator
#[derive(Debug, Default)]
pub struct IdAllocator {
    sequence_number: Mutex<u32>,
    last_seid: Mutex<u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next 24-bit sequence number; the first after a reset is 1
    pub fn next_sequence_number(&self) -> SimResult<u32> {
        let mut seq = lock(&self.sequence_number);
        if *seq >= PFCP_MAX_SEQUENCE_NUMBER {
            return Err(PfcpSimError::IdentifierExhausted("sequence number"));
        }
        *seq += 1;
        Ok(*seq)
    }

    /// Called when a new association setup begins
    pub fn reset_sequence_number(&self) {
        *lock(&self.sequence_number) = 0;
    }

    /// Next local SEID; never reset for the lifetime of the client
    pub fn next_local_seid(&self) -> SimResult<u64> {
        let mut seid = lock(&self.last_seid);
        *seid = seid
            .checked_add(1)
            .ok_or(PfcpSimError::IdentifierExhausted("F-SEID"))?;
        Ok(*seid)
    }

    #[cfg(test)]
    pub(crate) fn set_sequence_number(&self, value: u32) {
        *lock(&self.sequence_number) = value;
    }
}
