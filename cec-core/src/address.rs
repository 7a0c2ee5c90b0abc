//! Logical address allocation.
//!
//! A playback device probes the candidate addresses reserved for its
//! class with self-addressed polling frames. An acknowledged probe
//! means another device already owns that address; the first silent
//! candidate is ours. The allocator is a poll-driven policy object so
//! the async bus loop drives it one probe at a time and the tests feed
//! it canned results.

use crate::frame::{CecFrame, LogicalAddress};

/// Addresses a playback device may claim, probed in this order.
pub const CANDIDATES: [LogicalAddress; 4] = [
    LogicalAddress(0x04),
    LogicalAddress(0x08),
    LogicalAddress(0x0b),
    LogicalAddress(0x0f),
];

pub struct AddressAllocator {
    next: usize,
}

impl AddressAllocator {
    pub fn new() -> Self {
        AddressAllocator { next: 0 }
    }

    /// The candidate to probe next.
    pub fn candidate(&self) -> LogicalAddress {
        CANDIDATES[self.next.min(CANDIDATES.len() - 1)]
    }

    /// The polling frame for the current candidate.
    pub fn probe(&self) -> CecFrame {
        CecFrame::polling(self.candidate())
    }

    /// Record the probe result. Returns the allocated address once the
    /// decision is made: the first unacknowledged candidate, or the
    /// final one regardless when every candidate answered. Claiming a
    /// possibly-occupied address is the accepted fallback; the
    /// alternative would be having no address at all.
    pub fn observe(&mut self, acked: bool) -> Option<LogicalAddress> {
        let current = self.candidate();
        if !acked || self.next + 1 == CANDIDATES.len() {
            return Some(current);
        }
        self.next += 1;
        None
    }
}

impl Default for AddressAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocate(acked: impl Fn(LogicalAddress) -> bool) -> (LogicalAddress, usize) {
        let mut alloc = AddressAllocator::new();
        let mut probes = 0;
        loop {
            let candidate = alloc.candidate();
            assert!(alloc.probe().is_polling_message());
            probes += 1;
            if let Some(addr) = alloc.observe(acked(candidate)) {
                return (addr, probes);
            }
        }
    }

    #[test]
    fn first_silent_candidate_wins() {
        // 0x04 and 0x08 are taken, 0x0b and 0x0f are free.
        let (addr, probes) =
            allocate(|a| a == LogicalAddress(0x04) || a == LogicalAddress(0x08));
        assert_eq!(addr, LogicalAddress(0x0b));
        assert_eq!(probes, 3);
    }

    #[test]
    fn free_bus_allocates_first_candidate() {
        let (addr, probes) = allocate(|_| false);
        assert_eq!(addr, LogicalAddress(0x04));
        assert_eq!(probes, 1);
    }

    #[test]
    fn exhaustion_falls_back_to_last_candidate() {
        let (addr, probes) = allocate(|_| true);
        assert_eq!(addr, LogicalAddress(0x0f));
        assert_eq!(probes, CANDIDATES.len());
    }

    #[test]
    fn probe_is_self_addressed() {
        let alloc = AddressAllocator::new();
        let frame = alloc.probe();
        assert_eq!(frame.initiator, frame.dest);
        assert_eq!(frame.encode().as_slice(), &[0x44]);
    }
}
