//! CEC bit timing, in microseconds (HDMI spec 1.4, supplement 1).
//!
//! All intervals are measured edge to edge. The receive windows are the
//! tolerant ranges a frame must stay inside; the transmit values are the
//! nominal points within them.

use core::ops::RangeInclusive;

/// Nominal duration of one data bit slot.
pub const BIT_SLOT: u64 = 2400;

/// Start bit: driven low for this long...
pub const START_LOW: u64 = 3700;
/// ...within a total start slot of this length.
pub const START_SLOT: u64 = 4500;

/// Accepted low phase of a received start bit.
pub const START_LOW_WINDOW: RangeInclusive<u64> = 3500..=3900;
/// Accepted distance from the start bit's falling edge to the first data
/// bit's falling edge.
pub const FIRST_BIT_WINDOW: RangeInclusive<u64> = 4300..=4700;
/// Accepted distance between consecutive data bit falling edges.
pub const BIT_SLOT_WINDOW: RangeInclusive<u64> = 2050..=2750;

/// Low phase of a transmitted logical 1 / 0.
pub const ONE_LOW: u64 = 600;
pub const ZERO_LOW: u64 = 1500;

/// Accepted low phase for a received logical 1 / 0.
pub const ONE_LOW_WINDOW: RangeInclusive<u64> = 400..=800;
pub const ZERO_LOW_WINDOW: RangeInclusive<u64> = 1300..=1700;

/// How long a follower holds the line low to assert the ACK bit,
/// measured from the ACK slot's falling edge.
pub const ACK_ASSERT: u64 = 1500;
/// When the initiator samples the line for a follower's ACK, measured
/// from the ACK slot's falling edge. Midpoint of the 850–1250 safe
/// sample period.
pub const ACK_SAMPLE: u64 = (850 + 1250) / 2;

/// Bit slots the line must stay released before a new initiator may
/// start a frame (signal free time, CEC 9.1).
pub const SIGNAL_FREE_BITS: u64 = 7;

/// Classify a low phase as a data bit value.
pub fn classify_bit(low_us: u64) -> Option<bool> {
    if ONE_LOW_WINDOW.contains(&low_us) {
        Some(true)
    } else if ZERO_LOW_WINDOW.contains(&low_us) {
        Some(false)
    } else {
        None
    }
}
