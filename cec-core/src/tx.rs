//! Bit-level frame transmitter.
//!
//! [`FrameTransmitter`] is the mirror image of the receiver: a chain of
//! one-shot timer callbacks, each performing a single line transition
//! and returning the delay until the next one. The caller applies the
//! [`LineOp`], sleeps for `delay_us`, and calls
//! [`FrameTransmitter::tick`] again with the current time and line
//! level. Delays are computed against the stored slot start so timer
//! latency does not accumulate.
//!
//! Before the first tick the caller must have observed the bus released
//! for [`crate::timing::SIGNAL_FREE_BITS`] nominal bit times.

use crate::frame::{CecFrame, MAX_FRAME_LEN};
use crate::timing;

/// Line transition to perform at the start of a tick.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineOp {
    DriveLow,
    Release,
    /// No transition; the tick only samples the line.
    None,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStep {
    /// Apply `op`, then tick again after `delay_us`.
    Continue { op: LineOp, delay_us: u64 },
    /// Transmission finished; `acked` is the follower's ACK as sampled
    /// in the final ACK slot.
    Done { acked: bool },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum TxState {
    StartLow,
    StartHigh,
    DataLow,
    DataHigh,
    EomLow,
    EomHigh,
    AckLow,
    AckHigh,
    AckWait,
    End,
    Done,
}

pub struct FrameTransmitter {
    state: TxState,
    data: [u8; MAX_FRAME_LEN],
    len: usize,
    byte: usize,
    /// Bit position within the current byte, 7 down to 0.
    bit: u8,
    /// Falling edge of the current bit slot (or of the start bit).
    start_us: u64,
    acked: bool,
}

impl FrameTransmitter {
    pub fn new(frame: &CecFrame) -> Self {
        let raw = frame.encode();
        let mut data = [0; MAX_FRAME_LEN];
        data[..raw.len()].copy_from_slice(&raw);
        FrameTransmitter {
            state: TxState::StartLow,
            data,
            len: raw.len(),
            byte: 0,
            bit: 7,
            start_us: 0,
            acked: false,
        }
    }

    /// Advance by one timer tick. `line_low` is the level right now,
    /// only consulted in the ACK sample slot.
    pub fn tick(&mut self, now_us: u64, line_low: bool) -> TxStep {
        match self.state {
            TxState::StartLow => {
                self.start_us = now_us;
                self.state = TxState::StartHigh;
                cont(LineOp::DriveLow, timing::START_LOW)
            }
            TxState::StartHigh => {
                self.state = TxState::DataLow;
                cont(LineOp::Release, self.until(timing::START_SLOT, now_us))
            }
            TxState::DataLow => {
                self.start_us = now_us;
                let one = (self.data[self.byte] >> self.bit) & 1 == 1;
                self.state = TxState::DataHigh;
                cont(
                    LineOp::DriveLow,
                    if one { timing::ONE_LOW } else { timing::ZERO_LOW },
                )
            }
            TxState::DataHigh => {
                if self.bit > 0 {
                    self.bit -= 1;
                    self.state = TxState::DataLow;
                } else {
                    self.byte += 1;
                    self.state = TxState::EomLow;
                }
                cont(LineOp::Release, self.until(timing::BIT_SLOT, now_us))
            }
            TxState::EomLow => {
                self.start_us = now_us;
                // EOM is set (a short low) on the final byte only.
                let eom = self.byte == self.len;
                self.state = TxState::EomHigh;
                cont(
                    LineOp::DriveLow,
                    if eom { timing::ONE_LOW } else { timing::ZERO_LOW },
                )
            }
            TxState::EomHigh => {
                self.state = TxState::AckLow;
                cont(LineOp::Release, self.until(timing::BIT_SLOT, now_us))
            }
            TxState::AckLow => {
                self.start_us = now_us;
                self.state = TxState::AckHigh;
                cont(LineOp::DriveLow, timing::ONE_LOW)
            }
            TxState::AckHigh => {
                if self.byte < self.len {
                    // More bytes to send; the follower's ACK on
                    // intermediate blocks is not sampled.
                    self.bit = 7;
                    self.state = TxState::DataLow;
                    cont(LineOp::Release, self.until(timing::BIT_SLOT, now_us))
                } else {
                    self.state = TxState::AckWait;
                    cont(LineOp::Release, self.until(timing::ACK_SAMPLE, now_us))
                }
            }
            TxState::AckWait => {
                // A follower asserting ACK still holds the line low here.
                if line_low {
                    self.acked = true;
                }
                self.state = TxState::End;
                cont(LineOp::None, self.until(timing::BIT_SLOT, now_us))
            }
            TxState::End | TxState::Done => {
                self.state = TxState::Done;
                TxStep::Done { acked: self.acked }
            }
        }
    }

    /// Delay until `offset` past the current slot's falling edge.
    fn until(&self, offset: u64, now_us: u64) -> u64 {
        (self.start_us + offset).saturating_sub(now_us)
    }
}

fn cont(op: LineOp, delay_us: u64) -> TxStep {
    TxStep::Continue { op, delay_us }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::LogicalAddress;

    /// Run a transmitter against a simulated line, recording every
    /// transition as (time, line went low). `ack_low_from` optionally
    /// gives a time range during which a simulated follower holds the
    /// line low.
    fn run(
        frame: &CecFrame,
        follower_ack: Option<(u64, u64)>,
    ) -> (Vec<(u64, bool)>, bool) {
        let mut tx = FrameTransmitter::new(frame);
        let mut now = 0u64;
        let mut we_drive = false;
        let mut transitions = Vec::new();
        loop {
            let follower_low =
                follower_ack.is_some_and(|(from, to)| now >= from && now < to);
            match tx.tick(now, we_drive || follower_low) {
                TxStep::Continue { op, delay_us } => {
                    match op {
                        LineOp::DriveLow => {
                            if !we_drive {
                                we_drive = true;
                                transitions.push((now, true));
                            }
                        }
                        LineOp::Release => {
                            if we_drive {
                                we_drive = false;
                                transitions.push((now, false));
                            }
                        }
                        LineOp::None => {}
                    }
                    now += delay_us;
                }
                TxStep::Done { acked } => return (transitions, acked),
            }
        }
    }

    #[test]
    fn start_bit_timing() {
        let frame = CecFrame::polling(LogicalAddress(4));
        let (transitions, _) = run(&frame, None);
        assert_eq!(transitions[0], (0, true));
        assert_eq!(transitions[1], (3700, false));
        // First data bit slot opens 4500 µs after the start bit.
        assert_eq!(transitions[2].0, 4500);
    }

    #[test]
    fn polling_frame_bit_durations() {
        // 0x44: bits 0100_0100, then EOM=1, then the ACK low.
        let frame = CecFrame::polling(LogicalAddress(4));
        let (transitions, acked) = run(&frame, None);
        assert!(!acked);
        // Skip the start bit; collect (low duration, slot length) pairs.
        let data = &transitions[2..];
        let lows: Vec<u64> = data
            .chunks(2)
            .filter(|c| c.len() == 2)
            .map(|c| c[1].0 - c[0].0)
            .collect();
        let expected = [
            1500, 600, 1500, 1500, 1500, 600, 1500, 1500, // 0x44
            600, // EOM (single byte frame)
            600, // ACK
        ];
        assert_eq!(lows, expected);
        // Every slot after the start bit opens the nominal 2400 µs
        // after the previous one.
        let falls: Vec<u64> = transitions.iter().filter(|t| t.1).map(|t| t.0).collect();
        for pair in falls[1..].windows(2) {
            assert_eq!(pair[1] - pair[0], 2400);
        }
    }

    #[test]
    fn ack_sampled_at_nominal_point() {
        let frame = CecFrame::polling(LogicalAddress(4));
        // ACK slot falling edge: start 4500 + 8 bits + EOM = 4500 + 9 * 2400.
        let ack_low = 4500 + 9 * 2400;
        // Follower holds low from our release until 1500 past the edge.
        let (_, acked) = run(&frame, Some((ack_low, ack_low + 1500)));
        assert!(acked);
    }

    #[test]
    fn no_follower_means_no_ack() {
        let frame = CecFrame::polling(LogicalAddress(4));
        let (_, acked) = run(&frame, None);
        assert!(!acked);
    }

    #[test]
    fn eom_low_is_long_on_intermediate_bytes() {
        let frame = CecFrame {
            initiator: LogicalAddress(4),
            dest: LogicalAddress(0),
            opcode: Some(0x90),
            operands: None,
        };
        let (transitions, _) = run(&frame, None);
        // Byte 0's EOM slot: falling edge at 4500 + 8 * 2400.
        let eom_edge = 4500 + 8 * 2400;
        let idx = transitions
            .iter()
            .position(|&(t, low)| t == eom_edge && low)
            .unwrap();
        // EOM clear: 1500 µs low.
        assert_eq!(transitions[idx + 1].0 - transitions[idx].0, 1500);
    }
}
