//! Bit-level frame receiver.
//!
//! [`FrameReceiver`] is driven by line edges: the caller arms whichever
//! edge the previous [`RxAction::Listen`] asked for and calls
//! [`FrameReceiver::edge`] with the edge's timestamp. Each call advances
//! the machine exactly one state and classifies the elapsed interval
//! against the timing windows in [`crate::timing`]; anything outside its
//! window is terminal for the reception.
//!
//! The machine itself never touches the line. When the frame is
//! addressed to us (or broadcast) it requests the ACK assertion through
//! [`RxAction::AssertAck`] and expects the caller to report the release
//! back as a rising edge.

use crate::frame::{CecFrame, LogicalAddress, MAX_FRAME_LEN};
use crate::timing;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeKind {
    Falling,
    Rising,
}

/// What the caller must do after feeding an edge.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxAction {
    /// Arm the given edge and report it with its timestamp.
    Listen(EdgeKind),
    /// Drive the line low now and release it at the given absolute time,
    /// then report the release as a rising edge.
    AssertAck { release_at: u64 },
    /// A complete frame is available via [`FrameReceiver::frame`].
    Complete,
    /// Timing violation; the reception is over and the buffer is empty.
    Abort,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum RxState {
    AwaitStart,
    StartHigh,
    DataLow,
    DataHigh,
    EomLow,
    EomHigh,
    AckLow,
    AckHigh,
    AckEnd,
    Done,
    Aborted,
}

pub struct FrameReceiver {
    state: RxState,
    /// Reference edge for interval measurements: the initial falling
    /// edge of the start bit, then the falling edge of each bit slot.
    start_us: u64,
    /// The first data bit slot is measured from the start bit's falling
    /// edge and gets a wider window.
    first: bool,
    /// Bits accumulated into the current byte, MSB first.
    current: u8,
    bits: u8,
    eom: bool,
    data: [u8; MAX_FRAME_LEN],
    len: usize,
    address: LogicalAddress,
}

impl FrameReceiver {
    /// A fresh receiver waiting for a start bit. Arm a falling edge and
    /// feed it to [`edge`](Self::edge).
    pub fn new(address: LogicalAddress) -> Self {
        FrameReceiver {
            state: RxState::AwaitStart,
            start_us: 0,
            first: false,
            current: 0,
            bits: 0,
            eom: false,
            data: [0; MAX_FRAME_LEN],
            len: 0,
            address,
        }
    }

    /// Received byte count; zero after an abort.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The completed frame, once [`RxAction::Complete`] was returned.
    pub fn frame(&self) -> Option<CecFrame> {
        if self.state == RxState::Done {
            CecFrame::parse(&self.data[..self.len])
        } else {
            None
        }
    }

    /// Advance the machine by one edge event.
    pub fn edge(&mut self, now_us: u64) -> RxAction {
        match self.state {
            RxState::AwaitStart => {
                // Falling edge: a start bit may have begun.
                self.start_us = now_us;
                self.state = RxState::StartHigh;
                RxAction::Listen(EdgeKind::Rising)
            }
            RxState::StartHigh => {
                let low = now_us - self.start_us;
                if !timing::START_LOW_WINDOW.contains(&low) {
                    return self.abort();
                }
                self.first = true;
                self.current = 0;
                self.bits = 0;
                self.state = RxState::DataLow;
                RxAction::Listen(EdgeKind::Falling)
            }
            RxState::DataLow | RxState::EomLow => {
                // Falling edge opening a bit slot, measured from the
                // previous slot's falling edge (or from the start bit's
                // falling edge for the first data bit).
                let window = if self.first {
                    timing::FIRST_BIT_WINDOW
                } else {
                    timing::BIT_SLOT_WINDOW
                };
                let slot = now_us - self.start_us;
                if !window.contains(&slot) {
                    return self.abort();
                }
                self.start_us = now_us;
                self.first = false;
                self.state = if self.state == RxState::EomLow {
                    RxState::EomHigh
                } else {
                    RxState::DataHigh
                };
                RxAction::Listen(EdgeKind::Rising)
            }
            RxState::DataHigh => {
                let Some(bit) = timing::classify_bit(now_us - self.start_us) else {
                    return self.abort();
                };
                self.current = (self.current << 1) | bit as u8;
                self.bits += 1;
                if self.bits < 8 {
                    self.state = RxState::DataLow;
                } else {
                    if self.len == MAX_FRAME_LEN {
                        return self.abort();
                    }
                    self.data[self.len] = self.current;
                    self.len += 1;
                    self.current = 0;
                    self.bits = 0;
                    self.state = RxState::EomLow;
                }
                RxAction::Listen(EdgeKind::Falling)
            }
            RxState::EomHigh => {
                let Some(bit) = timing::classify_bit(now_us - self.start_us) else {
                    return self.abort();
                };
                self.eom = bit;
                self.state = RxState::AckLow;
                RxAction::Listen(EdgeKind::Falling)
            }
            RxState::AckLow => {
                self.start_us = now_us;
                self.state = RxState::AckHigh;
                RxAction::Listen(EdgeKind::Rising)
            }
            RxState::AckHigh => {
                // Unlike the data phase both low durations are legal
                // here: a short low means no follower has asserted ACK
                // (yet), a long one means another follower already did.
                let low = now_us - self.start_us;
                if timing::classify_bit(low).is_none() {
                    return self.abort();
                }
                let dest = LogicalAddress(self.data[0] & 0x0f);
                if dest == self.address || dest.is_broadcast() {
                    // Assert ACK for the rest of the bit slot; the
                    // release comes back as our own rising edge.
                    self.state = RxState::AckEnd;
                    RxAction::AssertAck {
                        release_at: self.start_us + timing::ACK_ASSERT,
                    }
                } else {
                    self.finish_block()
                }
            }
            RxState::AckEnd => self.finish_block(),
            RxState::Done | RxState::Aborted => RxAction::Abort,
        }
    }

    fn finish_block(&mut self) -> RxAction {
        if self.eom {
            self.state = RxState::Done;
            RxAction::Complete
        } else {
            // Next byte; its slot is measured from the ACK falling edge.
            self.state = RxState::DataLow;
            RxAction::Listen(EdgeKind::Falling)
        }
    }

    fn abort(&mut self) -> RxAction {
        self.state = RxState::Aborted;
        self.len = 0;
        RxAction::Abort
    }
}
