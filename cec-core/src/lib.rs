//! HDMI-CEC protocol engine, independent of any particular hardware.
//!
//! The bus is a single open-drain line; both directions are encoded as
//! precisely timed low/high phases. This crate models the bit layer as a
//! pair of finite-state machines ([`rx::FrameReceiver`] and
//! [`tx::FrameTransmitter`]) that advance exactly one step per external
//! event (a line edge or a timer tick) and never block, so they can run
//! inside interrupt or timer-callback context. The frame layer on top
//! (logical-address allocation, EDID physical-address discovery, opcode
//! dispatch) is plain data-in/data-out and shares no state with the bit
//! layer.
//!
//! Everything here runs on the host too, which is where the timing
//! windows and the dispatch table are tested.

#![cfg_attr(not(test), no_std)]

pub mod address;
pub mod cec_types;
pub mod dispatch;
pub mod edid;
pub mod frame;
pub mod keymap;
pub mod rx;
pub mod timing;
pub mod tx;

pub use address::AddressAllocator;
pub use dispatch::{dispatch, DeviceState, Reaction};
pub use frame::{CecFrame, LogicalAddress, PhysicalAddress};
pub use rx::{EdgeKind, FrameReceiver, RxAction};
pub use tx::{FrameTransmitter, LineOp, TxStep};
