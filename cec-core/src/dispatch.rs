//! Frame-level command dispatch.
//!
//! [`dispatch`] maps one received frame to the set of reactions the bus
//! task must carry out. It is a pure function of the frame and the
//! device's address state: no hidden state, at most one reaction set
//! per frame, so every handler is testable without a bus.

use heapless::Vec;

use crate::cec_types::{CecDeviceType, CecOpCode};
use crate::frame::{CecFrame, LogicalAddress, PhysicalAddress, MAX_CEC_OPERANDS};
use crate::keymap;

/// Identity this device presents on the bus.
pub const OSD_NAME: &str = "CEC Bridge";
pub const VENDOR_ID: u32 = 0x0010fa;
/// CEC version 1.3a.
pub const CEC_VERSION_1_3A: u8 = 0x04;
pub const DEVICE_TYPE: CecDeviceType = CecDeviceType::PLAYBACK_DEVICE;
/// Power status: on.
const POWER_ON: u8 = 0x00;
/// Audio status: volume 50 %, not muted.
const AUDIO_STATUS: u8 = 0x32;
const SYSTEM_AUDIO_ON: u8 = 0x01;

/// Process-wide address state, owned by the bus task and mutated only
/// between bus operations.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
    pub logical: LogicalAddress,
    pub physical: PhysicalAddress,
}

/// One thing the bus task must do in response to a frame.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reaction {
    /// Send this frame on the bus.
    Transmit(CecFrame),
    /// Deliver a keycode to the host ([`keymap::KEY_NONE`] on release).
    Key(u8),
    /// A user-control code with no key mapping; log only.
    UnmappedControl(u8),
    /// An opcode outside the dispatch table; log only.
    Unrecognized(u8),
    /// The bus topology changed: re-resolve the physical address,
    /// re-allocate the logical address and announce again.
    Renegotiate,
}

pub type Reactions = Vec<Reaction, 4>;

/// Decide the reactions to a received frame.
pub fn dispatch(state: &DeviceState, frame: &CecFrame) -> Reactions {
    let mut out = Reactions::new();
    let Some(opcode) = frame.opcode else {
        // Single-byte polling message; the ACK already happened at the
        // bit layer.
        return out;
    };
    let unicast = frame.dest == state.logical;
    let us = state.logical;
    let operand = |n: usize| frame.operands.as_ref().and_then(|ops| ops.get(n)).copied();

    let Ok(opcode) = CecOpCode::try_from(opcode) else {
        out.push(Reaction::Unrecognized(opcode)).ok();
        return out;
    };

    use CecOpCode::*;
    match opcode {
        GIVE_DEVICE_POWER_STATUS => {
            if unicast {
                out.push(transmit(us, frame.initiator, REPORT_POWER_STATUS, &[POWER_ON]))
                    .ok();
            }
            // Some sources (Chromecast) only emit volume user controls
            // once a TV has answered a power query; answer for the
            // absent TV as well.
            if frame.dest == LogicalAddress::TV {
                out.push(transmit(
                    LogicalAddress::TV,
                    frame.initiator,
                    REPORT_POWER_STATUS,
                    &[POWER_ON],
                ))
                .ok();
            }
        }
        GIVE_AUDIO_STATUS if unicast => {
            out.push(transmit(us, frame.initiator, REPORT_AUDIO_STATUS, &[AUDIO_STATUS]))
                .ok();
        }
        GIVE_SYSTEM_AUDIO_MODE_STATUS if unicast => {
            out.push(transmit(
                us,
                frame.initiator,
                SYSTEM_AUDIO_MODE_STATUS,
                &[SYSTEM_AUDIO_ON],
            ))
            .ok();
        }
        SYSTEM_AUDIO_MODE_REQUEST if unicast => {
            out.push(transmit(
                us,
                LogicalAddress::broadcast(),
                SET_SYSTEM_AUDIO_MODE,
                &[SYSTEM_AUDIO_ON],
            ))
            .ok();
        }
        GIVE_OSD_NAME if unicast => {
            out.push(transmit(us, frame.initiator, SET_OSD_NAME, OSD_NAME.as_bytes()))
                .ok();
        }
        GIVE_PHYSICAL_ADDRESS if unicast => {
            out.push(Reaction::Transmit(report_physical_address(state))).ok();
        }
        GIVE_DEVICE_VENDOR_ID if unicast => {
            let [_, hi, mid, lo] = VENDOR_ID.to_be_bytes();
            out.push(transmit(
                us,
                LogicalAddress::broadcast(),
                DEVICE_VENDOR_ID,
                &[hi, mid, lo],
            ))
            .ok();
        }
        GET_CEC_VERSION if unicast => {
            out.push(transmit(us, frame.initiator, CEC_VERSION, &[CEC_VERSION_1_3A]))
                .ok();
        }
        REPORT_PHYSICAL_ADDRESS | DEVICE_VENDOR_ID
            if frame.initiator == LogicalAddress::TV && frame.dest.is_broadcast() =>
        {
            // The root device is (re)announcing itself; our own slot in
            // the topology may have moved.
            out.push(Reaction::Renegotiate).ok();
        }
        ROUTING_CHANGE => {
            // Operands: old address, then the newly routed one.
            if route_target(operand(2), operand(3)) == Some(state.physical)
                && !state.physical.is_unknown()
            {
                out.push(active_source(state)).ok();
            }
        }
        SET_STREAM_PATH => {
            if route_target(operand(0), operand(1)) == Some(state.physical)
                && !state.physical.is_unknown()
            {
                out.push(transmit(us, LogicalAddress::TV, IMAGE_VIEW_ON, &[]))
                    .ok();
                out.push(active_source(state)).ok();
            }
        }
        USER_CONTROL_PRESSED => {
            if let Some(code) = operand(0) {
                match keymap::lookup(code) {
                    Some(command) => out.push(Reaction::Key(command.key)).ok(),
                    None => out.push(Reaction::UnmappedControl(code)).ok(),
                };
            }
        }
        USER_CONTROL_RELEASED => {
            out.push(Reaction::Key(keymap::KEY_NONE)).ok();
        }
        // Recognized but requiring no reply from us; the bus task logs
        // every frame it sees.
        _ => {}
    }
    out
}

/// The broadcast Report Physical Address announcement, also sent at
/// startup and after renegotiation.
pub fn report_physical_address(state: &DeviceState) -> CecFrame {
    let [hi, lo] = state.physical.to_be_bytes();
    build(
        state.logical,
        LogicalAddress::broadcast(),
        CecOpCode::REPORT_PHYSICAL_ADDRESS,
        &[hi, lo, DEVICE_TYPE.into()],
    )
}

fn active_source(state: &DeviceState) -> Reaction {
    let [hi, lo] = state.physical.to_be_bytes();
    transmit(
        state.logical,
        LogicalAddress::broadcast(),
        CecOpCode::ACTIVE_SOURCE,
        &[hi, lo],
    )
}

fn route_target(hi: Option<u8>, lo: Option<u8>) -> Option<PhysicalAddress> {
    Some(PhysicalAddress::from_be_bytes([hi?, lo?]))
}

fn transmit(
    initiator: LogicalAddress,
    dest: LogicalAddress,
    opcode: CecOpCode,
    operands: &[u8],
) -> Reaction {
    Reaction::Transmit(build(initiator, dest, opcode, operands))
}

fn build(
    initiator: LogicalAddress,
    dest: LogicalAddress,
    opcode: CecOpCode,
    operands: &[u8],
) -> CecFrame {
    let mut ops: Vec<u8, MAX_CEC_OPERANDS> = Vec::new();
    // All reply payloads fit the operand capacity.
    let _ = ops.extend_from_slice(operands);
    CecFrame {
        initiator,
        dest,
        opcode: Some(opcode.into()),
        operands: (!ops.is_empty()).then_some(ops),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> DeviceState {
        DeviceState {
            logical: LogicalAddress(0x04),
            physical: PhysicalAddress(0x1020),
        }
    }

    fn frame(header: u8, body: &[u8]) -> CecFrame {
        let mut raw = vec![header];
        raw.extend_from_slice(body);
        CecFrame::parse(&raw).unwrap()
    }

    fn single_transmit(reactions: Reactions) -> CecFrame {
        assert_eq!(reactions.len(), 1);
        match &reactions[0] {
            Reaction::Transmit(frame) => frame.clone(),
            other => panic!("expected a transmit, got {other:?}"),
        }
    }

    #[test]
    fn give_power_status_is_answered_on() {
        let reply = single_transmit(dispatch(&state(), &frame(0x14, &[0x8f])));
        assert_eq!(reply.encode().as_slice(), &[0x41, 0x90, 0x00]);
    }

    #[test]
    fn power_status_query_to_absent_tv_is_answered_as_tv() {
        let reply = single_transmit(dispatch(&state(), &frame(0x10, &[0x8f])));
        assert_eq!(reply.encode().as_slice(), &[0x01, 0x90, 0x00]);
    }

    #[test]
    fn power_status_query_to_other_device_is_ignored() {
        assert!(dispatch(&state(), &frame(0x15, &[0x8f])).is_empty());
    }

    #[test]
    fn user_control_up_emits_arrow_up() {
        let reactions = dispatch(&state(), &frame(0x14, &[0x44, 0x01]));
        assert_eq!(reactions.as_slice(), &[Reaction::Key(0x52)]);
    }

    #[test]
    fn user_control_released_emits_no_key_sentinel() {
        let reactions = dispatch(&state(), &frame(0x14, &[0x45]));
        assert_eq!(reactions.as_slice(), &[Reaction::Key(keymap::KEY_NONE)]);
    }

    #[test]
    fn unmapped_user_control_is_reported() {
        let reactions = dispatch(&state(), &frame(0x14, &[0x44, 0x41]));
        assert_eq!(reactions.as_slice(), &[Reaction::UnmappedControl(0x41)]);
    }

    #[test]
    fn give_osd_name_replies_with_name() {
        let reply = single_transmit(dispatch(&state(), &frame(0x14, &[0x46])));
        assert_eq!(reply.opcode, Some(0x47));
        assert_eq!(reply.operands.as_deref(), Some(OSD_NAME.as_bytes()));
        assert_eq!(reply.dest, LogicalAddress(1));
    }

    #[test]
    fn give_physical_address_broadcasts_report() {
        let reply = single_transmit(dispatch(&state(), &frame(0x14, &[0x83])));
        assert_eq!(reply.encode().as_slice(), &[0x4f, 0x84, 0x10, 0x20, 0x04]);
    }

    #[test]
    fn give_vendor_id_broadcasts_id() {
        let reply = single_transmit(dispatch(&state(), &frame(0x14, &[0x8c])));
        assert_eq!(reply.encode().as_slice(), &[0x4f, 0x87, 0x00, 0x10, 0xfa]);
    }

    #[test]
    fn get_cec_version_replies_1_3a() {
        let reply = single_transmit(dispatch(&state(), &frame(0x14, &[0x9f])));
        assert_eq!(reply.encode().as_slice(), &[0x41, 0x9e, 0x04]);
    }

    #[test]
    fn give_audio_status_is_answered() {
        let reply = single_transmit(dispatch(&state(), &frame(0x14, &[0x71])));
        assert_eq!(reply.encode().as_slice(), &[0x41, 0x7a, 0x32]);
    }

    #[test]
    fn system_audio_mode_request_broadcasts_on() {
        let reply = single_transmit(dispatch(&state(), &frame(0x14, &[0x70])));
        assert_eq!(reply.encode().as_slice(), &[0x4f, 0x72, 0x01]);
    }

    #[test]
    fn tv_announcement_triggers_renegotiation() {
        let reactions = dispatch(&state(), &frame(0x0f, &[0x84, 0x00, 0x00, 0x00]));
        assert_eq!(reactions.as_slice(), &[Reaction::Renegotiate]);
        let reactions = dispatch(&state(), &frame(0x0f, &[0x87, 0x00, 0x10, 0xfa]));
        assert_eq!(reactions.as_slice(), &[Reaction::Renegotiate]);
    }

    #[test]
    fn non_tv_announcement_does_not_renegotiate() {
        assert!(dispatch(&state(), &frame(0x8f, &[0x84, 0x30, 0x00, 0x04])).is_empty());
    }

    #[test]
    fn set_stream_path_to_us_claims_active_source() {
        let reactions = dispatch(&state(), &frame(0x0f, &[0x86, 0x10, 0x20]));
        assert_eq!(reactions.len(), 2);
        let Reaction::Transmit(view_on) = &reactions[0] else {
            panic!("expected transmit");
        };
        assert_eq!(view_on.encode().as_slice(), &[0x40, 0x04]);
        let Reaction::Transmit(active) = &reactions[1] else {
            panic!("expected transmit");
        };
        assert_eq!(active.encode().as_slice(), &[0x4f, 0x82, 0x10, 0x20]);
    }

    #[test]
    fn set_stream_path_elsewhere_is_ignored() {
        assert!(dispatch(&state(), &frame(0x0f, &[0x86, 0x30, 0x00])).is_empty());
    }

    #[test]
    fn routing_change_to_us_claims_active_source() {
        let reactions = dispatch(&state(), &frame(0x0f, &[0x80, 0x30, 0x00, 0x10, 0x20]));
        let Reaction::Transmit(active) = &reactions[0] else {
            panic!("expected transmit");
        };
        assert_eq!(active.encode().as_slice(), &[0x4f, 0x82, 0x10, 0x20]);
    }

    #[test]
    fn unknown_physical_address_never_claims_active_source() {
        let state = DeviceState {
            logical: LogicalAddress(0x04),
            physical: PhysicalAddress::UNKNOWN,
        };
        assert!(dispatch(&state, &frame(0x0f, &[0x86, 0x00, 0x00])).is_empty());
    }

    #[test]
    fn unrecognized_opcode_is_reported() {
        let reactions = dispatch(&state(), &frame(0x14, &[0x05, 0x01]));
        assert_eq!(reactions.as_slice(), &[Reaction::Unrecognized(0x05)]);
    }

    #[test]
    fn polling_message_produces_nothing() {
        assert!(dispatch(&state(), &frame(0x44, &[])).is_empty());
    }

    #[test]
    fn recognized_broadcasts_without_handler_produce_nothing() {
        // Standby and Active Source are observed, not answered.
        assert!(dispatch(&state(), &frame(0x0f, &[0x36])).is_empty());
        assert!(dispatch(&state(), &frame(0x8f, &[0x82, 0x30, 0x00])).is_empty());
    }

    #[test]
    fn dispatch_is_idempotent_per_frame() {
        let query = frame(0x14, &[0x8f]);
        assert_eq!(dispatch(&state(), &query), dispatch(&state(), &query));
    }
}
