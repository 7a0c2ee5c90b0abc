//! CEC opcode and descriptor tables.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::IntoStaticStr;

/// Opcodes understood by this device. Anything else is reported as
/// unrecognized by the dispatcher.
#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive, IntoStaticStr)]
pub enum CecOpCode {
    FEATURE_ABORT = 0x00,
    IMAGE_VIEW_ON = 0x04,
    TEXT_VIEW_ON = 0x0d,
    SET_MENU_LANGUAGE = 0x32,
    STANDBY = 0x36,
    USER_CONTROL_PRESSED = 0x44,
    USER_CONTROL_RELEASED = 0x45,
    GIVE_OSD_NAME = 0x46,
    SET_OSD_NAME = 0x47,
    SYSTEM_AUDIO_MODE_REQUEST = 0x70,
    GIVE_AUDIO_STATUS = 0x71,
    SET_SYSTEM_AUDIO_MODE = 0x72,
    REPORT_AUDIO_STATUS = 0x7a,
    GIVE_SYSTEM_AUDIO_MODE_STATUS = 0x7d,
    SYSTEM_AUDIO_MODE_STATUS = 0x7e,
    ROUTING_CHANGE = 0x80,
    ACTIVE_SOURCE = 0x82,
    GIVE_PHYSICAL_ADDRESS = 0x83,
    REPORT_PHYSICAL_ADDRESS = 0x84,
    REQUEST_ACTIVE_SOURCE = 0x85,
    SET_STREAM_PATH = 0x86,
    DEVICE_VENDOR_ID = 0x87,
    GIVE_DEVICE_VENDOR_ID = 0x8c,
    MENU_STATUS = 0x8e,
    GIVE_DEVICE_POWER_STATUS = 0x8f,
    REPORT_POWER_STATUS = 0x90,
    GET_MENU_LANGUAGE = 0x91,
    INACTIVE_SOURCE = 0x9d,
    CEC_VERSION = 0x9e,
    GET_CEC_VERSION = 0x9f,
    VENDOR_COMMAND_WITH_ID = 0xa0,
    ABORT = 0xff,
}

#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive, IntoStaticStr)]
pub enum CecDeviceType {
    TV = 0x00,
    RECORDING_DEVICE = 0x01,
    TUNER = 0x03,
    PLAYBACK_DEVICE = 0x04,
    AUDIO_SYSTEM = 0x05,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trips_through_u8() {
        assert_eq!(u8::from(CecOpCode::GIVE_DEVICE_POWER_STATUS), 0x8f);
        assert_eq!(
            CecOpCode::try_from(0x90u8),
            Ok(CecOpCode::REPORT_POWER_STATUS)
        );
        assert!(CecOpCode::try_from(0x05u8).is_err());
    }

    #[test]
    fn opcode_names_for_logging() {
        let name: &'static str = CecOpCode::USER_CONTROL_PRESSED.into();
        assert_eq!(name, "USER_CONTROL_PRESSED");
    }
}
