//! User-control code to USB HID keycode mapping.
//!
//! HID usage IDs are from the Keyboard/Keypad page (0x07) of the USB
//! HID usage tables.

/// The "no key" report, sent when a user control is released.
pub const KEY_NONE: u8 = 0x00;

/// A mapped remote button: its display name and the HID usage ID the
/// host receives.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyCommand {
    pub name: &'static str,
    pub key: u8,
}

const fn cmd(name: &'static str, key: u8) -> Option<KeyCommand> {
    Some(KeyCommand { name, key })
}

/// Look up a CEC user-control code. Unmapped codes (volume keys among
/// them, which belong to the amplifier, not the host) return `None`.
pub fn lookup(code: u8) -> Option<KeyCommand> {
    match code {
        0x00 => cmd("Select", 0x28),              // Enter
        0x01 => cmd("Up", 0x52),                  // Arrow up
        0x02 => cmd("Down", 0x51),                // Arrow down
        0x03 => cmd("Left", 0x50),                // Arrow left
        0x04 => cmd("Right", 0x4f),               // Arrow right
        0x0d => cmd("Exit", 0x2a),                // Backspace
        0x20 => cmd("0", 0x27),
        0x21 => cmd("1", 0x1e),
        0x22 => cmd("2", 0x1f),
        0x23 => cmd("3", 0x20),
        0x24 => cmd("4", 0x21),
        0x25 => cmd("5", 0x22),
        0x26 => cmd("6", 0x23),
        0x27 => cmd("7", 0x24),
        0x28 => cmd("8", 0x25),
        0x29 => cmd("9", 0x26),
        0x35 => cmd("Display Information", 0x0c), // I
        0x44 => cmd("Play", 0x13),                // P
        0x45 => cmd("Stop", 0x1b),                // X
        0x46 => cmd("Pause", 0x2c),               // Space
        0x48 => cmd("Rewind", 0x15),              // R
        0x49 => cmd("Fast Forward", 0x09),        // F
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_maps_to_arrow_up() {
        let command = lookup(0x01).unwrap();
        assert_eq!(command.name, "Up");
        assert_eq!(command.key, 0x52);
    }

    #[test]
    fn digits_map_to_number_row() {
        assert_eq!(lookup(0x20).unwrap().key, 0x27); // 0
        assert_eq!(lookup(0x21).unwrap().key, 0x1e); // 1
        assert_eq!(lookup(0x29).unwrap().key, 0x26); // 9
    }

    #[test]
    fn volume_keys_are_unmapped() {
        assert!(lookup(0x41).is_none());
        assert!(lookup(0x42).is_none());
    }
}
