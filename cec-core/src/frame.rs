//! CEC frame and address types.

use heapless::Vec;

/// A frame carries at most the header byte, an opcode and 14 operands.
pub const MAX_FRAME_LEN: usize = 16;
/// Operand capacity of a frame.
pub const MAX_CEC_OPERANDS: usize = MAX_FRAME_LEN - 2;

/// 4-bit device-role address on the CEC bus.
#[derive(Default, Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogicalAddress(pub u8);

impl LogicalAddress {
    /// The TV / root device.
    pub const TV: LogicalAddress = LogicalAddress(0);

    pub const fn broadcast() -> LogicalAddress {
        LogicalAddress(15)
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == 15
    }
}

/// 16-bit HDMI topology address, discovered via EDID.
#[derive(Default, Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalAddress(pub u16);

impl PhysicalAddress {
    /// The address reported when discovery failed or has not run yet.
    pub const UNKNOWN: PhysicalAddress = PhysicalAddress(0x0000);

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    /// Big-endian wire representation used in CEC operands.
    pub fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 2]) -> Self {
        PhysicalAddress(u16::from_be_bytes(bytes))
    }
}

#[derive(Default, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CecFrame {
    pub initiator: LogicalAddress,
    pub dest: LogicalAddress,
    pub opcode: Option<u8>,
    pub operands: Option<Vec<u8, MAX_CEC_OPERANDS>>,
}

impl CecFrame {
    /// A one-byte self-addressed probe, used for logical address
    /// allocation and alive checks.
    pub fn polling(addr: LogicalAddress) -> CecFrame {
        CecFrame {
            initiator: addr,
            dest: addr,
            ..Default::default()
        }
    }

    pub fn is_polling_message(&self) -> bool {
        self.opcode.is_none() && self.operands.is_none()
    }

    /// Header byte: initiator in the high nibble, destination in the low.
    pub fn header(&self) -> u8 {
        (self.initiator.0 << 4) | (self.dest.0 & 0x0f)
    }

    /// Reassemble a frame from raw received bytes. Empty input (an
    /// aborted reception) yields `None`.
    pub fn parse(raw: &[u8]) -> Option<CecFrame> {
        let header = *raw.first()?;
        let operands = raw.get(2..).filter(|rest| !rest.is_empty());
        Some(CecFrame {
            initiator: LogicalAddress(header >> 4),
            dest: LogicalAddress(header & 0x0f),
            opcode: raw.get(1).copied(),
            // Capacity matches MAX_FRAME_LEN, cannot fail.
            operands: operands.map(|rest| Vec::from_slice(rest).unwrap_or_default()),
        })
    }

    /// Serialize into wire order: header, opcode, operands.
    pub fn encode(&self) -> Vec<u8, MAX_FRAME_LEN> {
        let mut raw = Vec::new();
        let _ = raw.push(self.header());
        if let Some(opcode) = self.opcode {
            let _ = raw.push(opcode);
        }
        if let Some(operands) = &self.operands {
            let _ = raw.extend_from_slice(operands);
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_packs_nibbles() {
        let frame = CecFrame {
            initiator: LogicalAddress(0x4),
            dest: LogicalAddress(0xf),
            ..Default::default()
        };
        assert_eq!(frame.header(), 0x4f);
    }

    #[test]
    fn parse_then_encode_is_identity() {
        let raw = [0x45, 0x44, 0x01];
        let frame = CecFrame::parse(&raw).unwrap();
        assert_eq!(frame.initiator, LogicalAddress(4));
        assert_eq!(frame.dest, LogicalAddress(5));
        assert_eq!(frame.opcode, Some(0x44));
        assert_eq!(frame.operands.as_deref(), Some(&[0x01][..]));
        assert_eq!(frame.encode().as_slice(), &raw);
    }

    #[test]
    fn polling_message_is_one_byte() {
        let frame = CecFrame::polling(LogicalAddress(8));
        assert!(frame.is_polling_message());
        assert_eq!(frame.encode().as_slice(), &[0x88]);
    }

    #[test]
    fn parse_of_empty_input_is_none() {
        assert!(CecFrame::parse(&[]).is_none());
    }

    #[test]
    fn physical_address_round_trips() {
        let addr = PhysicalAddress(0x1020);
        assert_eq!(addr.to_be_bytes(), [0x10, 0x20]);
        assert_eq!(PhysicalAddress::from_be_bytes([0x10, 0x20]), addr);
        assert!(!addr.is_unknown());
        assert!(PhysicalAddress::UNKNOWN.is_unknown());
    }
}
