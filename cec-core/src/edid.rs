//! Physical address extraction from an EDID image.
//!
//! The 256-byte image read over DDC holds the base EDID block and one
//! CTA-861 extension block. The HDMI Vendor-Specific Data Block inside
//! the extension's data block collection carries the source's physical
//! address. Every failure mode resolves to
//! [`PhysicalAddress::UNKNOWN`]; a missing address is an operating
//! condition, not an error.

use crate::frame::PhysicalAddress;

/// Full DDC read size: base block plus CTA extension.
pub const EDID_LEN: usize = 256;
const BLOCK_LEN: usize = 128;

/// Fixed magic at the start of every base EDID block.
const HEADER: [u8; 8] = [0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];
/// CTA-861 extension tag and revision.
const CTA_TAG: [u8; 2] = [0x02, 0x03];
/// HDMI Licensing, LLC OUI as it appears on the wire (little-endian).
const HDMI_OUI: [u8; 3] = [0x03, 0x0c, 0x00];

/// Offset of the extension-block count in the base block.
const EXTENSION_COUNT: usize = 126;
/// Offset, within the extension, of the detailed-timing-descriptor
/// start (which ends the data block collection).
const CTA_DTD_START: usize = 0x02;
/// Offset, within the extension, of the data block collection.
const CTA_DBC_OFFSET: usize = 0x04;

/// Byte sum of an EDID block is zero mod 256.
fn checksum_ok(block: &[u8]) -> bool {
    block.iter().fold(0u8, |sum, b| sum.wrapping_add(*b)) == 0
}

/// Scan a validated image for the HDMI VSDB physical address.
///
/// Returns [`PhysicalAddress::UNKNOWN`] when either block fails its
/// checksum, the base block lacks the EDID magic, no CTA extension is
/// present, or no matching vendor block is found.
pub fn parse_physical_address(edid: &[u8; EDID_LEN]) -> PhysicalAddress {
    let (base, cta) = edid.split_at(BLOCK_LEN);
    if !checksum_ok(base) || !checksum_ok(cta) {
        return PhysicalAddress::UNKNOWN;
    }
    if base[..HEADER.len()] != HEADER {
        return PhysicalAddress::UNKNOWN;
    }
    if base[EXTENSION_COUNT] == 0 || cta[..CTA_TAG.len()] != CTA_TAG {
        return PhysicalAddress::UNKNOWN;
    }

    let dtd_start = (cta[CTA_DTD_START] as usize).min(BLOCK_LEN);
    let mut offset = CTA_DBC_OFFSET;
    while offset < dtd_start {
        let len = (cta[offset] & 0x1f) as usize;
        if len == 0 {
            offset += 1;
            continue;
        }
        if let Some(addr) = vendor_block_address(&cta[offset..], len) {
            return addr;
        }
        // Skip the header byte plus the payload.
        offset += len + 1;
    }
    PhysicalAddress::UNKNOWN
}

/// The physical address from a single data block, if it is an HDMI
/// vendor block. Payload layout after the header byte: 3 OUI bytes,
/// then the physical address low byte first.
fn vendor_block_address(block: &[u8], len: usize) -> Option<PhysicalAddress> {
    if len < 5 || block.len() < 6 {
        return None;
    }
    if block[1..4] != HDMI_OUI {
        return None;
    }
    Some(PhysicalAddress(((block[5] as u16) << 8) | block[4] as u16))
}
