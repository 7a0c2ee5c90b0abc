//! Physical address discovery over the HDMI DDC channel.
//!
//! The sink's EDID sits behind I2C address 0x50. A single 256 byte read
//! covers the base block and the CTA extension that carries the HDMI
//! vendor block with our physical address.

use cec_core::edid;
use cec_core::PhysicalAddress;
use defmt::*;
use embassy_rp::i2c::{Async, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_time::{with_timeout, Duration};
use embedded_hal_async::i2c::I2c as _;

pub type DdcBus = I2c<'static, I2C0, Async>;

const EDID_I2C_ADDR: u8 = 0x50;
const DDC_TIMEOUT: Duration = Duration::from_millis(100);

pub fn config() -> embassy_rp::i2c::Config {
    let mut config = embassy_rp::i2c::Config::default();
    // DDC is specified at standard speed.
    config.frequency = 100_000;
    config
}

/// Reads the sink's EDID and extracts our physical address. Any failure
/// along the way, unplugged cable included, degrades to UNKNOWN rather
/// than stalling the bus task.
pub async fn read_physical_address(bus: &mut DdcBus) -> PhysicalAddress {
    let mut raw = [0u8; edid::EDID_LEN];
    // Set the word offset to zero, then read both blocks in one go.
    match with_timeout(DDC_TIMEOUT, bus.write_read(EDID_I2C_ADDR, &[0x00], &mut raw)).await {
        Ok(Ok(())) => {
            let address = edid::parse_physical_address(&raw);
            if address.is_unknown() {
                warn!("EDID read ok but no physical address in it");
            } else {
                info!("physical address {:04x}", address.0);
            }
            address
        }
        Ok(Err(e)) => {
            warn!("DDC read failed: {}", e);
            PhysicalAddress::UNKNOWN
        }
        Err(_) => {
            warn!("DDC read timed out");
            PhysicalAddress::UNKNOWN
        }
    }
}
