//! USB HID keyboard surface.
//!
//! Remote presses arrive from the bus task through [`KEY_EVENTS`] as
//! HID usage codes, zero meaning all keys released. Each event becomes
//! one keyboard report, so a key stays down until the TV sends the
//! matching User Control Released.

use defmt::*;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_usb::class::hid::{self, HidWriter};
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;
use usbd_hid::descriptor::{KeyboardReport, SerializedDescriptor};

/// Pending key presses, HID usage codes. The bus task drops presses
/// instead of blocking when the host stops draining reports.
pub static KEY_EVENTS: Channel<CriticalSectionRawMutex, u8, 16> = Channel::new();

type UsbDriver = Driver<'static, USB>;

pub fn setup(driver: UsbDriver) -> (UsbDevice<'static, UsbDriver>, HidWriter<'static, UsbDriver, 8>) {
    let mut config = Config::new(0xc0de, 0xcafe);
    config.manufacturer = Some("cec-bridge");
    config.product = Some("CEC remote keyboard");
    config.serial_number = Some("0001");
    config.max_power = 100;
    config.max_packet_size_0 = 64;

    static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
    static HID_STATE: StaticCell<hid::State<'static>> = StaticCell::new();

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUF.init([0; 64]),
    );

    let hid_config = hid::Config {
        report_descriptor: KeyboardReport::desc(),
        request_handler: None,
        poll_ms: 10,
        max_packet_size: 8,
    };
    let writer = HidWriter::new(&mut builder, HID_STATE.init(hid::State::new()), hid_config);

    (builder.build(), writer)
}

#[embassy_executor::task]
pub async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    device.run().await
}

#[embassy_executor::task]
pub async fn key_report_task(mut writer: HidWriter<'static, UsbDriver, 8>) {
    loop {
        let key = KEY_EVENTS.receive().await;
        debug!("key report {:02x}", key);
        let report = KeyboardReport {
            modifier: 0,
            reserved: 0,
            leds: 0,
            keycodes: [key, 0, 0, 0, 0, 0],
        };
        if let Err(e) = writer.write_serialize(&report).await {
            warn!("key report dropped: {}", e);
        }
    }
}
