#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output, OutputOpenDrain};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{I2C0, USB};
use embassy_rp::usb::{self, Driver};
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

mod cec;
mod ddc;
mod hid;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => usb::InterruptHandler<USB>;
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
});

#[embassy_executor::task]
async fn heartbeat(mut led: Output<'static>) {
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(1000)).await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("cec bridge starting");

    spawner.spawn(heartbeat(Output::new(p.PIN_25, Level::Low))).unwrap();

    let driver = Driver::new(p.USB, Irqs);
    let (device, writer) = hid::setup(driver);
    spawner.spawn(hid::usb_task(device)).unwrap();
    spawner.spawn(hid::key_report_task(writer)).unwrap();

    // DDC rides on I2C0, GP4 = SDA / GP5 = SCL.
    let ddc = I2c::new_async(p.I2C0, p.PIN_5, p.PIN_4, Irqs, ddc::config());

    // The CEC line idles released and is only driven to write a zero.
    let cec_pin = OutputOpenDrain::new(p.PIN_11, Level::High);
    spawner.spawn(cec::bus_task(cec_pin, ddc)).unwrap();
}
