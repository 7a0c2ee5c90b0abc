//! The CEC bus engine task.
//!
//! One task owns the CEC pin. Reception and transmission both run the
//! pure step machines from `cec-core`; this module only supplies edge
//! timestamps, timers and the open drain line itself.

use cec_core::cec_types::CecOpCode;
use cec_core::dispatch::{self, DeviceState, Reaction};
use cec_core::timing;
use cec_core::{
    AddressAllocator, CecFrame, EdgeKind, FrameReceiver, FrameTransmitter, LineOp, LogicalAddress,
    RxAction, TxStep,
};
use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::OutputOpenDrain;
use embassy_time::{with_timeout, Duration, Instant, Timer};

use crate::ddc::{self, DdcBus};
use crate::hid;

type CecPin = OutputOpenDrain<'static>;

const SIGNAL_FREE: Duration =
    Duration::from_micros(timing::SIGNAL_FREE_BITS * timing::BIT_SLOT);

/// An entire frame fits in well under 50ms; anything longer means we
/// lost sync and the receiver is waiting for edges that never come.
const FRAME_TIMEOUT: Duration = Duration::from_millis(200);

/// How long a key press may wait for room in the HID queue before it
/// is dropped. The bus must keep listening.
const KEY_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(10);

#[embassy_executor::task]
pub async fn bus_task(mut pin: CecPin, mut ddc: DdcBus) {
    let physical = ddc::read_physical_address(&mut ddc).await;
    let logical = allocate_logical_address(&mut pin).await;
    let mut state = DeviceState { logical, physical };
    info!(
        "on the bus, logical {} physical {:04x}",
        state.logical, state.physical.0
    );
    announce(&mut pin, &state).await;

    loop {
        match receive(&mut pin, state.logical).await {
            Some(frame) => {
                log_frame(&frame);
                react(&mut pin, &mut ddc, &mut state, &frame).await;
            }
            None => debug!("dropped a malformed or foreign frame"),
        }
    }
}

async fn react(pin: &mut CecPin, ddc: &mut DdcBus, state: &mut DeviceState, frame: &CecFrame) {
    for reaction in dispatch::dispatch(state, frame) {
        match reaction {
            Reaction::Transmit(reply) => send(pin, &reply).await,
            Reaction::Key(key) => {
                if with_timeout(KEY_ENQUEUE_TIMEOUT, hid::KEY_EVENTS.send(key))
                    .await
                    .is_err()
                {
                    warn!("HID queue full, dropping key {:02x}", key);
                }
            }
            Reaction::UnmappedControl(code) => warn!("no key mapping for user control {:02x}", code),
            Reaction::Unrecognized(opcode) => warn!("unrecognized opcode {:02x}", opcode),
            Reaction::Renegotiate => {
                info!("topology changed, renegotiating addresses");
                state.physical = ddc::read_physical_address(ddc).await;
                state.logical = allocate_logical_address(pin).await;
                announce(pin, state).await;
            }
        }
    }
}

/// Probes candidate logical addresses with polling messages until one
/// goes unacknowledged and is therefore free.
async fn allocate_logical_address(pin: &mut CecPin) -> LogicalAddress {
    let mut allocator = AddressAllocator::new();
    loop {
        debug!("probing logical address {}", allocator.candidate());
        let acked = transmit(pin, &allocator.probe()).await;
        if let Some(address) = allocator.observe(acked) {
            info!("claimed logical address {}", address);
            return address;
        }
    }
}

async fn announce(pin: &mut CecPin, state: &DeviceState) {
    send(pin, &dispatch::report_physical_address(state)).await;
}

/// Transmits and warns when a directly addressed frame goes without an
/// ACK. Broadcasts are fire and forget, a low ACK bit there is a
/// rejection by some follower and not worth retrying.
async fn send(pin: &mut CecPin, frame: &CecFrame) {
    let acked = transmit(pin, frame).await;
    if !frame.dest.is_broadcast() && !acked {
        warn!("frame to {} not acknowledged", frame.dest);
    }
}

/// Receives one frame, asserting ACKs for blocks addressed to us. Returns
/// None when the receiver aborted or the frame failed to parse.
async fn receive(pin: &mut CecPin, address: LogicalAddress) -> Option<CecFrame> {
    pin.wait_for_falling_edge().await;
    let mut rx = FrameReceiver::new(address);
    let mut action = rx.edge(Instant::now().as_micros());

    let result = with_timeout(FRAME_TIMEOUT, async {
        loop {
            match action {
                RxAction::Listen(EdgeKind::Falling) => pin.wait_for_falling_edge().await,
                RxAction::Listen(EdgeKind::Rising) => pin.wait_for_rising_edge().await,
                RxAction::AssertAck { release_at } => {
                    pin.set_low();
                    Timer::at(Instant::from_micros(release_at)).await;
                    pin.set_high();
                }
                RxAction::Complete => return rx.frame(),
                RxAction::Abort => return None,
            }
            action = rx.edge(Instant::now().as_micros());
        }
    })
    .await;

    match result {
        Ok(frame) => frame,
        Err(_) => {
            // Never leave the line driven if the timeout hit mid ACK.
            pin.set_high();
            warn!("frame reception timed out");
            None
        }
    }
}

/// Waits for the signal free time, then clocks the whole frame out
/// with absolute deadline timers. Returns the sampled ACK bit.
async fn transmit(pin: &mut CecPin, frame: &CecFrame) -> bool {
    await_signal_free(pin).await;
    let mut tx = FrameTransmitter::new(frame);
    loop {
        let now = Instant::now();
        match tx.tick(now.as_micros(), pin.is_low()) {
            TxStep::Continue { op, delay_us } => {
                match op {
                    LineOp::DriveLow => pin.set_low(),
                    LineOp::Release => pin.set_high(),
                    LineOp::None => {}
                }
                Timer::at(now + Duration::from_micros(delay_us)).await;
            }
            TxStep::Done { acked } => return acked,
        }
    }
}

/// The bus must idle high for seven bit periods before we may start a
/// frame. Any falling edge restarts the wait.
async fn await_signal_free(pin: &mut CecPin) {
    loop {
        if pin.is_low() {
            pin.wait_for_rising_edge().await;
        }
        match select(pin.wait_for_falling_edge(), Timer::after(SIGNAL_FREE)).await {
            Either::First(_) => continue,
            Either::Second(_) => return,
        }
    }
}

fn log_frame(frame: &CecFrame) {
    match frame.opcode {
        None => info!("{} -> {} [Polling]", frame.initiator, frame.dest),
        Some(opcode) => match CecOpCode::try_from(opcode) {
            Ok(known) => {
                let name: &str = known.into();
                info!("{} -> {} [{}]", frame.initiator, frame.dest, name);
            }
            Err(_) => info!(
                "{} -> {} [opcode {:02x}]",
                frame.initiator, frame.dest, opcode
            ),
        },
    }
}
