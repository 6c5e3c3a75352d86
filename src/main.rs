//! usb-hid-vcp firmware entry point.
//!
//! Brings up the nRF52840 USB peripheral as a composite device with a
//! CDC-ACM echo port and a HID mouse, then runs the once-per-second
//! heartbeat task that drives both.

#![no_std]
#![no_main]

mod platform;
mod usb;

use defmt::{error, info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::pac;
use embassy_time::Timer;
use embassy_usb::class::cdc_acm::{ControlChanged, Receiver, Sender};
use embassy_usb::UsbDevice;
use {defmt_rtt as _, panic_probe as _};

use usb_hid_vcp::app::CompositeApp;
use usb_hid_vcp::config;
use usb_hid_vcp::descriptor::{DescriptorSet, COMPOSITE_BLOCKS};
use usb_hid_vcp::task::{TaskConfig, TaskHandle};

use platform::{EmbassyClock, SignalWait, TASK_SIGNAL};
use usb::device::{MouseWriter, UsbDriver};
use usb::port::{CdcPort, HidPort};

#[embassy_executor::task]
async fn usb_task(device: UsbDevice<'static, UsbDriver>) -> ! {
    usb::device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn cdc_rx_task(
    receiver: Receiver<'static, UsbDriver>,
    control: ControlChanged<'static>,
) -> ! {
    usb::port::cdc_rx_task(receiver, control).await
}

#[embassy_executor::task]
async fn cdc_tx_task(sender: Sender<'static, UsbDriver>) -> ! {
    usb::port::cdc_tx_task(sender).await
}

#[embassy_executor::task]
async fn hid_writer_task(mouse: MouseWriter) -> ! {
    usb::port::hid_writer_task(mouse).await
}

/// The periodic heartbeat: serial line when a host is attached, then one
/// mouse report.
#[embassy_executor::task]
async fn heartbeat_task() {
    let mut app = CompositeApp::new(config::CHANNEL, config::CHANNEL);
    let mut task = TaskHandle::new(
        TaskConfig {
            name: config::TASK_NAME,
            period_ms: config::TASK_PERIOD_MS,
        },
        EmbassyClock,
        SignalWait::new(&TASK_SIGNAL),
    );

    let state = task
        .run(|ctx| app.on_tick(ctx, &mut CdcPort::idle(), &mut HidPort))
        .await;
    info!("Task '{}' exited in state {}", task.name(), state);
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("Bootup");

    // USBD needs the external high-frequency crystal.
    pac::CLOCK.tasks_hfclkstart().write_value(1);
    while pac::CLOCK.events_hfclkstarted().read() != 1 {}

    let descriptors = match DescriptorSet::new(&COMPOSITE_BLOCKS, &config::USB_STRINGS) {
        Ok(set) => set,
        Err(e) => {
            error!("Descriptor build failed: {}", e);
            return;
        }
    };
    info!(
        "Descriptors ready: {} interfaces, {} config bytes",
        descriptors.configuration.num_interfaces(),
        descriptors.configuration.total_length()
    );

    let composite = usb::device::init(p.USBD, &descriptors);
    let (sender, receiver, control) = composite.cdc.split_with_control();

    unwrap!(spawner.spawn(usb_task(composite.device)));
    unwrap!(spawner.spawn(cdc_rx_task(receiver, control)));
    unwrap!(spawner.spawn(cdc_tx_task(sender)));
    unwrap!(spawner.spawn(hid_writer_task(composite.mouse)));
    unwrap!(spawner.spawn(heartbeat_task()));

    loop {
        Timer::after_secs(1).await;
    }
}
