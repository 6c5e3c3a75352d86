//! Endpoint plumbing between the Embassy classes and the channel handlers.
//!
//! The handlers in the library are synchronous and see the link through
//! [`CdcTransport`] / [`HidTransport`]. This module provides those two
//! transports over static queues and the tasks that move bytes between
//! the queues and the USB endpoints.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::pipe::Pipe;
use embassy_sync::signal::Signal;
use embassy_usb::class::cdc_acm::{ControlChanged, Receiver, Sender};
use embassy_usb::driver::EndpointError;

use usb_hid_vcp::cdc::{CdcChannel, CdcEvent, CdcTransport, LineState};
use usb_hid_vcp::config;
use usb_hid_vcp::hid::mouse::MouseReport;
use usb_hid_vcp::hid::HidTransport;
use usb_hid_vcp::{ChannelId, Error, Result};

use super::device::{MouseWriter, UsbDriver};

/// Set by the USB handler once the host selects a configuration.
pub static USB_CONFIGURED: AtomicBool = AtomicBool::new(false);
/// Set while the bus is suspended.
pub static USB_SUSPENDED: AtomicBool = AtomicBool::new(false);

/// Bytes queued for the CDC IN endpoint.
static CDC_TX: Pipe<CriticalSectionRawMutex, { config::CDC_TX_QUEUE_SIZE }> = Pipe::new();
/// Raised by `write_flush`; the TX task drains `CDC_TX` when it fires.
static CDC_FLUSH: Signal<CriticalSectionRawMutex, ()> = Signal::new();
/// DTR as last reported by the host.
static CDC_DTR: AtomicBool = AtomicBool::new(false);

/// One pending report; a full queue means the endpoint is busy.
static MOUSE_REPORTS: Channel<CriticalSectionRawMutex, (u8, MouseReport), 1> = Channel::new();

const CDC_PACKET: usize = config::CDC_EP_BUFSIZE as usize;

/// CDC transport over the static TX queue.
///
/// `pending` holds the packet the RX task already pulled off the OUT
/// endpoint, so `read` never blocks.
pub struct CdcPort<'a> {
    pending: Option<Result<&'a [u8]>>,
}

impl<'a> CdcPort<'a> {
    /// A port with nothing to read, for writers such as the heartbeat.
    pub const fn idle() -> Self {
        Self { pending: None }
    }

    fn with_packet(packet: Result<&'a [u8]>) -> Self {
        Self {
            pending: Some(packet),
        }
    }
}

impl CdcTransport for CdcPort<'_> {
    fn read(&mut self, _channel: ChannelId, buf: &mut [u8]) -> Result<usize> {
        match self.pending.take() {
            Some(Ok(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            None => Ok(0),
        }
    }

    fn write_enqueue(&mut self, _channel: ChannelId, data: &[u8]) -> usize {
        CDC_TX.try_write(data).unwrap_or(0)
    }

    fn write_flush(&mut self, _channel: ChannelId, _timeout_ms: u32) {
        CDC_FLUSH.signal(());
    }

    fn connected(&self, _channel: ChannelId) -> bool {
        CDC_DTR.load(Ordering::Acquire)
    }
}

/// HID transport over the single-slot report queue.
pub struct HidPort;

impl HidTransport for HidPort {
    fn endpoint_ready(&self, _channel: ChannelId) -> bool {
        USB_CONFIGURED.load(Ordering::Acquire)
            && !USB_SUSPENDED.load(Ordering::Acquire)
            && !MOUSE_REPORTS.is_full()
    }

    fn send_report(&mut self, _channel: ChannelId, report_id: u8, report: &MouseReport) -> bool {
        MOUSE_REPORTS.try_send((report_id, *report)).is_ok()
    }
}

/// CDC receive task - feeds OUT packets and line-state changes to the
/// channel handler.
pub async fn cdc_rx_task(
    mut receiver: Receiver<'static, UsbDriver>,
    control: ControlChanged<'static>,
) -> ! {
    let mut channel = CdcChannel::new(config::CHANNEL);
    let mut packet = [0u8; CDC_PACKET];

    loop {
        receiver.wait_connection().await;
        info!("CDC {}: endpoints enabled", channel.id());

        loop {
            let event = select(receiver.read_packet(&mut packet), control.control_changed()).await;
            match event {
                Either::First(Ok(n)) => {
                    let mut port = CdcPort::with_packet(Ok(&packet[..n]));
                    channel.handle(CdcEvent::Received, &mut port);
                }
                Either::First(Err(EndpointError::Disabled)) => break,
                Either::First(Err(EndpointError::BufferOverflow)) => {
                    let mut port = CdcPort::with_packet(Err(Error::TransportRead));
                    channel.handle(CdcEvent::Received, &mut port);
                }
                Either::Second(()) => {
                    let line = LineState {
                        dtr: receiver.dtr(),
                        rts: receiver.rts(),
                    };
                    CDC_DTR.store(line.dtr, Ordering::Release);
                    channel.handle(CdcEvent::LineStateChanged(line), &mut CdcPort::idle());
                }
            }
        }

        CDC_DTR.store(false, Ordering::Release);
        info!("CDC {}: endpoints disabled", channel.id());
    }
}

/// CDC transmit task - drains the TX queue to the IN endpoint on flush.
pub async fn cdc_tx_task(mut sender: Sender<'static, UsbDriver>) -> ! {
    let mut packet = [0u8; CDC_PACKET];

    loop {
        sender.wait_connection().await;
        debug!("CDC TX ready");

        while drain(&mut sender, &mut packet).await.is_ok() {}

        warn!("CDC TX endpoint disabled, waiting for host");
    }
}

/// Wait for a flush and write everything queued so far.
async fn drain(
    sender: &mut Sender<'static, UsbDriver>,
    packet: &mut [u8; CDC_PACKET],
) -> core::result::Result<(), EndpointError> {
    CDC_FLUSH.wait().await;

    let mut last = 0;
    while let Ok(n) = CDC_TX.try_read(packet) {
        sender.write_packet(&packet[..n]).await?;
        last = n;
    }
    // A full final packet needs a ZLP to end the transfer.
    if last == CDC_PACKET {
        sender.write_packet(&[]).await?;
    }
    Ok(())
}

/// HID report forwarding task - writes queued mouse reports to the
/// interrupt IN endpoint.
pub async fn hid_writer_task(mut mouse: MouseWriter) -> ! {
    info!("HID writer task started - waiting for reports");

    let mut buf = [0u8; config::HID_EP_BUFSIZE as usize];

    loop {
        let (report_id, report) = MOUSE_REPORTS.receive().await;

        let n = if report_id == 0 {
            report.serialize(&mut buf)
        } else {
            buf[0] = report_id;
            report.serialize(&mut buf[1..]) + 1
        };
        if let Err(e) = mouse.write(&buf[..n]).await {
            warn!("HID {}: mouse write failed: {}", config::CHANNEL, e);
        }
    }
}
