//! USB composite device - CDC-ACM + HID mouse.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral from a validated [`DescriptorSet`].

use core::sync::atomic::Ordering;

use defmt::{debug, info};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State as CdcState};
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, ReportId, RequestHandler, State};
use embassy_usb::control::OutResponse;
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

use usb_hid_vcp::config;
use usb_hid_vcp::descriptor::{DescriptorSet, StringEntry, StringTable};
use usb_hid_vcp::hid::mouse::MOUSE_REPORT_DESCRIPTOR;
use usb_hid_vcp::hid::{self, HidRequest, ReportType};

use super::port::{USB_CONFIGURED, USB_SUSPENDED};
use crate::platform::{TaskSignal, TASK_SIGNAL};

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

/// Concrete driver type for this board.
pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

/// HID writer sized to the interrupt endpoint.
pub type MouseWriter = HidWriter<'static, UsbDriver, { config::HID_EP_BUFSIZE as usize }>;

static CDC_STATE: StaticCell<CdcState> = StaticCell::new();
static MOUSE_STATE: StaticCell<State> = StaticCell::new();
static MOUSE_REQUESTS: StaticCell<MouseRequestHandler> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_STATE_HANDLER: StaticCell<UsbStateHandler> = StaticCell::new();

/// Tracks bus state for the non-blocking HID readiness check.
struct UsbStateHandler;

impl embassy_usb::Handler for UsbStateHandler {
    fn configured(&mut self, configured: bool) {
        USB_CONFIGURED.store(configured, Ordering::Release);
        info!("USB configured={}", configured);
        if configured {
            // Send the first report now instead of at the next period.
            TASK_SIGNAL.signal(TaskSignal::Wake);
        }
    }

    fn suspended(&mut self, suspended: bool) {
        USB_SUSPENDED.store(suspended, Ordering::Release);
        debug!("USB suspended={}", suspended);
    }
}

/// Routes HID class requests to the library handlers.
struct MouseRequestHandler;

impl RequestHandler for MouseRequestHandler {
    fn get_report(&mut self, id: ReportId, buf: &mut [u8]) -> Option<usize> {
        let (report_id, report_type) = split_report_id(id);
        let request = HidRequest::GetReport {
            report_id,
            report_type,
        };
        match hid::on_report_requested(config::CHANNEL, request, buf) {
            0 => None,
            n => Some(n),
        }
    }

    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        let (report_id, report_type) = split_report_id(id);
        let request = HidRequest::SetReport {
            report_id,
            report_type,
            data,
        };
        hid::on_report_requested(config::CHANNEL, request, &mut []);
        OutResponse::Accepted
    }
}

fn split_report_id(id: ReportId) -> (u8, ReportType) {
    match id {
        ReportId::In(n) => (n, ReportType::Input),
        ReportId::Out(n) => (n, ReportType::Output),
        ReportId::Feature(n) => (n, ReportType::Feature),
    }
}

fn text(strings: &StringTable<'static>, index: u8) -> Option<&'static str> {
    match strings.get(index) {
        Some(StringEntry::Text(s)) => Some(s),
        _ => None,
    }
}

/// Build result containing the USB device runner and the class handles.
pub struct CompositeDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub cdc: CdcAcmClass<'static, UsbDriver>,
    pub mouse: MouseWriter,
}

/// Initialise the USB stack and create the composite device.
///
/// Must be called exactly once.  All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD, descriptors: &DescriptorSet<'static>) -> CompositeDevice {
    // Create the low-level USB driver with hardware VBUS detection.
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    // Device-level identity comes from the descriptor model.
    let dev = &descriptors.device;
    let mut usb_config = Config::new(dev.id_vendor, dev.id_product);
    usb_config.device_class = dev.device_class;
    usb_config.device_sub_class = dev.device_sub_class;
    usb_config.device_protocol = dev.device_protocol;
    usb_config.composite_with_iads = dev.uses_iad();
    usb_config.device_release = dev.bcd_device;
    usb_config.max_packet_size_0 = dev.max_packet_size_0;
    usb_config.max_power = descriptors.configuration.attributes().max_power_ma;
    usb_config.manufacturer = text(&descriptors.strings, dev.i_manufacturer);
    usb_config.product = text(&descriptors.strings, dev.i_product);
    usb_config.serial_number = text(&descriptors.strings, dev.i_serial_number);

    // Allocate static descriptor buffers.
    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    builder.handler(USB_STATE_HANDLER.init(UsbStateHandler));

    // Interface order follows the configuration model: CDC first, then HID.
    let cdc_state = CDC_STATE.init(CdcState::new());
    let cdc = CdcAcmClass::new(&mut builder, cdc_state, config::CDC_EP_BUFSIZE);

    let mouse_state = MOUSE_STATE.init(State::new());
    let mouse_config = HidConfig {
        report_descriptor: MOUSE_REPORT_DESCRIPTOR,
        request_handler: Some(MOUSE_REQUESTS.init(MouseRequestHandler)),
        poll_ms: config::HID_POLL_MS,
        max_packet_size: config::HID_EP_BUFSIZE,
    };
    let mouse = HidWriter::new(&mut builder, mouse_state, mouse_config);

    let device = builder.build();

    info!(
        "USB device initialised, VID={=u16:04x} PID={=u16:04x}, {} config bytes",
        dev.id_vendor,
        dev.id_product,
        descriptors.configuration.total_length()
    );

    CompositeDevice { device, cdc, mouse }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
///
/// This handles USB enumeration, suspend/resume, and endpoint servicing.
/// It runs forever.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}
