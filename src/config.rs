//! Application-wide constants and compile-time configuration.
//!
//! All USB identity values, endpoint assignments, buffer sizes, and
//! timing parameters live here so they can be tuned in one place.

use crate::descriptor::{build_product_id, FunctionSet};

// USB identity

/// USB vendor ID (TinyUSB test VID). Replace with your own allocation
/// for production.
pub const USB_VID: u16 = 0xCAFE;

/// USB specification release (2.00).
pub const USB_BCD: u16 = 0x0200;

/// Device release number (1.00).
pub const USB_DEVICE_BCD: u16 = 0x0100;

/// Function classes composed into this device.
pub const FUNCTIONS: FunctionSet = FunctionSet::CDC.with(FunctionSet::HID);

/// Product ID derived from [`FUNCTIONS`].
///
/// Hosts cache drivers by VID/PID, so this must change whenever the
/// function set does.
pub const USB_PID: u16 = build_product_id(FUNCTIONS);

/// Maximum packet size of the default control endpoint.
pub const EP0_SIZE: u8 = 64;

/// Bus power draw advertised in the configuration descriptor (mA).
pub const USB_MAX_POWER_MA: u16 = 100;

// String table
//
// Index 0 is the language ID pseudo-string; the entries below start
// at index 1 in this order.

pub const STRID_MANUFACTURER: u8 = 1;
pub const STRID_PRODUCT: u8 = 2;
pub const STRID_SERIAL: u8 = 3;
pub const STRID_CDC_INTERFACE: u8 = 4;
pub const STRID_HID_INTERFACE: u8 = 5;

pub const USB_MANUFACTURER: &str = "Finger563";
pub const USB_PRODUCT: &str = "Finger563 USB HID & CDC Device";
/// Serial number string. Should be derived from the chip ID.
pub const USB_SERIAL_NUMBER: &str = "123456";
pub const USB_CDC_INTERFACE: &str = "Finger563 USB CDC";
pub const USB_HID_INTERFACE: &str = "USB HID interface";

/// String table entries, in index order starting at 1.
pub const USB_STRINGS: [&str; 5] = [
    USB_MANUFACTURER,
    USB_PRODUCT,
    USB_SERIAL_NUMBER,
    USB_CDC_INTERFACE,
    USB_HID_INTERFACE,
];

// Interfaces and endpoints

pub const ITF_NUM_CDC: u8 = 0;
pub const ITF_NUM_CDC_DATA: u8 = 1;
pub const ITF_NUM_HID: u8 = 2;
pub const ITF_NUM_TOTAL: u8 = 3;

/// Endpoint numbers (the direction bit is applied per endpoint role).
pub const EPNUM_CDC_NOTIF: u8 = 1;
pub const EPNUM_CDC: u8 = 2;
pub const EPNUM_HID: u8 = 3;

/// CDC notification endpoint size.
pub const CDC_NOTIF_EP_SIZE: u16 = 8;

/// CDC bulk data endpoint size (full-speed maximum).
pub const CDC_EP_BUFSIZE: u16 = 64;

/// Capacity of one CDC receive window.
pub const CDC_RX_BUFSIZE: usize = 64;

/// HID interrupt IN endpoint size.
pub const HID_EP_BUFSIZE: u16 = 16;

/// HID polling interval (ms).
pub const HID_POLL_MS: u8 = 10;

/// Transmit queue depth for the CDC channel.
pub const CDC_TX_QUEUE_SIZE: usize = 256;

// Periodic task

/// Name reported by the heartbeat task.
pub const TASK_NAME: &str = "example task";

/// Heartbeat cadence (ms).
pub const TASK_PERIOD_MS: u64 = 1000;

/// Logical channel used for both the CDC port and the HID instance.
pub const CHANNEL: u8 = 0;
