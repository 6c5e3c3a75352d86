//! Standard device descriptor (USB 2.0 §9.6.1).

use super::{FunctionSet, DESC_DEVICE};
use crate::config;

/// Device descriptor size in bytes.
pub const DEVICE_DESCRIPTOR_LEN: usize = 18;

/// Miscellaneous device class with the common-class / IAD sub-triple.
const CLASS_MISC: u8 = 0xEF;
const MISC_SUBCLASS_COMMON: u8 = 0x02;
const MISC_PROTOCOL_IAD: u8 = 0x01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceDescriptor {
    pub bcd_usb: u16,
    pub device_class: u8,
    pub device_sub_class: u8,
    pub device_protocol: u8,
    pub max_packet_size_0: u8,
    pub id_vendor: u16,
    pub id_product: u16,
    pub bcd_device: u16,
    pub i_manufacturer: u8,
    pub i_product: u8,
    pub i_serial_number: u8,
    pub num_configurations: u8,
}

/// Build the device descriptor for a function set.
///
/// Deterministic: the same inputs always give the same descriptor.
pub const fn build_device_descriptor(
    vendor_id: u16,
    bcd_usb: u16,
    functions: FunctionSet,
) -> DeviceDescriptor {
    let (class, sub_class, protocol) = if functions.needs_iad() {
        (CLASS_MISC, MISC_SUBCLASS_COMMON, MISC_PROTOCOL_IAD)
    } else {
        // Class is defined per interface.
        (0x00, 0x00, 0x00)
    };

    DeviceDescriptor {
        bcd_usb,
        device_class: class,
        device_sub_class: sub_class,
        device_protocol: protocol,
        max_packet_size_0: config::EP0_SIZE,
        id_vendor: vendor_id,
        id_product: super::build_product_id(functions),
        bcd_device: config::USB_DEVICE_BCD,
        i_manufacturer: config::STRID_MANUFACTURER,
        i_product: config::STRID_PRODUCT,
        i_serial_number: config::STRID_SERIAL,
        num_configurations: 1,
    }
}

impl DeviceDescriptor {
    /// True when the class triple announces interface associations.
    pub const fn uses_iad(&self) -> bool {
        self.device_class == CLASS_MISC
            && self.device_sub_class == MISC_SUBCLASS_COMMON
            && self.device_protocol == MISC_PROTOCOL_IAD
    }

    /// Serialise to the 18-byte wire layout (little-endian fields).
    pub const fn to_bytes(&self) -> [u8; DEVICE_DESCRIPTOR_LEN] {
        let usb = self.bcd_usb.to_le_bytes();
        let vid = self.id_vendor.to_le_bytes();
        let pid = self.id_product.to_le_bytes();
        let dev = self.bcd_device.to_le_bytes();
        [
            DEVICE_DESCRIPTOR_LEN as u8,
            DESC_DEVICE,
            usb[0],
            usb[1],
            self.device_class,
            self.device_sub_class,
            self.device_protocol,
            self.max_packet_size_0,
            vid[0],
            vid[1],
            pid[0],
            pid[1],
            dev[0],
            dev[1],
            self.i_manufacturer,
            self.i_product,
            self.i_serial_number,
            self.num_configurations,
        ]
    }
}
