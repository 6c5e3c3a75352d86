//! Descriptor model for the composite device.
//!
//! Builds the device, configuration, and string descriptor tables once at
//! startup. Everything here is immutable after construction and is handed
//! to the USB stack by reference.
//!
//! Product ID layout:
//! ```text
//! 0x4000 | VENDOR<<4 | MIDI<<3 | HID<<2 | MSC<<1 | CDC<<0
//! ```

pub mod configuration;
pub mod device;
pub mod strings;

pub use configuration::{
    build_configuration_descriptor, CdcBlock, ConfigAttributes, ConfigurationDescriptor,
    HidBlock, InterfaceBlock, CDC_BLOCK_LEN, CONFIG_HEADER_LEN, HID_BLOCK_LEN,
};
pub use device::{build_device_descriptor, DeviceDescriptor, DEVICE_DESCRIPTOR_LEN};
pub use strings::{build_string_table, StringEntry, StringTable, LANGID_EN_US};

use crate::config;
use crate::hid::mouse::MOUSE_REPORT_DESCRIPTOR;

// Descriptor type codes (USB 2.0 table 9-5, IAD ECN, HID 1.11).
pub const DESC_DEVICE: u8 = 0x01;
pub const DESC_CONFIGURATION: u8 = 0x02;
pub const DESC_STRING: u8 = 0x03;
pub const DESC_INTERFACE: u8 = 0x04;
pub const DESC_ENDPOINT: u8 = 0x05;
pub const DESC_INTERFACE_ASSOCIATION: u8 = 0x0B;
pub const DESC_HID: u8 = 0x21;
pub const DESC_HID_REPORT: u8 = 0x22;
pub const DESC_CS_INTERFACE: u8 = 0x24;

/// Fixed marker in the high nibble of every composite product ID.
pub const PID_MARKER: u16 = 0x4000;

/// Set of function classes composed into the device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FunctionSet(u8);

impl FunctionSet {
    pub const EMPTY: Self = Self(0);
    pub const CDC: Self = Self(1 << 0);
    pub const MSC: Self = Self(1 << 1);
    pub const HID: Self = Self(1 << 2);
    pub const MIDI: Self = Self(1 << 3);
    pub const VENDOR: Self = Self(1 << 4);

    const ALL_BITS: u8 = 0x1F;

    /// Build from raw presence bits; bits above `VENDOR` are dropped.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL_BITS)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Union of two sets.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Number of distinct function classes present.
    pub const fn class_count(self) -> u32 {
        self.0.count_ones()
    }

    /// Whether the device descriptor must select the IAD class triple.
    ///
    /// True for more than one class, and for CDC alone since its
    /// communication and data interfaces form one function.
    pub const fn needs_iad(self) -> bool {
        self.class_count() > 1 || self.contains(Self::CDC)
    }
}

/// Function classes present in `blocks`.
pub const fn functions_of(blocks: &[InterfaceBlock]) -> FunctionSet {
    let mut set = FunctionSet::EMPTY;
    let mut i = 0;
    while i < blocks.len() {
        set = set.with(blocks[i].function());
        i += 1;
    }
    set
}

/// Compute the product ID for a function set.
///
/// Pure and injective over the five presence bits.
pub const fn build_product_id(functions: FunctionSet) -> u16 {
    PID_MARKER | functions.bits() as u16
}

/// Endpoint direction bit.
pub const EP_DIR_IN: u8 = 0x80;

/// IN endpoint address for endpoint number `n`.
pub const fn ep_in(n: u8) -> u8 {
    EP_DIR_IN | n
}

/// OUT endpoint address for endpoint number `n`.
pub const fn ep_out(n: u8) -> u8 {
    n
}

/// Interface blocks of this device, in configuration order.
pub const fn composite_blocks() -> [InterfaceBlock; 2] {
    [
        InterfaceBlock::Cdc(CdcBlock {
            string_index: config::STRID_CDC_INTERFACE,
            notif_ep: ep_in(config::EPNUM_CDC_NOTIF),
            notif_size: config::CDC_NOTIF_EP_SIZE,
            data_out_ep: ep_out(config::EPNUM_CDC),
            data_in_ep: ep_in(config::EPNUM_CDC),
            data_size: config::CDC_EP_BUFSIZE,
        }),
        InterfaceBlock::Hid(HidBlock {
            string_index: config::STRID_HID_INTERFACE,
            boot_protocol: configuration::HID_PROTOCOL_NONE,
            report_descriptor_len: MOUSE_REPORT_DESCRIPTOR.len() as u16,
            ep_in: ep_in(config::EPNUM_HID),
            ep_size: config::HID_EP_BUFSIZE,
            poll_ms: config::HID_POLL_MS,
        }),
    ]
}

/// Interface blocks of this device, for descriptor sets that must
/// outlive bring-up.
pub static COMPOSITE_BLOCKS: [InterfaceBlock; 2] = composite_blocks();

/// Configuration attributes of this device.
pub const fn composite_attributes() -> ConfigAttributes {
    ConfigAttributes {
        value: 1,
        string_index: 0,
        attributes: 0x00,
        max_power_ma: config::USB_MAX_POWER_MA,
    }
}

/// The full descriptor set handed to the transport at bring-up.
pub struct DescriptorSet<'a> {
    pub device: DeviceDescriptor,
    pub configuration: ConfigurationDescriptor<'a>,
    pub strings: StringTable<'a>,
}

impl<'a> DescriptorSet<'a> {
    /// Assemble and validate the descriptor set.
    ///
    /// Product ID and class triple follow the functions in `blocks`. Fails
    /// when the configuration cannot be expressed, which aborts device
    /// bring-up.
    pub fn new(
        blocks: &'a [InterfaceBlock],
        strings: &'a [&'a str],
    ) -> crate::Result<Self> {
        let configuration = build_configuration_descriptor(composite_attributes(), blocks)?;
        let functions = functions_of(blocks);
        let device = build_device_descriptor(config::USB_VID, config::USB_BCD, functions);
        let strings = build_string_table(strings);
        Ok(Self {
            device,
            configuration,
            strings,
        })
    }
}
