//! Configuration descriptor: header followed by one block per function.
//!
//! Block layouts (bytes):
//! ```text
//! header  9   configuration
//! CDC    66   IAD(8) + comm itf(9) + header(5) + call mgmt(5) + ACM(4)
//!             + union(5) + notif EP(7) + data itf(9) + OUT EP(7) + IN EP(7)
//! HID    25   itf(9) + HID class(9) + IN EP(7)
//! ```
//! `wTotalLength` is the exact sum of the header and every block, since
//! the host parses the descriptor by that length.
//!
//! [`ConfigurationDescriptor::write`] produces the reference layout with
//! the endpoint numbers given here. On target, `embassy-usb` serves its
//! own configuration bytes and allocates endpoints itself, so these bytes
//! are not what the firmware sends to the host.

use super::{
    FunctionSet, DESC_CONFIGURATION, DESC_CS_INTERFACE, DESC_ENDPOINT, DESC_HID,
    DESC_HID_REPORT, DESC_INTERFACE, DESC_INTERFACE_ASSOCIATION, EP_DIR_IN,
};
use crate::{Error, Result};

pub const CONFIG_HEADER_LEN: usize = 9;
pub const CDC_BLOCK_LEN: usize = 66;
pub const HID_BLOCK_LEN: usize = 25;

// Class codes
const CLASS_CDC: u8 = 0x02;
const CDC_SUBCLASS_ACM: u8 = 0x02;
const CDC_PROTOCOL_NONE: u8 = 0x00;
const CLASS_CDC_DATA: u8 = 0x0A;
const CLASS_HID: u8 = 0x03;
const HID_SUBCLASS_BOOT: u8 = 0x01;

/// HID interface protocol: no boot protocol.
pub const HID_PROTOCOL_NONE: u8 = 0x00;
/// HID interface protocol: boot mouse.
pub const HID_PROTOCOL_MOUSE: u8 = 0x02;

// CDC functional descriptor subtypes
const CDC_FUNC_HEADER: u8 = 0x00;
const CDC_FUNC_CALL_MANAGEMENT: u8 = 0x01;
const CDC_FUNC_ACM: u8 = 0x02;
const CDC_FUNC_UNION: u8 = 0x06;

// Endpoint transfer types
const EP_BULK: u8 = 0x02;
const EP_INTERRUPT: u8 = 0x03;

/// Polling interval of the CDC notification endpoint (ms).
const CDC_NOTIF_INTERVAL: u8 = 16;

/// Bit 7 of `bmAttributes` is reserved and must be set.
const ATTR_RESERVED: u8 = 0x80;

/// Header fields of the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigAttributes {
    pub value: u8,
    pub string_index: u8,
    /// Extra `bmAttributes` bits (self-powered 0x40, remote wakeup 0x20).
    pub attributes: u8,
    pub max_power_ma: u16,
}

/// CDC-ACM function: notification endpoint plus bulk data pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CdcBlock {
    pub string_index: u8,
    pub notif_ep: u8,
    pub notif_size: u16,
    pub data_out_ep: u8,
    pub data_in_ep: u8,
    pub data_size: u16,
}

/// HID function with a single interrupt IN endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HidBlock {
    pub string_index: u8,
    pub boot_protocol: u8,
    pub report_descriptor_len: u16,
    pub ep_in: u8,
    pub ep_size: u16,
    pub poll_ms: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterfaceBlock {
    Cdc(CdcBlock),
    Hid(HidBlock),
}

impl InterfaceBlock {
    /// Bytes this block contributes to `wTotalLength`.
    pub const fn descriptor_len(&self) -> usize {
        match self {
            InterfaceBlock::Cdc(_) => CDC_BLOCK_LEN,
            InterfaceBlock::Hid(_) => HID_BLOCK_LEN,
        }
    }

    /// Interfaces this block occupies.
    pub const fn interface_count(&self) -> u8 {
        match self {
            InterfaceBlock::Cdc(_) => 2,
            InterfaceBlock::Hid(_) => 1,
        }
    }

    /// Function class this block implements.
    pub const fn function(&self) -> FunctionSet {
        match self {
            InterfaceBlock::Cdc(_) => FunctionSet::CDC,
            InterfaceBlock::Hid(_) => FunctionSet::HID,
        }
    }

    pub const fn string_index(&self) -> u8 {
        match self {
            InterfaceBlock::Cdc(c) => c.string_index,
            InterfaceBlock::Hid(h) => h.string_index,
        }
    }

    /// Endpoint addresses with the direction each role requires.
    fn endpoints(&self) -> impl Iterator<Item = (u8, bool)> {
        let eps: [Option<(u8, bool)>; 3] = match self {
            InterfaceBlock::Cdc(c) => [
                Some((c.notif_ep, true)),
                Some((c.data_out_ep, false)),
                Some((c.data_in_ep, true)),
            ],
            InterfaceBlock::Hid(h) => [Some((h.ep_in, true)), None, None],
        };
        eps.into_iter().flatten()
    }
}

/// Validated configuration descriptor.
#[derive(Clone, Copy, Debug)]
pub struct ConfigurationDescriptor<'a> {
    attributes: ConfigAttributes,
    blocks: &'a [InterfaceBlock],
    total_length: u16,
    num_interfaces: u8,
}

/// Lay out `blocks` in order behind a configuration header.
///
/// Interface numbers are assigned sequentially from 0. Fails with
/// [`Error::DescriptorOverflow`] when the total does not fit 16 bits,
/// and rejects endpoint plans that reuse a number in one direction.
pub fn build_configuration_descriptor(
    attributes: ConfigAttributes,
    blocks: &[InterfaceBlock],
) -> Result<ConfigurationDescriptor<'_>> {
    let blocks_len: usize = blocks.iter().map(InterfaceBlock::descriptor_len).sum();
    let total = CONFIG_HEADER_LEN + blocks_len;
    let total_length = u16::try_from(total).map_err(|_| Error::DescriptorOverflow { total })?;

    let interfaces: usize = blocks.iter().map(|b| b.interface_count() as usize).sum();
    let num_interfaces = u8::try_from(interfaces).map_err(|_| Error::TooManyInterfaces)?;

    // One bit per endpoint number, per direction.
    let mut used_in: u16 = 0;
    let mut used_out: u16 = 0;
    for (address, wants_in) in blocks.iter().flat_map(InterfaceBlock::endpoints) {
        let number = address & 0x0F;
        let is_in = address & EP_DIR_IN != 0;
        if number == 0 || address & 0x70 != 0 || is_in != wants_in {
            return Err(Error::InvalidEndpoint { address });
        }
        let used = if is_in { &mut used_in } else { &mut used_out };
        if *used & (1 << number) != 0 {
            return Err(Error::DuplicateEndpoint { address });
        }
        *used |= 1 << number;
    }

    Ok(ConfigurationDescriptor {
        attributes,
        blocks,
        total_length,
        num_interfaces,
    })
}

impl<'a> ConfigurationDescriptor<'a> {
    pub const fn total_length(&self) -> u16 {
        self.total_length
    }

    pub const fn num_interfaces(&self) -> u8 {
        self.num_interfaces
    }

    pub const fn attributes(&self) -> ConfigAttributes {
        self.attributes
    }

    pub const fn blocks(&self) -> &'a [InterfaceBlock] {
        self.blocks
    }

    /// Serialise the whole configuration into `buf`.
    ///
    /// Returns the number of bytes written, always `total_length()`.
    pub fn write(&self, buf: &mut [u8]) -> Result<usize> {
        let total = self.total_length as usize;
        if buf.len() < total {
            return Err(Error::BufferOverflow);
        }

        let mut w = Writer { buf, pos: 0 };
        let len = self.total_length.to_le_bytes();
        w.put(&[
            CONFIG_HEADER_LEN as u8,
            DESC_CONFIGURATION,
            len[0],
            len[1],
            self.num_interfaces,
            self.attributes.value,
            self.attributes.string_index,
            ATTR_RESERVED | self.attributes.attributes,
            (self.attributes.max_power_ma / 2).min(u8::MAX as u16) as u8,
        ]);

        let mut itf = 0u8;
        for block in self.blocks {
            match block {
                InterfaceBlock::Cdc(c) => write_cdc(&mut w, itf, c),
                InterfaceBlock::Hid(h) => write_hid(&mut w, itf, h),
            }
            itf += block.interface_count();
        }

        debug_assert_eq!(w.pos, total);
        Ok(w.pos)
    }
}

struct Writer<'b> {
    buf: &'b mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn endpoint(&mut self, address: u8, kind: u8, size: u16, interval: u8) {
        let size = size.to_le_bytes();
        self.put(&[7, DESC_ENDPOINT, address, kind, size[0], size[1], interval]);
    }
}

fn write_cdc(w: &mut Writer<'_>, itf: u8, c: &CdcBlock) {
    let data_itf = itf + 1;
    // Interface association
    w.put(&[
        8,
        DESC_INTERFACE_ASSOCIATION,
        itf,
        2,
        CLASS_CDC,
        CDC_SUBCLASS_ACM,
        CDC_PROTOCOL_NONE,
        0,
    ]);
    // Communication interface
    w.put(&[
        9,
        DESC_INTERFACE,
        itf,
        0,
        1,
        CLASS_CDC,
        CDC_SUBCLASS_ACM,
        CDC_PROTOCOL_NONE,
        c.string_index,
    ]);
    // CDC 1.20 header, call management, ACM (line coding + line state), union
    w.put(&[5, DESC_CS_INTERFACE, CDC_FUNC_HEADER, 0x20, 0x01]);
    w.put(&[5, DESC_CS_INTERFACE, CDC_FUNC_CALL_MANAGEMENT, 0x00, data_itf]);
    w.put(&[4, DESC_CS_INTERFACE, CDC_FUNC_ACM, 0x02]);
    w.put(&[5, DESC_CS_INTERFACE, CDC_FUNC_UNION, itf, data_itf]);
    w.endpoint(c.notif_ep, EP_INTERRUPT, c.notif_size, CDC_NOTIF_INTERVAL);
    // Data interface
    w.put(&[9, DESC_INTERFACE, data_itf, 0, 2, CLASS_CDC_DATA, 0, 0, 0]);
    w.endpoint(c.data_out_ep, EP_BULK, c.data_size, 0);
    w.endpoint(c.data_in_ep, EP_BULK, c.data_size, 0);
}

fn write_hid(w: &mut Writer<'_>, itf: u8, h: &HidBlock) {
    let sub_class = if h.boot_protocol != HID_PROTOCOL_NONE {
        HID_SUBCLASS_BOOT
    } else {
        0
    };
    w.put(&[
        9,
        DESC_INTERFACE,
        itf,
        0,
        1,
        CLASS_HID,
        sub_class,
        h.boot_protocol,
        h.string_index,
    ]);
    let report_len = h.report_descriptor_len.to_le_bytes();
    // HID 1.11, no country code, one report descriptor
    w.put(&[
        9,
        DESC_HID,
        0x11,
        0x01,
        0,
        1,
        DESC_HID_REPORT,
        report_len[0],
        report_len[1],
    ]);
    w.endpoint(h.ep_in, EP_INTERRUPT, h.ep_size, h.poll_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{composite_attributes, composite_blocks, ep_in, ep_out};

    fn cdc(notif: u8, data: u8) -> InterfaceBlock {
        InterfaceBlock::Cdc(CdcBlock {
            string_index: 4,
            notif_ep: ep_in(notif),
            notif_size: 8,
            data_out_ep: ep_out(data),
            data_in_ep: ep_in(data),
            data_size: 64,
        })
    }

    fn hid(ep: u8) -> InterfaceBlock {
        InterfaceBlock::Hid(HidBlock {
            string_index: 5,
            boot_protocol: HID_PROTOCOL_NONE,
            report_descriptor_len: 50,
            ep_in: ep_in(ep),
            ep_size: 16,
            poll_ms: 10,
        })
    }

    #[test]
    fn total_length_is_sum_of_blocks() {
        let blocks = [cdc(1, 2), hid(3)];
        let desc = build_configuration_descriptor(composite_attributes(), &blocks).unwrap();
        assert_eq!(desc.total_length(), 100);
        assert_eq!(desc.num_interfaces(), 3);

        let mut buf = [0u8; 128];
        let n = desc.write(&mut buf).unwrap();
        assert_eq!(n, 100);
        assert_eq!(u16::from_le_bytes([buf[2], buf[3]]), 100);
    }

    #[test]
    fn header_only_configuration() {
        let desc = build_configuration_descriptor(composite_attributes(), &[]).unwrap();
        assert_eq!(desc.total_length() as usize, CONFIG_HEADER_LEN);
        assert_eq!(desc.num_interfaces(), 0);
    }

    #[test]
    fn header_bytes() {
        let blocks = composite_blocks();
        let desc = build_configuration_descriptor(composite_attributes(), &blocks).unwrap();
        let mut buf = [0u8; 128];
        desc.write(&mut buf).unwrap();
        // 100 mA is encoded in 2 mA units.
        assert_eq!(&buf[..9], &[9, 0x02, 100, 0, 3, 1, 0, 0x80, 50]);
    }

    #[test]
    fn cdc_block_layout() {
        let blocks = [cdc(1, 2)];
        let desc = build_configuration_descriptor(composite_attributes(), &blocks).unwrap();
        let mut buf = [0u8; 80];
        let n = desc.write(&mut buf).unwrap();
        let cdc = &buf[9..n];
        assert_eq!(cdc.len(), CDC_BLOCK_LEN);
        // IAD groups interfaces 0 and 1 as CDC-ACM.
        assert_eq!(&cdc[..8], &[8, 0x0B, 0, 2, 0x02, 0x02, 0x00, 0]);
        // Communication interface: ACM subclass, one endpoint, string 4.
        assert_eq!(&cdc[8..17], &[9, 0x04, 0, 0, 1, 0x02, 0x02, 0x00, 4]);
        // Header (CDC 1.20), call management (data itf 1), ACM caps 0x02.
        assert_eq!(&cdc[17..22], &[5, 0x24, 0x00, 0x20, 0x01]);
        assert_eq!(&cdc[22..27], &[5, 0x24, 0x01, 0x00, 1]);
        assert_eq!(&cdc[27..31], &[4, 0x24, 0x02, 0x02]);
        // Union: control 0, data 1.
        assert_eq!(&cdc[31..36], &[5, 0x24, 0x06, 0, 1]);
        // Notification endpoint.
        assert_eq!(&cdc[36..43], &[7, 0x05, 0x81, 0x03, 8, 0, 16]);
        // Data interface and bulk pair.
        assert_eq!(&cdc[43..52], &[9, 0x04, 1, 0, 2, 0x0A, 0, 0, 0]);
        assert_eq!(&cdc[52..59], &[7, 0x05, 0x02, 0x02, 64, 0, 0]);
        assert_eq!(&cdc[59..66], &[7, 0x05, 0x82, 0x02, 64, 0, 0]);
    }

    #[test]
    fn block_functions() {
        assert_eq!(cdc(1, 2).function(), FunctionSet::CDC);
        assert_eq!(hid(3).function(), FunctionSet::HID);
    }

    #[test]
    fn hid_block_layout() {
        let blocks = [cdc(1, 2), hid(3)];
        let desc = build_configuration_descriptor(composite_attributes(), &blocks).unwrap();
        let mut buf = [0u8; 128];
        let n = desc.write(&mut buf).unwrap();
        let hid = &buf[n - HID_BLOCK_LEN..n];
        assert_eq!(&hid[..9], &[9, 0x04, 2, 0, 1, 0x03, 0, 0, 5]);
        assert_eq!(&hid[9..18], &[9, 0x21, 0x11, 0x01, 0, 1, 0x22, 50, 0]);
        assert_eq!(&hid[18..], &[7, 0x05, 0x83, 0x03, 16, 0, 10]);
    }

    #[test]
    fn boot_protocol_selects_boot_subclass() {
        let blocks = [InterfaceBlock::Hid(HidBlock {
            string_index: 0,
            boot_protocol: HID_PROTOCOL_MOUSE,
            report_descriptor_len: 50,
            ep_in: ep_in(1),
            ep_size: 8,
            poll_ms: 1,
        })];
        let desc = build_configuration_descriptor(composite_attributes(), &blocks).unwrap();
        let mut buf = [0u8; 64];
        desc.write(&mut buf).unwrap();
        assert_eq!(buf[9 + 6], HID_SUBCLASS_BOOT);
        assert_eq!(buf[9 + 7], HID_PROTOCOL_MOUSE);
    }

    #[test]
    fn overflow_when_total_exceeds_u16() {
        // 9 + 992 * 66 = 65481 fits; one more block does not.
        let fits = [cdc(1, 2); 992];
        let err = build_configuration_descriptor(composite_attributes(), &fits).unwrap_err();
        // Fits the length field, but not the interface count.
        assert_eq!(err, Error::TooManyInterfaces);

        let too_long = [cdc(1, 2); 993];
        let err = build_configuration_descriptor(composite_attributes(), &too_long).unwrap_err();
        assert_eq!(err, Error::DescriptorOverflow { total: 9 + 993 * 66 });
    }

    #[test]
    fn length_at_limit_passes_length_check() {
        let n = (u16::MAX as usize - CONFIG_HEADER_LEN) / HID_BLOCK_LEN;
        let blocks = [hid(1); 2621];
        assert_eq!(n, 2621);
        let err = build_configuration_descriptor(composite_attributes(), &blocks).unwrap_err();
        assert_eq!(err, Error::TooManyInterfaces);
    }

    #[test]
    fn duplicate_endpoint_in_same_direction_is_rejected() {
        let blocks = [cdc(1, 2), hid(2)];
        let err = build_configuration_descriptor(composite_attributes(), &blocks).unwrap_err();
        assert_eq!(err, Error::DuplicateEndpoint { address: 0x82 });
    }

    #[test]
    fn same_number_in_opposite_directions_is_allowed() {
        // CDC uses 0x02 OUT and 0x82 IN; that pair is legal.
        let blocks = [cdc(1, 2)];
        assert!(build_configuration_descriptor(composite_attributes(), &blocks).is_ok());
    }

    #[test]
    fn endpoint_zero_is_rejected() {
        let blocks = [hid(0)];
        let err = build_configuration_descriptor(composite_attributes(), &blocks).unwrap_err();
        assert_eq!(err, Error::InvalidEndpoint { address: 0x80 });
    }

    #[test]
    fn wrong_direction_is_rejected() {
        let blocks = [InterfaceBlock::Hid(HidBlock {
            string_index: 0,
            boot_protocol: HID_PROTOCOL_NONE,
            report_descriptor_len: 50,
            ep_in: ep_out(3),
            ep_size: 16,
            poll_ms: 10,
        })];
        let err = build_configuration_descriptor(composite_attributes(), &blocks).unwrap_err();
        assert_eq!(err, Error::InvalidEndpoint { address: 0x03 });
    }

    #[test]
    fn short_buffer_is_rejected() {
        let blocks = composite_blocks();
        let desc = build_configuration_descriptor(composite_attributes(), &blocks).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(desc.write(&mut buf), Err(Error::BufferOverflow));
    }
}
