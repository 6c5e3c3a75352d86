//! Relative mouse input report for the HID interface.
//!
//! Wire format, no report ID prefix:
//! ```text
//! [0] buttons   bit 0 left, 1 right, 2 middle, 3 back, 4 forward
//! [1] x         i8
//! [2] y         i8
//! [3] wheel     i8, vertical scroll
//! [4] pan       i8, horizontal scroll (AC Pan)
//! ```

pub const MOUSE_REPORT_SIZE: usize = 5;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseReport {
    pub buttons: u8,
    pub x: i8,
    pub y: i8,
    pub wheel: i8,
    pub pan: i8,
}

impl MouseReport {
    /// Write the wire format into `buf`.
    ///
    /// Returns [`MOUSE_REPORT_SIZE`], or 0 without touching `buf` when it
    /// is too short.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let Some(out) = buf.get_mut(..MOUSE_REPORT_SIZE) else {
            return 0;
        };
        out.copy_from_slice(&[
            self.buttons,
            self.x as u8,
            self.y as u8,
            self.wheel as u8,
            self.pan as u8,
        ]);
        MOUSE_REPORT_SIZE
    }

    /// No buttons held and no motion on any axis.
    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Report descriptor matching [`MouseReport`].
///
/// Its length is advertised in the HID class descriptor.
pub const MOUSE_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //  Usage (Pointer)
    0xA1, 0x00, //  Collection (Physical)
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x81, 0x02, //   Input (Data, Var, Abs)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x81, 0x01, //   Input (Const)
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x09, 0x38, //   Usage (Wheel)
    0x15, 0x81, //   Logical Minimum (-127)
    0x25, 0x7F, //   Logical Maximum (127)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x03, //   Report Count (3)
    0x81, 0x06, //   Input (Data, Var, Rel)
    0x05, 0x0C, //   Usage Page (Consumer)
    0x0A, 0x38, 0x02, // Usage (AC Pan)
    0x15, 0x81, //   Logical Minimum (-127)
    0x25, 0x7F, //   Logical Maximum (127)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x06, //   Input (Data, Var, Rel)
    0xC0, //        End Collection
    0xC0, //       End Collection
];
