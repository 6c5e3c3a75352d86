//! Unified error type for usb-hid-vcp.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

use core::fmt;

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Transport
    /// The bounded CDC read reported failure.
    TransportRead,

    // Descriptors
    /// The configuration descriptor does not fit the 16-bit
    /// `wTotalLength` field.
    DescriptorOverflow { total: usize },

    /// An endpoint number is used twice in the same direction.
    DuplicateEndpoint { address: u8 },

    /// Endpoint 0, a number above 15, or a direction bit that does not
    /// match the endpoint's role.
    InvalidEndpoint { address: u8 },

    /// More interfaces than `bNumInterfaces` can count.
    TooManyInterfaces,

    /// A string does not fit in a single string descriptor.
    StringTooLong { index: u8 },

    /// A string index is not present in the string table.
    UnknownString { index: u8 },

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TransportRead => f.write_str("read error"),
            Error::DescriptorOverflow { total } => {
                write!(f, "configuration descriptor too long ({total} bytes)")
            }
            Error::DuplicateEndpoint { address } => {
                write!(f, "endpoint {address:#04x} assigned twice")
            }
            Error::InvalidEndpoint { address } => write!(f, "invalid endpoint {address:#04x}"),
            Error::TooManyInterfaces => f.write_str("too many interfaces"),
            Error::StringTooLong { index } => write!(f, "string {index} too long"),
            Error::UnknownString { index } => write!(f, "unknown string index {index}"),
            Error::BufferOverflow => f.write_str("buffer too small"),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;
