//! String descriptor table.
//!
//! Index 0 is the supported-language pseudo-string; text entries are
//! addressed by 1-based index in the order they were supplied.
//!
//! [`StringTable::write_descriptor`] is the reference encoding. On target
//! `embassy-usb` encodes and serves the strings itself.

use super::DESC_STRING;
use crate::{Error, Result};

/// English (United States).
pub const LANGID_EN_US: u16 = 0x0409;

/// Longest string a descriptor can carry, in UTF-16 code units.
const MAX_UTF16_UNITS: usize = (u8::MAX as usize - 2) / 2;

/// One resolved entry of the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringEntry<'a> {
    /// Index 0: list of supported language IDs.
    LanguageIds(&'a [u16]),
    Text(&'a str),
}

#[derive(Clone, Copy, Debug)]
pub struct StringTable<'a> {
    entries: &'a [&'a str],
}

/// Build a string table over `entries`.
pub const fn build_string_table<'a>(entries: &'a [&'a str]) -> StringTable<'a> {
    StringTable { entries }
}

impl<'a> StringTable<'a> {
    const LANGUAGES: &'static [u16] = &[LANGID_EN_US];

    /// Number of slots, counting the language slot.
    pub const fn len(&self) -> usize {
        self.entries.len() + 1
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    pub const fn contains(&self, index: u8) -> bool {
        (index as usize) < self.len()
    }

    pub fn get(&self, index: u8) -> Option<StringEntry<'a>> {
        match index {
            0 => Some(StringEntry::LanguageIds(Self::LANGUAGES)),
            i => self
                .entries
                .get(i as usize - 1)
                .copied()
                .map(StringEntry::Text),
        }
    }

    /// Encode the string descriptor for `index` into `buf` (UTF-16LE).
    ///
    /// Returns the number of bytes written.
    pub fn write_descriptor(&self, index: u8, buf: &mut [u8]) -> Result<usize> {
        let entry = self.get(index).ok_or(Error::UnknownString { index })?;

        let units = match entry {
            StringEntry::LanguageIds(ids) => ids.len(),
            StringEntry::Text(s) => s.encode_utf16().count(),
        };
        if units > MAX_UTF16_UNITS {
            return Err(Error::StringTooLong { index });
        }
        let len = 2 + units * 2;
        if buf.len() < len {
            return Err(Error::BufferOverflow);
        }

        buf[0] = len as u8;
        buf[1] = DESC_STRING;
        let mut pos = 2;
        let mut put = |unit: u16| {
            buf[pos..pos + 2].copy_from_slice(&unit.to_le_bytes());
            pos += 2;
        };
        match entry {
            StringEntry::LanguageIds(ids) => ids.iter().copied().for_each(&mut put),
            StringEntry::Text(s) => s.encode_utf16().for_each(&mut put),
        }
        Ok(len)
    }
}
