//! Endian-aware, bounds-checked access to the raw image.
//!
//! Every other parser goes through [`ByteReader`]. The reader owns no
//! state besides the borrowed byte slice and the endianness, which the
//! header parser fixes from the identification bytes before any
//! multi-byte field is read anywhere else.

use serde::Serialize;

use crate::error::{ElfError, Result};

/// Byte order of multi-byte fields, fixed per image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Decodes the `EI_DATA` identification byte.
    pub fn from_ident(value: u8) -> Result<Endianness> {
        match value {
            1 => Ok(Endianness::Little),
            2 => Ok(Endianness::Big),
            other => Err(ElfError::Unsupported {
                what: "data encoding",
                value: u64::from(other),
            }),
        }
    }
}

/// Word size of the image, fixed per image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Class {
    Elf32,
    Elf64,
}

impl Class {
    /// Decodes the `EI_CLASS` identification byte.
    pub fn from_ident(value: u8) -> Result<Class> {
        match value {
            1 => Ok(Class::Elf32),
            2 => Ok(Class::Elf64),
            other => Err(ElfError::Unsupported {
                what: "file class",
                value: u64::from(other),
            }),
        }
    }

    /// Size in bytes of a natural word under this class.
    pub fn word_size(self) -> usize {
        match self {
            Class::Elf32 => 4,
            Class::Elf64 => 8,
        }
    }
}

/// Read-only accessor over one ELF image.
///
/// Multi-byte reads require the endianness to have been set; calling
/// them earlier is a bug in the decoder, not a property of the input,
/// and panics with an explanatory message.
pub struct ByteReader<'data> {
    data: &'data [u8],
    endian: Option<Endianness>,
}

impl<'data> ByteReader<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        Self { data, endian: None }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fixes the byte order for all subsequent multi-byte reads.
    pub fn set_endianness(&mut self, endian: Endianness) {
        self.endian = Some(endian);
    }

    pub fn endianness(&self) -> Option<Endianness> {
        self.endian
    }

    /// Bounds-checked slice of `width` bytes at `offset`.
    fn take(&self, offset: u64, width: usize) -> Result<&'data [u8]> {
        let end = offset.checked_add(width as u64);
        match end {
            Some(end) if end <= self.data.len() as u64 => {
                let start = offset as usize;
                Ok(&self.data[start..start + width])
            }
            _ => Err(ElfError::OutOfBounds {
                offset,
                width,
                len: self.data.len(),
            }),
        }
    }

    pub fn read_u8(&self, offset: u64) -> Result<u8> {
        Ok(self.take(offset, 1)?[0])
    }

    pub fn read_u16(&self, offset: u64) -> Result<u16> {
        let bytes: [u8; 2] = self.take(offset, 2)?.try_into().expect("width checked");
        Ok(match self.require_endian() {
            Endianness::Little => u16::from_le_bytes(bytes),
            Endianness::Big => u16::from_be_bytes(bytes),
        })
    }

    pub fn read_u32(&self, offset: u64) -> Result<u32> {
        let bytes: [u8; 4] = self.take(offset, 4)?.try_into().expect("width checked");
        Ok(match self.require_endian() {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        })
    }

    pub fn read_u64(&self, offset: u64) -> Result<u64> {
        let bytes: [u8; 8] = self.take(offset, 8)?.try_into().expect("width checked");
        Ok(match self.require_endian() {
            Endianness::Little => u64::from_le_bytes(bytes),
            Endianness::Big => u64::from_be_bytes(bytes),
        })
    }

    /// Reads one natural word (4 or 8 bytes) widened to `u64`.
    pub fn read_word(&self, offset: u64, class: Class) -> Result<u64> {
        match class {
            Class::Elf32 => Ok(u64::from(self.read_u32(offset)?)),
            Class::Elf64 => self.read_u64(offset),
        }
    }

    /// Bounds-checked view of a byte range.
    pub fn bytes(&self, offset: u64, len: u64) -> Result<&'data [u8]> {
        let width = usize::try_from(len).map_err(|_| ElfError::OutOfBounds {
            offset,
            width: usize::MAX,
            len: self.data.len(),
        })?;
        self.take(offset, width)
    }

    /// Scans forward from `offset` until a NUL byte, `max_len` bytes, or
    /// the end of the buffer, whichever comes first, and returns the
    /// characters before the terminator.
    pub fn read_null_terminated_string(&self, offset: u64, max_len: u64) -> String {
        let start = match usize::try_from(offset) {
            Ok(s) if s < self.data.len() => s,
            _ => return String::new(),
        };
        let limit = (self.data.len() - start).min(usize::try_from(max_len).unwrap_or(usize::MAX));
        let window = &self.data[start..start + limit];
        let terminated = match window.iter().position(|&b| b == 0) {
            Some(nul) => &window[..nul],
            None => window,
        };
        String::from_utf8_lossy(terminated).into_owned()
    }

    fn require_endian(&self) -> Endianness {
        self.endian
            .expect("endianness not fixed before a multi-byte read")
    }
}
