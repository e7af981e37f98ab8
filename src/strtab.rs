//! String-table resolution.
//!
//! Section and symbol records do not carry names, only byte offsets
//! into a string-table section. The resolver validates the offset
//! against the table's declared extent and reads the NUL-terminated
//! string behind it. Offset 0 is the conventional "no name" slot and
//! resolves to the empty string.

use crate::error::{ElfError, Result};
use crate::reader::ByteReader;

/// The byte range of one string-table section.
#[derive(Debug, Clone, Copy)]
pub struct StringTable {
    offset: u64,
    size: u64,
}

impl StringTable {
    /// Validates the table's extent against the image up front, so a
    /// record declaring a bogus offset or size fails here instead of
    /// silently resolving every name to nothing.
    pub fn new(reader: &ByteReader<'_>, offset: u64, size: u64) -> Result<StringTable> {
        reader.bytes(offset, size)?;
        Ok(StringTable { offset, size })
    }

    /// Resolves a name offset into the string it points at.
    pub fn lookup(&self, reader: &ByteReader<'_>, name_offset: u32) -> Result<String> {
        let name_offset = u64::from(name_offset);
        if name_offset == 0 {
            return Ok(String::new());
        }
        if name_offset >= self.size {
            return Err(ElfError::BadStringOffset {
                offset: name_offset,
                size: self.size,
            });
        }
        // offset + size fits in the image (checked at construction), so
        // this sum cannot overflow or leave the buffer.
        Ok(reader.read_null_terminated_string(self.offset + name_offset, self.size - name_offset))
    }
}
