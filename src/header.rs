//! Fixed-layout file header.
//!
//! Parsing the header is the first stage of every decode: it validates
//! the magic number, fixes the word size and byte order for the whole
//! image, and yields the offsets/counts that locate the section and
//! program header tables.

use serde::Serialize;

use crate::error::{ElfError, Result};
use crate::reader::{ByteReader, Class, Endianness};

const MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

// Field offsets within the identification block.
const EI_CLASS: u64 = 4;
const EI_DATA: u64 = 5;
const EI_VERSION: u64 = 6;
const EI_OSABI: u64 = 7;
const EI_ABIVERSION: u64 = 8;
// The ident block is 16 bytes; the machine-dependent part starts after it.
const EI_NIDENT: u64 = 16;

/// Decoded file header.
#[derive(Debug, Clone, Serialize)]
pub struct Header {
    pub class: Class,
    pub endianness: Endianness,
    pub ident_version: u8,
    pub os_abi: u8,
    pub abi_version: u8,
    pub file_type: u16,
    pub file_type_name: &'static str,
    pub machine: u16,
    pub machine_name: &'static str,
    pub version: u32,
    pub entry_point: u64,
    pub program_header_offset: u64,
    pub section_header_offset: u64,
    pub flags: u32,
    pub header_size: u16,
    pub program_header_entry_size: u16,
    pub program_header_count: u16,
    pub section_header_entry_size: u16,
    pub section_header_count: u16,
    pub section_name_table_index: u16,
}

impl Header {
    /// Parses the header and configures `reader` with the endianness
    /// declared by the identification bytes. Must run before any other
    /// component touches the reader.
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Header> {
        let magic = reader.bytes(0, 4)?;
        if magic != MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(magic);
            return Err(ElfError::BadMagic { found });
        }

        let class = Class::from_ident(reader.read_u8(EI_CLASS)?)?;
        let endianness = Endianness::from_ident(reader.read_u8(EI_DATA)?)?;
        reader.set_endianness(endianness);

        let ident_version = reader.read_u8(EI_VERSION)?;
        let os_abi = reader.read_u8(EI_OSABI)?;
        let abi_version = reader.read_u8(EI_ABIVERSION)?;

        let word = class.word_size() as u64;
        let mut offset = EI_NIDENT;

        let file_type = reader.read_u16(offset)?;
        offset += 2;
        let machine = reader.read_u16(offset)?;
        offset += 2;
        let version = reader.read_u32(offset)?;
        offset += 4;
        let entry_point = reader.read_word(offset, class)?;
        offset += word;
        let program_header_offset = reader.read_word(offset, class)?;
        offset += word;
        let section_header_offset = reader.read_word(offset, class)?;
        offset += word;
        let flags = reader.read_u32(offset)?;
        offset += 4;
        let header_size = reader.read_u16(offset)?;
        offset += 2;
        let program_header_entry_size = reader.read_u16(offset)?;
        offset += 2;
        let program_header_count = reader.read_u16(offset)?;
        offset += 2;
        let section_header_entry_size = reader.read_u16(offset)?;
        offset += 2;
        let section_header_count = reader.read_u16(offset)?;
        offset += 2;
        let section_name_table_index = reader.read_u16(offset)?;

        Ok(Header {
            class,
            endianness,
            ident_version,
            os_abi,
            abi_version,
            file_type,
            file_type_name: file_type_name(file_type),
            machine,
            machine_name: machine_name(machine),
            version,
            entry_point,
            program_header_offset,
            section_header_offset,
            flags,
            header_size,
            program_header_entry_size,
            program_header_count,
            section_header_entry_size,
            section_header_count,
            section_name_table_index,
        })
    }

    pub fn is_64bit(&self) -> bool {
        self.class == Class::Elf64
    }
}

/// Object file type labels, `readelf` style.
pub fn file_type_name(file_type: u16) -> &'static str {
    match file_type {
        0 => "NONE",
        1 => "REL (relocatable)",
        2 => "EXEC (executable)",
        3 => "DYN (shared object)",
        4 => "CORE",
        0xfe00..=0xfeff => "OS-specific",
        0xff00..=0xffff => "processor-specific",
        _ => "unknown",
    }
}

/// Machine architecture labels for the codes that show up in embedded
/// firmware and the common desktop targets.
pub fn machine_name(machine: u16) -> &'static str {
    match machine {
        0 => "none",
        2 => "SPARC",
        3 => "Intel 80386",
        4 => "Motorola 68000",
        8 => "MIPS",
        15 => "PA-RISC",
        20 => "PowerPC",
        21 => "PowerPC64",
        22 => "IBM S/390",
        40 => "ARM",
        42 => "SuperH",
        43 => "SPARC v9",
        50 => "Intel IA-64",
        62 => "AMD x86-64",
        83 => "Atmel AVR",
        88 => "Renesas M32R",
        94 => "Tensilica Xtensa",
        105 => "TI MSP430",
        164 => "Qualcomm Hexagon",
        183 => "AArch64",
        243 => "RISC-V",
        _ => "unknown",
    }
}
