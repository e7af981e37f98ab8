//! Section header table.
//!
//! Sections are identified by their position in the table, so the
//! decoder materializes the full table in order before anything else
//! references it. Name resolution is a second pass: the section-name
//! string table is itself one of the entries being parsed, so names can
//! only be looked up once every raw record exists.

use bitflags::bitflags;
use serde::Serialize;

use crate::error::{ElfError, Result};
use crate::header::Header;
use crate::reader::ByteReader;
use crate::strtab::StringTable;

/// Section type codes. Codes without a well-known meaning are retained
/// as `Other` so downstream consumers can still inspect them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionKind {
    Null,
    ProgBits,
    SymTab,
    StrTab,
    Rela,
    Hash,
    Dynamic,
    Note,
    NoBits,
    Rel,
    ShLib,
    DynSym,
    InitArray,
    FiniArray,
    PreinitArray,
    Group,
    SymTabShndx,
    Relr,
    GnuAttributes,
    GnuHash,
    GnuVerDef,
    GnuVerNeed,
    GnuVerSym,
    ArmExidx,
    ArmAttributes,
    Other(u32),
}

impl SectionKind {
    pub fn from_code(code: u32) -> SectionKind {
        match code {
            0 => SectionKind::Null,
            1 => SectionKind::ProgBits,
            2 => SectionKind::SymTab,
            3 => SectionKind::StrTab,
            4 => SectionKind::Rela,
            5 => SectionKind::Hash,
            6 => SectionKind::Dynamic,
            7 => SectionKind::Note,
            8 => SectionKind::NoBits,
            9 => SectionKind::Rel,
            10 => SectionKind::ShLib,
            11 => SectionKind::DynSym,
            14 => SectionKind::InitArray,
            15 => SectionKind::FiniArray,
            16 => SectionKind::PreinitArray,
            17 => SectionKind::Group,
            18 => SectionKind::SymTabShndx,
            19 => SectionKind::Relr,
            0x6fff_fff5 => SectionKind::GnuAttributes,
            0x6fff_fff6 => SectionKind::GnuHash,
            0x6fff_fffd => SectionKind::GnuVerDef,
            0x6fff_fffe => SectionKind::GnuVerNeed,
            0x6fff_ffff => SectionKind::GnuVerSym,
            0x7000_0001 => SectionKind::ArmExidx,
            0x7000_0003 => SectionKind::ArmAttributes,
            other => SectionKind::Other(other),
        }
    }
}

bitflags! {
    /// Section attribute flags (`sh_flags`). Unknown bits are retained.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct SectionFlags: u64 {
        const WRITE = 0x1;
        const ALLOC = 0x2;
        const EXECINSTR = 0x4;
        const MERGE = 0x10;
        const STRINGS = 0x20;
        const INFO_LINK = 0x40;
        const LINK_ORDER = 0x80;
        const OS_NONCONFORMING = 0x100;
        const GROUP = 0x200;
        const TLS = 0x400;
        const ORDERED = 0x4000_0000;
        const EXCLUDE = 0x8000_0000;
        const _ = !0;
    }
}

/// One decoded section header, position in the table == identity.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub index: usize,
    pub name_offset: u32,
    pub name: String,
    pub kind: SectionKind,
    pub flags: SectionFlags,
    pub address: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub alignment: u64,
    pub entry_size: u64,
}

impl Section {
    fn parse(reader: &ByteReader<'_>, header: &Header, index: usize, at: u64) -> Result<Section> {
        let class = header.class;
        let word = class.word_size() as u64;
        let mut offset = at;

        let name_offset = reader.read_u32(offset)?;
        offset += 4;
        let type_code = reader.read_u32(offset)?;
        offset += 4;
        let flags = reader.read_word(offset, class)?;
        offset += word;
        let address = reader.read_word(offset, class)?;
        offset += word;
        let file_offset = reader.read_word(offset, class)?;
        offset += word;
        let size = reader.read_word(offset, class)?;
        offset += word;
        let link = reader.read_u32(offset)?;
        offset += 4;
        let info = reader.read_u32(offset)?;
        offset += 4;
        let alignment = reader.read_word(offset, class)?;
        offset += word;
        let entry_size = reader.read_word(offset, class)?;

        Ok(Section {
            index,
            name_offset,
            name: String::new(),
            kind: SectionKind::from_code(type_code),
            flags: SectionFlags::from_bits_retain(flags),
            address,
            offset: file_offset,
            size,
            link,
            info,
            alignment,
            entry_size,
        })
    }
}

/// Walks the section header table and resolves every section's name.
///
/// The entry size comes from the header, not from the layout formula;
/// headers reporting a nonstandard stride still walk correctly.
pub fn parse_sections(reader: &ByteReader<'_>, header: &Header) -> Result<Vec<Section>> {
    let count = usize::from(header.section_header_count);
    let entry_size = u64::from(header.section_header_entry_size);
    if count > 0 && entry_size == 0 {
        return Err(ElfError::Truncated {
            what: "section header table",
        });
    }

    let mut sections = Vec::with_capacity(count);
    for index in 0..count {
        let at = header.section_header_offset + index as u64 * entry_size;
        sections.push(Section::parse(reader, header, index, at)?);
    }

    resolve_names(reader, header, &mut sections)?;
    Ok(sections)
}

/// Second pass: look names up in the section-name string table, which
/// is itself one of the records parsed above. Index 0 means the image
/// carries no section names.
fn resolve_names(
    reader: &ByteReader<'_>,
    header: &Header,
    sections: &mut [Section],
) -> Result<()> {
    let strtab_index = usize::from(header.section_name_table_index);
    if strtab_index == 0 {
        return Ok(());
    }
    let Some(strtab_section) = sections.get(strtab_index) else {
        return Err(ElfError::BadIndex {
            what: "section name string table",
            index: strtab_index as u64,
            limit: sections.len() as u64,
        });
    };
    let table = StringTable::new(reader, strtab_section.offset, strtab_section.size)?;
    for section in sections.iter_mut() {
        section.name = table.lookup(reader, section.name_offset)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Endianness;

    // Builds an image holding a string table at 0x10 and a two-entry
    // 64-bit section header table at 0x40: entry 1 is the string table
    // itself, entry 0 is a .text-like section.
    fn image() -> Vec<u8> {
        let mut image = vec![0u8; 0xc0];
        image[0x10..0x1e].copy_from_slice(b"\0.text\0.shstr\0");

        let mut entry = |index: usize, name: u32, kind: u32, flags: u64, offset: u64, size: u64| {
            let base = 0x40 + index * 64;
            image[base..base + 4].copy_from_slice(&name.to_le_bytes());
            image[base + 4..base + 8].copy_from_slice(&kind.to_le_bytes());
            image[base + 8..base + 16].copy_from_slice(&flags.to_le_bytes());
            image[base + 24..base + 32].copy_from_slice(&offset.to_le_bytes());
            image[base + 32..base + 40].copy_from_slice(&size.to_le_bytes());
        };
        entry(0, 1, 1, 0x6, 0xb0, 8); // .text, PROGBITS, ALLOC|EXECINSTR
        entry(1, 7, 3, 0, 0x10, 14); // .shstr, STRTAB
        image
    }

    fn header() -> Header {
        let ident = {
            let mut bytes = vec![0u8; 64];
            bytes[..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
            bytes[4] = 2;
            bytes[5] = 1;
            bytes
        };
        let mut reader = ByteReader::new(&ident);
        let mut header = Header::parse(&mut reader).unwrap();
        header.section_header_offset = 0x40;
        header.section_header_count = 2;
        header.section_header_entry_size = 64;
        header.section_name_table_index = 1;
        header
    }

    fn reader(image: &[u8]) -> ByteReader<'_> {
        let mut r = ByteReader::new(image);
        r.set_endianness(Endianness::Little);
        r
    }

    #[test]
    fn two_pass_walk_resolves_names_through_own_table() {
        let image = image();
        let sections = parse_sections(&reader(&image), &header()).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, ".text");
        assert_eq!(sections[0].kind, SectionKind::ProgBits);
        assert!(sections[0].flags.contains(SectionFlags::ALLOC | SectionFlags::EXECINSTR));
        assert_eq!(sections[1].name, ".shstr");
        assert_eq!(sections[1].kind, SectionKind::StrTab);
    }

    #[test]
    fn out_of_range_name_table_index_is_a_reference_error() {
        let image = image();
        let mut header = header();
        header.section_name_table_index = 9;
        assert!(matches!(
            parse_sections(&reader(&image), &header),
            Err(ElfError::BadIndex { what: "section name string table", index: 9, limit: 2 })
        ));
    }

    #[test]
    fn name_table_extent_outside_the_image_is_a_bounds_error() {
        let mut image = image();
        // rewrite the .shstr record's file offset to wrap u64
        let base = 0x40 + 64;
        image[base + 24..base + 32].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            parse_sections(&reader(&image), &header()),
            Err(ElfError::OutOfBounds { offset: u64::MAX, .. })
        ));
    }

    #[test]
    fn unknown_type_codes_are_retained() {
        assert_eq!(SectionKind::from_code(0x1234_5678), SectionKind::Other(0x1234_5678));
        assert_eq!(SectionKind::from_code(0x7000_0003), SectionKind::ArmAttributes);
    }
}
