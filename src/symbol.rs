//! Symbol tables.
//!
//! Every section typed SYMTAB or DYNSYM is walked; names come from the
//! string table the section's `link` field designates. The info byte
//! splits into binding (high nibble) and type (low nibble), and the
//! section-index field may hold a reserved sentinel instead of a real
//! index, which is preserved as its own variant rather than resolved.

use serde::Serialize;

use crate::error::{ElfError, Result};
use crate::header::Header;
use crate::reader::ByteReader;
use crate::section::{Section, SectionKind};
use crate::strtab::StringTable;

const INFO_TYPE_MASK: u8 = 0x0f;
const INFO_BINDING_SHIFT: u8 = 4;
const OTHER_VISIBILITY_MASK: u8 = 0x03;

// Reserved section-index range and the named sentinels inside it.
const SHN_LORESERVE: u16 = 0xff00;
const SHN_ABS: u16 = 0xfff1;
const SHN_COMMON: u16 = 0xfff2;

/// Symbol binding, from the high nibble of the info byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolBinding {
    Local,
    Global,
    Weak,
    Other(u8),
}

impl SymbolBinding {
    fn from_bits(bits: u8) -> SymbolBinding {
        match bits {
            0 => SymbolBinding::Local,
            1 => SymbolBinding::Global,
            2 => SymbolBinding::Weak,
            other => SymbolBinding::Other(other),
        }
    }
}

/// Symbol type, from the low nibble of the info byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolKind {
    NoType,
    Object,
    Func,
    Section,
    File,
    Common,
    Tls,
    Other(u8),
}

impl SymbolKind {
    fn from_bits(bits: u8) -> SymbolKind {
        match bits {
            0 => SymbolKind::NoType,
            1 => SymbolKind::Object,
            2 => SymbolKind::Func,
            3 => SymbolKind::Section,
            4 => SymbolKind::File,
            5 => SymbolKind::Common,
            6 => SymbolKind::Tls,
            other => SymbolKind::Other(other),
        }
    }
}

/// Symbol visibility, from the low bits of the `st_other` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolVisibility {
    Default,
    Internal,
    Hidden,
    Protected,
}

impl SymbolVisibility {
    fn from_bits(bits: u8) -> SymbolVisibility {
        match bits & OTHER_VISIBILITY_MASK {
            0 => SymbolVisibility::Default,
            1 => SymbolVisibility::Internal,
            2 => SymbolVisibility::Hidden,
            _ => SymbolVisibility::Protected,
        }
    }
}

/// The section a symbol belongs to: an ordinary table index, or one of
/// the reserved sentinels that mean no section at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionRef {
    /// Index 0: the symbol is undefined.
    Undefined,
    /// The value is absolute, not relative to any section.
    Absolute,
    /// A common block not yet allocated to a section.
    Common,
    /// Some other value in the reserved range, passed through raw.
    Reserved(u16),
    /// An ordinary section-table index.
    Section(u16),
}

impl SectionRef {
    pub fn from_index(index: u16) -> SectionRef {
        match index {
            0 => SectionRef::Undefined,
            SHN_ABS => SectionRef::Absolute,
            SHN_COMMON => SectionRef::Common,
            i if i >= SHN_LORESERVE => SectionRef::Reserved(i),
            i => SectionRef::Section(i),
        }
    }
}

/// One decoded symbol, including the extended owning-section view.
#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    pub index: usize,
    pub name: String,
    pub value: u64,
    pub size: u64,
    pub binding: SymbolBinding,
    pub kind: SymbolKind,
    pub visibility: SymbolVisibility,
    pub section: SectionRef,
    /// Resolved name of the owning section, `UND`/`ABS`/`COM` for the
    /// named sentinels, `None` for other reserved values.
    pub section_name: Option<String>,
}

/// All symbols decoded from one symbol-table section.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolTable {
    pub section_index: usize,
    pub section_name: String,
    pub symbols: Vec<Symbol>,
}

/// Locates every symbol-table section and decodes its entries.
pub fn parse_symbol_tables(
    reader: &ByteReader<'_>,
    header: &Header,
    sections: &[Section],
) -> Result<Vec<SymbolTable>> {
    let mut tables = Vec::new();
    for section in sections {
        if !matches!(section.kind, SectionKind::SymTab | SectionKind::DynSym) {
            continue;
        }
        tables.push(parse_table(reader, header, sections, section)?);
    }
    Ok(tables)
}

fn parse_table(
    reader: &ByteReader<'_>,
    header: &Header,
    sections: &[Section],
    table_section: &Section,
) -> Result<SymbolTable> {
    let strtab_index = table_section.link as usize;
    let Some(strtab_section) = sections.get(strtab_index) else {
        return Err(ElfError::BadIndex {
            what: "symbol string table",
            index: strtab_index as u64,
            limit: sections.len() as u64,
        });
    };
    let strtab = StringTable::new(reader, strtab_section.offset, strtab_section.size)?;

    if table_section.entry_size == 0 && table_section.size != 0 {
        return Err(ElfError::Truncated {
            what: "symbol table entries",
        });
    }
    // The declared extent must lie inside the image before the entry
    // count derived from it is trusted.
    let extent = reader.bytes(table_section.offset, table_section.size)?;
    let count = if table_section.entry_size == 0 {
        0
    } else {
        extent.len() as u64 / table_section.entry_size
    };

    let mut symbols = Vec::with_capacity(count as usize);
    for index in 0..count {
        let at = table_section.offset + index * table_section.entry_size;
        symbols.push(parse_symbol(reader, header, sections, &strtab, index as usize, at)?);
    }

    Ok(SymbolTable {
        section_index: table_section.index,
        section_name: table_section.name.clone(),
        symbols,
    })
}

fn parse_symbol(
    reader: &ByteReader<'_>,
    header: &Header,
    sections: &[Section],
    strtab: &StringTable,
    index: usize,
    at: u64,
) -> Result<Symbol> {
    let class = header.class;
    let word = class.word_size() as u64;

    let name_offset = reader.read_u32(at)?;

    // The fixed-width fields trade places between the two classes: ELF64
    // moves info/other/shndx ahead of the value and size words.
    let (info, other, section_index, value, size);
    if header.is_64bit() {
        info = reader.read_u8(at + 4)?;
        other = reader.read_u8(at + 5)?;
        section_index = reader.read_u16(at + 6)?;
        value = reader.read_word(at + 8, class)?;
        size = reader.read_word(at + 8 + word, class)?;
    } else {
        value = reader.read_word(at + 4, class)?;
        size = reader.read_word(at + 4 + word, class)?;
        info = reader.read_u8(at + 12)?;
        other = reader.read_u8(at + 13)?;
        section_index = reader.read_u16(at + 14)?;
    }

    let kind = SymbolKind::from_bits(info & INFO_TYPE_MASK);
    let binding = SymbolBinding::from_bits(info >> INFO_BINDING_SHIFT);
    let visibility = SymbolVisibility::from_bits(other);
    let section = SectionRef::from_index(section_index);

    let section_name = match section {
        SectionRef::Undefined => Some("UND".to_string()),
        SectionRef::Absolute => Some("ABS".to_string()),
        SectionRef::Common => Some("COM".to_string()),
        SectionRef::Reserved(_) => None,
        SectionRef::Section(i) => {
            let Some(owner) = sections.get(usize::from(i)) else {
                return Err(ElfError::BadIndex {
                    what: "symbol owning section",
                    index: u64::from(i),
                    limit: sections.len() as u64,
                });
            };
            Some(owner.name.clone())
        }
    };

    let mut name = strtab.lookup(reader, name_offset)?;
    // Section symbols usually carry no name of their own; borrow the
    // owning section's.
    if name.is_empty() && kind == SymbolKind::Section {
        if let Some(owner) = &section_name {
            name = owner.clone();
        }
    }

    Ok(Symbol {
        index,
        name,
        value,
        size,
        binding,
        kind,
        visibility,
        section,
        section_name,
    })
}
