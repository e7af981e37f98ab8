//! Program header (segment) table.
//!
//! Segments are the loader's view of the image. They are best-effort
//! descriptive metadata: unknown type codes are retained rather than
//! rejected, and the flag word is decomposed bit by bit since the
//! read/write/execute bits combine freely.

use bitflags::bitflags;
use serde::Serialize;

use crate::error::{ElfError, Result};
use crate::header::Header;
use crate::reader::ByteReader;
use crate::section::{Section, SectionFlags, SectionKind};

/// Segment type codes, mapped through a fixed lookup. Codes outside the
/// table stay inspectable as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentKind {
    Null,
    Load,
    Dynamic,
    Interp,
    Note,
    ShLib,
    Phdr,
    Tls,
    GnuEhFrame,
    GnuStack,
    GnuRelro,
    GnuSframe,
    ArmExidx,
    Other(u32),
}

impl SegmentKind {
    pub fn from_code(code: u32) -> SegmentKind {
        match code {
            0 => SegmentKind::Null,
            1 => SegmentKind::Load,
            2 => SegmentKind::Dynamic,
            3 => SegmentKind::Interp,
            4 => SegmentKind::Note,
            5 => SegmentKind::ShLib,
            6 => SegmentKind::Phdr,
            7 => SegmentKind::Tls,
            0x6474_e550 => SegmentKind::GnuEhFrame,
            0x6474_e551 => SegmentKind::GnuStack,
            0x6474_e552 => SegmentKind::GnuRelro,
            0x6474_e554 => SegmentKind::GnuSframe,
            0x7000_0001 => SegmentKind::ArmExidx,
            other => SegmentKind::Other(other),
        }
    }
}

bitflags! {
    /// Segment permission bits (`p_flags`), a free combination of
    /// execute/write/read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct SegmentFlags: u32 {
        const EXECUTE = 0x1;
        const WRITE = 0x2;
        const READ = 0x4;
        const _ = !0;
    }
}

impl SegmentFlags {
    /// `readelf`-style permission letters, e.g. `RX` for a code segment.
    pub fn letters(self) -> String {
        let mut out = String::with_capacity(3);
        if self.contains(SegmentFlags::READ) {
            out.push('R');
        }
        if self.contains(SegmentFlags::WRITE) {
            out.push('W');
        }
        if self.contains(SegmentFlags::EXECUTE) {
            out.push('X');
        }
        out
    }
}

/// One decoded program header.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub index: usize,
    pub kind: SegmentKind,
    pub flags: SegmentFlags,
    pub offset: u64,
    pub virtual_address: u64,
    pub physical_address: u64,
    pub file_size: u64,
    pub memory_size: u64,
    pub alignment: u64,
    /// Indices of the sections this segment covers, computed after the
    /// section table is available.
    pub section_indices: Vec<usize>,
}

impl Segment {
    fn parse(reader: &ByteReader<'_>, header: &Header, index: usize, at: u64) -> Result<Segment> {
        let class = header.class;
        let word = class.word_size() as u64;
        let mut offset = at;

        let type_code = reader.read_u32(offset)?;
        offset += 4;

        // The flags field sits after the type in ELF64 but after the
        // sizes in ELF32.
        let mut flags = 0u32;
        if header.is_64bit() {
            flags = reader.read_u32(offset)?;
            offset += 4;
        }

        let file_offset = reader.read_word(offset, class)?;
        offset += word;
        let virtual_address = reader.read_word(offset, class)?;
        offset += word;
        let physical_address = reader.read_word(offset, class)?;
        offset += word;
        let file_size = reader.read_word(offset, class)?;
        offset += word;
        let memory_size = reader.read_word(offset, class)?;
        offset += word;

        if !header.is_64bit() {
            flags = reader.read_u32(offset)?;
            offset += 4;
        }

        let alignment = reader.read_word(offset, class)?;

        Ok(Segment {
            index,
            kind: SegmentKind::from_code(type_code),
            flags: SegmentFlags::from_bits_retain(flags),
            offset: file_offset,
            virtual_address,
            physical_address,
            file_size,
            memory_size,
            alignment,
            section_indices: Vec::new(),
        })
    }
}

/// Walks the program header table. Entry size is whatever the header
/// declares.
pub fn parse_segments(reader: &ByteReader<'_>, header: &Header) -> Result<Vec<Segment>> {
    let count = usize::from(header.program_header_count);
    let entry_size = u64::from(header.program_header_entry_size);
    if count > 0 && entry_size == 0 {
        return Err(ElfError::Truncated {
            what: "program header table",
        });
    }

    let mut segments = Vec::with_capacity(count);
    for index in 0..count {
        let at = header.program_header_offset + index as u64 * entry_size;
        segments.push(Segment::parse(reader, header, index, at)?);
    }
    Ok(segments)
}

/// A NOBITS TLS section occupies no space in a non-TLS segment.
fn effective_size(section: &Section, segment: &Segment) -> u64 {
    if section.flags.contains(SectionFlags::TLS)
        && section.kind == SectionKind::NoBits
        && segment.kind != SegmentKind::Tls
    {
        0
    } else {
        section.size
    }
}

/// The binutils section-in-segment rule (the strict `readelf` variant),
/// used to compute which sections each segment covers.
pub fn section_in_segment(section: &Section, segment: &Segment) -> bool {
    let tls = section.flags.contains(SectionFlags::TLS);

    // Only PT_TLS, PT_GNU_RELRO and PT_LOAD hold TLS sections; PT_TLS
    // holds nothing else and PT_PHDR holds no sections at all.
    let kind_ok = if tls {
        matches!(
            segment.kind,
            SegmentKind::Tls | SegmentKind::GnuRelro | SegmentKind::Load
        )
    } else {
        !matches!(segment.kind, SegmentKind::Tls | SegmentKind::Phdr)
    };
    if !kind_ok {
        return false;
    }

    // PT_LOAD and friends only hold allocated sections.
    let alloc = section.flags.contains(SectionFlags::ALLOC);
    if !alloc
        && matches!(
            segment.kind,
            SegmentKind::Load
                | SegmentKind::Dynamic
                | SegmentKind::GnuEhFrame
                | SegmentKind::GnuStack
                | SegmentKind::GnuRelro
                | SegmentKind::GnuSframe
        )
    {
        return false;
    }

    let size = effective_size(section, segment);

    // Any section besides NOBITS must have its file bytes inside the
    // segment's file extent.
    if section.kind != SectionKind::NoBits {
        let inside = section.offset >= segment.offset
            && section.offset - segment.offset < segment.file_size
            && section.offset - segment.offset + size <= segment.file_size;
        if !inside {
            return false;
        }
    }

    // Allocated sections must have their VMAs inside the memory extent.
    if alloc {
        let inside = section.address >= segment.virtual_address
            && section.address - segment.virtual_address < segment.memory_size
            && section.address - segment.virtual_address + size <= segment.memory_size;
        if !inside {
            return false;
        }
    }

    // No zero-size sections pinned at the edges of PT_DYNAMIC / PT_NOTE.
    if matches!(segment.kind, SegmentKind::Dynamic | SegmentKind::Note)
        && section.size == 0
        && segment.memory_size != 0
    {
        let inside_file = section.kind == SectionKind::NoBits
            || (section.offset > segment.offset
                && section.offset - segment.offset < segment.file_size);
        let inside_mem = !alloc
            || (section.address > segment.virtual_address
                && section.address - segment.virtual_address < segment.memory_size);
        if !(inside_file && inside_mem) {
            return false;
        }
    }

    true
}
