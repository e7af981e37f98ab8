//! Aggregated structural model of one ELF image.
//!
//! This module drives the decode end to end. The stage order is fixed
//! because each stage depends on offsets or indices established by an
//! earlier one: header first (it fixes word size and byte order), then
//! the segment and section tables, then everything that needs named
//! sections. The whole decode is a pure function of the input bytes.

use serde::Serialize;

use crate::attributes::{self, BuildAttributes};
use crate::comment::{self, CompilerInfo};
use crate::error::Result;
use crate::header::Header;
use crate::reader::ByteReader;
use crate::section::{self, Section, SectionKind};
use crate::segment::{self, Segment};
use crate::symbol::{self, SymbolTable};

/// Name of the section holding toolchain identification strings.
const COMMENT_SECTION: &str = ".comment";

/// Fully decoded, cross-referenced view of one image.
#[derive(Debug, Clone, Serialize)]
pub struct ElfModel {
    pub header: Header,
    pub sections: Vec<Section>,
    pub segments: Vec<Segment>,
    pub symbol_tables: Vec<SymbolTable>,
    pub compiler: CompilerInfo,
    pub attributes: Option<BuildAttributes>,
}

impl ElfModel {
    /// Decodes one raw image.
    ///
    /// Structural failures abort with the parsing stage attached; no
    /// partial model is returned. Advisory metadata (compiler identity,
    /// build attributes) degrades to `Unknown`/`None` instead.
    pub fn parse(bytes: &[u8]) -> Result<ElfModel> {
        let mut reader = ByteReader::new(bytes);

        let header = Header::parse(&mut reader).map_err(|e| e.in_stage("file header"))?;
        tracing::debug!(
            machine = header.machine_name,
            class = ?header.class,
            endianness = ?header.endianness,
            "decoded file header"
        );

        let mut segments = segment::parse_segments(&reader, &header)
            .map_err(|e| e.in_stage("program header table"))?;
        let sections = section::parse_sections(&reader, &header)
            .map_err(|e| e.in_stage("section header table"))?;

        for seg in &mut segments {
            for sec in &sections {
                if segment::section_in_segment(sec, seg) {
                    seg.section_indices.push(sec.index);
                }
            }
        }

        let symbol_tables = symbol::parse_symbol_tables(&reader, &header, &sections)
            .map_err(|e| e.in_stage("symbol table"))?;

        let compiler = load_compiler_info(&reader, &sections);
        let attributes = load_build_attributes(&reader, &header, &sections);

        Ok(ElfModel {
            header,
            sections,
            segments,
            symbol_tables,
            compiler,
            attributes,
        })
    }

    /// Total number of symbols across every symbol table.
    pub fn symbol_count(&self) -> usize {
        self.symbol_tables.iter().map(|t| t.symbols.len()).sum()
    }

    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// Advisory: compiler identity from `.comment`. Never fails the parse.
fn load_compiler_info(reader: &ByteReader<'_>, sections: &[Section]) -> CompilerInfo {
    let Some(section) = sections.iter().find(|s| s.name == COMMENT_SECTION) else {
        tracing::debug!("no {COMMENT_SECTION} section, compiler unknown");
        return CompilerInfo::unknown();
    };
    match reader.bytes(section.offset, section.size) {
        Ok(bytes) => comment::parse_comments(bytes),
        Err(e) => {
            tracing::warn!("unreadable {COMMENT_SECTION} section: {e}");
            CompilerInfo::unknown()
        }
    }
}

/// Advisory: ARM build attributes. Never fails the parse.
fn load_build_attributes(
    reader: &ByteReader<'_>,
    header: &Header,
    sections: &[Section],
) -> Option<BuildAttributes> {
    let section = sections
        .iter()
        .find(|s| s.kind == SectionKind::ArmAttributes)?;
    match reader.bytes(section.offset, section.size) {
        Ok(bytes) => attributes::parse_build_attributes(bytes, header.endianness),
        Err(e) => {
            tracing::warn!("unreadable build-attributes section: {e}");
            None
        }
    }
}
