//! End-to-end decoding of synthetic 64-bit little-endian images built
//! byte by byte, so every offset the decoder computes is exercised
//! against known ground truth.

use elfscope::error::ElfError;
use elfscope::model::ElfModel;
use elfscope::section::SectionKind;
use elfscope::segment::{SegmentFlags, SegmentKind};
use elfscope::symbol::{SectionRef, SymbolBinding, SymbolKind, SymbolVisibility};

fn w16(image: &mut [u8], at: usize, value: u16) {
    image[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn w32(image: &mut [u8], at: usize, value: u32) {
    image[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn w64(image: &mut [u8], at: usize, value: u64) {
    image[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

fn write_ehdr(image: &mut [u8], shoff: u64, shnum: u16, shstrndx: u16) {
    image[..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
    image[4] = 2; // ELFCLASS64
    image[5] = 1; // little endian
    image[6] = 1;
    w16(image, 16, 2); // ET_EXEC
    w16(image, 18, 183); // AArch64
    w32(image, 20, 1);
    w64(image, 24, 0x800_0000); // entry
    w64(image, 32, 64); // phoff
    w64(image, 40, shoff);
    w16(image, 52, 64); // ehsize
    w16(image, 54, 56); // phentsize
    w16(image, 56, 1); // phnum
    w16(image, 58, 64); // shentsize
    w16(image, 60, shnum);
    w16(image, 62, shstrndx);
}

fn write_load_phdr(image: &mut [u8]) {
    w32(image, 64, 1); // PT_LOAD
    w32(image, 68, 5); // R + X
    w64(image, 72, 0x100); // offset
    w64(image, 80, 0x800_0000); // vaddr
    w64(image, 88, 0x800_0000); // paddr
    w64(image, 96, 0x10); // filesz
    w64(image, 104, 0x10); // memsz
    w64(image, 112, 0x1000); // align
}

#[allow(clippy::too_many_arguments)]
fn write_shdr(
    image: &mut [u8],
    table: usize,
    index: usize,
    name: u32,
    kind: u32,
    flags: u64,
    addr: u64,
    offset: u64,
    size: u64,
    link: u32,
    entsize: u64,
) {
    let base = table + index * 64;
    w32(image, base, name);
    w32(image, base + 4, kind);
    w64(image, base + 8, flags);
    w64(image, base + 16, addr);
    w64(image, base + 24, offset);
    w64(image, base + 32, size);
    w32(image, base + 40, link);
    w64(image, base + 56, entsize);
}

fn write_main_symtab(image: &mut [u8], at: usize, name: u32, shndx: u16) {
    // entry 0 stays all zeros; entry 1 is "main"
    let base = at + 24;
    w32(image, base, name);
    image[base + 4] = 0x12; // GLOBAL | FUNC
    w16(image, base + 6, shndx);
    w64(image, base + 8, 0x800_0000);
    w64(image, base + 16, 16);
}

/// shnum=3, phnum=1: .symtab / .strtab / .text, one loadable segment,
/// one defined symbol `main` owned by `.text`.
fn minimal_image() -> Vec<u8> {
    let mut image = vec![0u8; 0x220];
    write_ehdr(&mut image, 0x160, 3, 1);
    write_load_phdr(&mut image);
    image[0x100..0x110].fill(0xd4); // .text payload
    image[0x110..0x12c].copy_from_slice(b"\0.symtab\0.strtab\0.text\0main\0");
    write_main_symtab(&mut image, 0x130, 23, 2);
    write_shdr(&mut image, 0x160, 0, 1, 2, 0, 0, 0x130, 48, 1, 24); // .symtab
    write_shdr(&mut image, 0x160, 1, 9, 3, 0, 0, 0x110, 28, 0, 0); // .strtab
    write_shdr(&mut image, 0x160, 2, 17, 1, 0x6, 0x800_0000, 0x100, 16, 0, 0); // .text
    image
}

/// The minimal image extended with `.comment` and `.ARM.attributes`.
fn firmware_image() -> Vec<u8> {
    let mut image = vec![0u8; 0x2f0];
    write_ehdr(&mut image, 0x1b0, 5, 1);
    write_load_phdr(&mut image);
    image[0x100..0x110].fill(0xd4);
    image[0x110..0x145]
        .copy_from_slice(b"\0.symtab\0.strtab\0.text\0main\0.comment\0.ARM.attributes\0");
    write_main_symtab(&mut image, 0x150, 23, 2);
    image[0x180..0x190].copy_from_slice(b"$Id$\0GCC 12.2.0\0");

    // aeabi build attributes: CPU_name = "cortex-m4", CPU_arch = 13
    let attrs: &[u8] = &[
        b'A', 28, 0, 0, 0, b'a', b'e', b'a', b'b', b'i', 0, 1, 18, 0, 0, 0, 5, b'c', b'o', b'r',
        b't', b'e', b'x', b'-', b'm', b'4', 0, 6, 13,
    ];
    image[0x190..0x190 + attrs.len()].copy_from_slice(attrs);

    write_shdr(&mut image, 0x1b0, 0, 1, 2, 0, 0, 0x150, 48, 1, 24); // .symtab
    write_shdr(&mut image, 0x1b0, 1, 9, 3, 0, 0, 0x110, 53, 0, 0); // .strtab
    write_shdr(&mut image, 0x1b0, 2, 17, 1, 0x6, 0x800_0000, 0x100, 16, 0, 0); // .text
    write_shdr(&mut image, 0x1b0, 3, 28, 1, 0, 0, 0x180, 16, 0, 0); // .comment
    write_shdr(&mut image, 0x1b0, 4, 37, 0x7000_0003, 0, 0, 0x190, 29, 0, 0); // .ARM.attributes
    image
}

#[test]
fn decodes_minimal_image_end_to_end() {
    let image = minimal_image();
    let model = ElfModel::parse(&image).unwrap();

    // table lengths follow the declared header counts
    assert_eq!(model.sections.len(), usize::from(model.header.section_header_count));
    assert_eq!(model.segments.len(), usize::from(model.header.program_header_count));
    assert_eq!(model.sections.len(), 3);
    assert_eq!(model.segments.len(), 1);

    let names: Vec<&str> = model.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, [".symtab", ".strtab", ".text"]);
    let text = model.section_by_name(".text").unwrap();
    assert_eq!(text.kind, SectionKind::ProgBits);
    assert_eq!(text.index, 2);

    let segment = &model.segments[0];
    assert_eq!(segment.kind, SegmentKind::Load);
    assert!(segment.flags.contains(SegmentFlags::READ | SegmentFlags::EXECUTE));
    assert!(!segment.flags.contains(SegmentFlags::WRITE));
    assert_eq!(segment.section_indices, [2]);

    assert_eq!(model.symbol_tables.len(), 1);
    let symbols = &model.symbol_tables[0].symbols;
    assert_eq!(symbols.len(), 2);

    // the null entry: name offset 0 resolves to the empty string
    assert_eq!(symbols[0].name, "");
    assert_eq!(symbols[0].section, SectionRef::Undefined);
    assert_eq!(symbols[0].section_name.as_deref(), Some("UND"));

    let main = &symbols[1];
    assert_eq!(main.name, "main");
    assert_eq!(main.binding, SymbolBinding::Global);
    assert_eq!(main.kind, SymbolKind::Func);
    assert_eq!(main.visibility, SymbolVisibility::Default);
    assert_eq!(main.value, 0x800_0000);
    assert_eq!(main.size, 16);
    assert_eq!(main.section, SectionRef::Section(2));
    assert_eq!(main.section_name.as_deref(), Some(".text"));

    // no advisory metadata in this image
    assert_eq!(model.compiler.detected, "Unknown");
    assert!(model.attributes.is_none());
}

#[test]
fn header_reflects_declared_ident_bytes() {
    let image = minimal_image();
    let model = ElfModel::parse(&image).unwrap();
    assert!(model.header.is_64bit());
    assert_eq!(model.header.machine_name, "AArch64");
    assert_eq!(model.header.entry_point, 0x800_0000);
    assert_eq!(model.header.file_type_name, "EXEC (executable)");
}

#[test]
fn decodes_advisory_metadata_from_firmware_image() {
    let image = firmware_image();
    let model = ElfModel::parse(&image).unwrap();

    assert_eq!(model.sections.len(), 5);
    assert_eq!(model.compiler.detected, "GCC 12.2.0");
    assert_eq!(model.compiler.comments, ["$Id$", "GCC 12.2.0"]);

    let attrs = model.attributes.as_ref().unwrap();
    assert_eq!(attrs.vendor, "aeabi");
    assert_eq!(attrs.cpu_name(), Some("cortex-m4"));
    assert_eq!(attrs.entries.len(), 2);
}

#[test]
fn parse_is_deterministic() {
    let image = firmware_image();
    let first = serde_json::to_string(&ElfModel::parse(&image).unwrap()).unwrap();
    let second = serde_json::to_string(&ElfModel::parse(&image).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn structural_failures_name_their_stage() {
    // cut the image before the section header table
    let image = minimal_image();
    match ElfModel::parse(&image[..0x150]) {
        Err(ElfError::InStage { stage, source }) => {
            assert_eq!(stage, "section header table");
            assert!(matches!(*source, ElfError::OutOfBounds { .. }));
        }
        other => panic!("expected a staged bounds error, got {other:?}"),
    }
}

#[test]
fn non_elf_input_is_rejected_outright() {
    let err = ElfModel::parse(&[0u8; 64]).unwrap_err();
    match err {
        ElfError::InStage { stage, source } => {
            assert_eq!(stage, "file header");
            assert!(matches!(*source, ElfError::BadMagic { .. }));
        }
        other => panic!("expected BadMagic, got {other:?}"),
    }
}

#[test]
fn oversized_symbol_table_declaration_is_a_bounds_error() {
    let mut image = minimal_image();
    // .symtab now claims u64::MAX bytes of one-byte entries; the decoder
    // must reject the extent, not trust the derived entry count
    w64(&mut image, 0x160 + 32, u64::MAX);
    w64(&mut image, 0x160 + 56, 1);
    match ElfModel::parse(&image) {
        Err(ElfError::InStage { stage, source }) => {
            assert_eq!(stage, "symbol table");
            assert!(matches!(*source, ElfError::OutOfBounds { offset: 0x130, .. }));
        }
        other => panic!("expected a staged bounds error, got {other:?}"),
    }
}

#[test]
fn wrapping_string_table_offset_is_a_bounds_error() {
    let mut image = minimal_image();
    // .strtab's file offset now wraps u64 when a name offset is added
    w64(&mut image, 0x160 + 64 + 24, u64::MAX);
    match ElfModel::parse(&image) {
        Err(ElfError::InStage { stage, source }) => {
            assert_eq!(stage, "section header table");
            assert!(matches!(*source, ElfError::OutOfBounds { offset: u64::MAX, .. }));
        }
        other => panic!("expected a staged bounds error, got {other:?}"),
    }
}

#[test]
fn dangling_symbol_string_table_link_is_a_reference_error() {
    let mut image = minimal_image();
    // .symtab's link now points past the section table
    w32(&mut image, 0x160 + 40, 7);
    match ElfModel::parse(&image) {
        Err(ElfError::InStage { stage, source }) => {
            assert_eq!(stage, "symbol table");
            assert!(matches!(
                *source,
                ElfError::BadIndex { what: "symbol string table", index: 7, limit: 3 }
            ));
        }
        other => panic!("expected a staged reference error, got {other:?}"),
    }
}
