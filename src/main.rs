//! Entry point for the elfscope analyzer.
//!
//! This file handles high-level application flow:
//! 1. Parse command-line arguments using `clap`.
//! 2. Initialize `tracing` with the requested log level.
//! 3. Map the input file into memory.
//! 4. Decode the image into an `ElfModel`.
//! 5. Render the requested report (text or JSON) to standard output.
//!
//! Error handling is done via `anyhow`.

use anyhow::{Context, Result};
use clap::Parser;
use memmap2::Mmap;
use std::fs::File;
use tracing_subscriber::EnvFilter;

use elfscope::config::Config;
use elfscope::model::ElfModel;
use elfscope::symbol::SymbolTable;

fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).context("invalid --log-level value")?,
        )
        .with_writer(std::io::stderr)
        .init();

    let file = File::open(&config.file)
        .with_context(|| format!("failed to open {}", config.file.display()))?;
    let mmap = unsafe { Mmap::map(&file)? };

    let model = ElfModel::parse(&mmap)
        .with_context(|| format!("failed to decode {}", config.file.display()))?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&model)?);
        return Ok(());
    }

    let all = config.print_all();
    if all || config.header {
        print_header(&model);
    }
    if all || config.segments {
        print_segments(&model);
    }
    if all || config.sections {
        print_sections(&model);
    }
    if all || config.symbols {
        for table in &model.symbol_tables {
            print_symbols(table);
        }
    }
    if all || config.attributes {
        print_attributes(&model);
    }

    Ok(())
}

fn print_header(model: &ElfModel) {
    let h = &model.header;
    println!("ELF header");
    println!("  Class:       {:?}", h.class);
    println!("  Endianness:  {:?}", h.endianness);
    println!("  Type:        {}", h.file_type_name);
    println!("  Machine:     {} ({})", h.machine_name, h.machine);
    println!("  Entry point: {:#x}", h.entry_point);
    println!("  Flags:       {:#x}", h.flags);
    println!(
        "  Sections:    {} entries of {} bytes at {:#x}",
        h.section_header_count, h.section_header_entry_size, h.section_header_offset
    );
    println!(
        "  Segments:    {} entries of {} bytes at {:#x}",
        h.program_header_count, h.program_header_entry_size, h.program_header_offset
    );
    println!();
}

fn print_sections(model: &ElfModel) {
    println!("Sections ({})", model.sections.len());
    println!(
        "  {:<4} {:<20} {:<14} {:>10} {:>10} {:>8}",
        "idx", "name", "type", "address", "offset", "size"
    );
    for s in &model.sections {
        println!(
            "  {:<4} {:<20} {:<14} {:>10x} {:>10x} {:>8x}",
            s.index,
            s.name,
            format!("{:?}", s.kind),
            s.address,
            s.offset,
            s.size
        );
    }
    println!();
}

fn print_segments(model: &ElfModel) {
    println!("Segments ({})", model.segments.len());
    println!(
        "  {:<4} {:<12} {:<5} {:>10} {:>10} {:>8} {:>8}  sections",
        "idx", "type", "flags", "offset", "vaddr", "filesz", "memsz"
    );
    for seg in &model.segments {
        let covered: Vec<&str> = seg
            .section_indices
            .iter()
            .filter_map(|&i| model.sections.get(i))
            .map(|s| s.name.as_str())
            .collect();
        println!(
            "  {:<4} {:<12} {:<5} {:>10x} {:>10x} {:>8x} {:>8x}  {}",
            seg.index,
            format!("{:?}", seg.kind),
            seg.flags.letters(),
            seg.offset,
            seg.virtual_address,
            seg.file_size,
            seg.memory_size,
            covered.join(" ")
        );
    }
    println!();
}

fn print_symbols(table: &SymbolTable) {
    println!("Symbol table {} ({})", table.section_name, table.symbols.len());
    println!(
        "  {:<4} {:>10} {:>6} {:<8} {:<8} {:<10} {:<16} name",
        "idx", "value", "size", "bind", "type", "vis", "section"
    );
    for sym in &table.symbols {
        println!(
            "  {:<4} {:>10x} {:>6} {:<8} {:<8} {:<10} {:<16} {}",
            sym.index,
            sym.value,
            sym.size,
            format!("{:?}", sym.binding),
            format!("{:?}", sym.kind),
            format!("{:?}", sym.visibility),
            sym.section_name.as_deref().unwrap_or("?"),
            sym.name
        );
    }
    println!();
}

fn print_attributes(model: &ElfModel) {
    println!("Compiler: {}", model.compiler.detected);
    match &model.attributes {
        Some(attrs) => {
            println!("Build attributes ({} vendor)", attrs.vendor);
            for entry in &entries_in_order(attrs) {
                let label = entry
                    .name
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("tag {}", entry.tag));
                match &entry.value {
                    elfscope::attributes::AttributeValue::Text(text) => {
                        println!("  [{:?}] {label}: {text}", entry.bucket)
                    }
                    elfscope::attributes::AttributeValue::Int(number) => {
                        println!("  [{:?}] {label}: {number}", entry.bucket)
                    }
                }
            }
        }
        None => println!("Build attributes: none"),
    }
}

/// Groups attribute entries by bucket for display, preserving record
/// order inside each bucket.
fn entries_in_order(
    attrs: &elfscope::attributes::BuildAttributes,
) -> Vec<elfscope::attributes::BuildAttribute> {
    use elfscope::attributes::AttributeBucket::*;
    let mut ordered = Vec::with_capacity(attrs.entries.len());
    for bucket in [Cpu, Abi, FloatingPoint, Extensions, Misc] {
        ordered.extend(attrs.entries.iter().filter(|e| e.bucket == bucket).cloned());
    }
    ordered
}
