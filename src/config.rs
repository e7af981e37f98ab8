//! Configuration module.
//!
//! This module defines the command-line interface (CLI) for the analyzer
//! using `clap`. It handles parsing the input path, the report selection
//! flags, and the output format.

use clap::Parser;
use std::path::PathBuf;

/// A structural analyzer for ELF firmware images.
///
/// Decodes the header, section and program header tables, symbol
/// tables, compiler identification, and ARM build attributes of a
/// single ELF file and prints a report.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// ELF file to analyze
    pub file: PathBuf,

    /// Emit the full model as JSON instead of a text report
    #[arg(short, long)]
    pub json: bool,

    /// Print the file header
    #[arg(long)]
    pub header: bool,

    /// Print the section table
    #[arg(long)]
    pub sections: bool,

    /// Print the segment (program header) table
    #[arg(long)]
    pub segments: bool,

    /// Print the symbol tables
    #[arg(long)]
    pub symbols: bool,

    /// Print compiler identity and build attributes
    #[arg(long)]
    pub attributes: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub log_level: String,
}

impl Config {
    /// True when no selection flag was given, meaning "print everything".
    pub fn print_all(&self) -> bool {
        !(self.header || self.sections || self.segments || self.symbols || self.attributes)
    }
}
