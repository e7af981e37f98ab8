//! Typed decode failures.
//!
//! Structural problems (bad magic, unsupported encodings, out-of-range
//! reads, dangling table references) abort the parse and carry enough
//! detail to diagnose the offending offset. Advisory metadata (the
//! `.comment` section, build attributes) never produces these; it
//! degrades to an "absent" value instead.

use thiserror::Error;

/// Errors produced while decoding an ELF image.
#[derive(Error, Debug)]
pub enum ElfError {
    /// The identification bytes do not start with `\x7fELF`.
    #[error("not an ELF image: magic bytes {found:02x?}")]
    BadMagic { found: [u8; 4] },

    /// Recognized as ELF but declaring a class/encoding the decoder
    /// does not interpret.
    #[error("unsupported {what}: {value:#x}")]
    Unsupported { what: &'static str, value: u64 },

    /// A read past the end of the buffer. Never returns truncated or
    /// zero-filled data instead.
    #[error("read of {width} bytes at offset {offset:#x} exceeds image size {len:#x}")]
    OutOfBounds { offset: u64, width: usize, len: usize },

    /// An index (section link, string-table index, ...) outside the
    /// declared extent of its table.
    #[error("{what} index {index} outside table of {limit} entries")]
    BadIndex { what: &'static str, index: u64, limit: u64 },

    /// A name offset outside its string table.
    #[error("string offset {offset:#x} outside string table of {size:#x} bytes")]
    BadStringOffset { offset: u64, size: u64 },

    /// A table whose declared size does not hold even one entry.
    #[error("truncated {what}")]
    Truncated { what: &'static str },

    /// A structural error tagged with the parsing stage it occurred in.
    #[error("while decoding {stage}: {source}")]
    InStage {
        stage: &'static str,
        #[source]
        source: Box<ElfError>,
    },
}

impl ElfError {
    /// Attaches the parsing stage to a structural error. Errors that
    /// already carry a stage are left as-is.
    pub fn in_stage(self, stage: &'static str) -> ElfError {
        match self {
            e @ ElfError::InStage { .. } => e,
            e => ElfError::InStage {
                stage,
                source: Box::new(e),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ElfError>;
