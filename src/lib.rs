//! ELF Structure Decoder Library.
//!
//! This library provides the core components of the `elfscope` analyzer.
//! It is organized into several modules:
//! - `config`: CLI configuration.
//! - `reader`: endian-aware, bounds-checked byte access.
//! - `header`: fixed-layout file header parsing.
//! - `section`: section header table walking and name resolution.
//! - `segment`: program header table walking and flag decoding.
//! - `symbol`: symbol table decoding.
//! - `comment`: compiler identification from `.comment`.
//! - `attributes`: ARM EABI build attributes.
//! - `model`: the aggregated decode entry point.
//!
//! The decoder is read-only and deterministic: [`model::ElfModel::parse`]
//! is a pure function of the input bytes, so independent buffers may be
//! decoded concurrently without locking.

pub mod attributes;
pub mod comment;
pub mod config;
pub mod error;
pub mod header;
pub mod model;
pub mod reader;
pub mod section;
pub mod segment;
pub mod strtab;
pub mod symbol;

pub use error::{ElfError, Result};
pub use model::ElfModel;
