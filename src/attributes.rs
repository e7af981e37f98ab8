//! ARM EABI build attributes.
//!
//! The `.ARM.attributes` section records the toolchain's view of the
//! target: CPU name, architecture revision, ABI choices, FP model.
//! Format: a version byte `'A'`, then vendor subsections (u32 length +
//! NUL-terminated vendor name); the `"aeabi"` vendor holds a file-scope
//! block (tag 1) of ULEB128-encoded tag/value records. A handful of
//! tags carry NUL-terminated strings instead of integers.
//!
//! Attributes are advisory: a missing or malformed section yields
//! `None`, never a parse failure. Unknown tags are preserved raw.

use serde::Serialize;

use crate::reader::Endianness;

const FORMAT_VERSION: u8 = b'A';
const AEABI_VENDOR: &str = "aeabi";
const TAG_FILE: u8 = 1;

/// Presentation grouping for decoded attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttributeBucket {
    Cpu,
    Abi,
    FloatingPoint,
    Extensions,
    Misc,
}

/// Value payload of one attribute record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AttributeValue {
    Int(u64),
    Text(String),
}

/// One tag/value record, named where the tag is known.
#[derive(Debug, Clone, Serialize)]
pub struct BuildAttribute {
    pub tag: u64,
    pub name: Option<&'static str>,
    pub bucket: AttributeBucket,
    pub value: AttributeValue,
}

/// All file-scope attributes of the `"aeabi"` vendor, in record order.
#[derive(Debug, Clone, Serialize)]
pub struct BuildAttributes {
    pub vendor: String,
    pub entries: Vec<BuildAttribute>,
}

impl BuildAttributes {
    /// The CPU name the toolchain targeted, if recorded.
    pub fn cpu_name(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.tag == 5)
            .and_then(|entry| match &entry.value {
                AttributeValue::Text(text) => Some(text.as_str()),
                AttributeValue::Int(_) => None,
            })
    }
}

/// Tags whose payload is a NUL-terminated string rather than a ULEB128
/// integer.
fn is_string_tag(tag: u64) -> bool {
    matches!(tag, 4 | 5 | 32 | 65 | 67)
}

/// Known aeabi tag names and their presentation buckets.
fn tag_info(tag: u64) -> (Option<&'static str>, AttributeBucket) {
    use AttributeBucket::*;
    match tag {
        4 => (Some("CPU_raw_name"), Cpu),
        5 => (Some("CPU_name"), Cpu),
        6 => (Some("CPU_arch"), Cpu),
        7 => (Some("CPU_arch_profile"), Cpu),
        8 => (Some("ARM_ISA_use"), Cpu),
        9 => (Some("THUMB_ISA_use"), Cpu),
        10 => (Some("FP_arch"), FloatingPoint),
        11 => (Some("WMMX_arch"), Extensions),
        12 => (Some("Advanced_SIMD_arch"), Extensions),
        13 => (Some("PCS_config"), Abi),
        14 => (Some("ABI_PCS_R9_use"), Abi),
        15 => (Some("ABI_PCS_RW_data"), Abi),
        16 => (Some("ABI_PCS_RO_data"), Abi),
        17 => (Some("ABI_PCS_GOT_use"), Abi),
        18 => (Some("ABI_PCS_wchar_t"), Abi),
        19 => (Some("ABI_FP_rounding"), FloatingPoint),
        20 => (Some("ABI_FP_denormal"), FloatingPoint),
        21 => (Some("ABI_FP_exceptions"), FloatingPoint),
        22 => (Some("ABI_FP_user_exceptions"), FloatingPoint),
        23 => (Some("ABI_FP_number_model"), FloatingPoint),
        24 => (Some("ABI_align_needed"), Abi),
        25 => (Some("ABI_align_preserved"), Abi),
        26 => (Some("ABI_enum_size"), Abi),
        27 => (Some("ABI_HardFP_use"), FloatingPoint),
        28 => (Some("ABI_VFP_args"), FloatingPoint),
        29 => (Some("ABI_WMMX_args"), Abi),
        30 => (Some("ABI_optimization_goals"), Misc),
        31 => (Some("ABI_FP_optimization_goals"), FloatingPoint),
        32 => (Some("compatibility"), Misc),
        34 => (Some("CPU_unaligned_access"), Cpu),
        36 => (Some("FP_HP_extension"), FloatingPoint),
        38 => (Some("ABI_FP_16bit_format"), FloatingPoint),
        42 => (Some("MPextension_use"), Extensions),
        44 => (Some("DIV_use"), Cpu),
        46 => (Some("DSP_extension"), Extensions),
        48 => (Some("MVE_arch"), Extensions),
        50 => (Some("PAC_extension"), Extensions),
        52 => (Some("BTI_extension"), Extensions),
        64 => (Some("nodefaults"), Misc),
        65 => (Some("also_compatible_with"), Misc),
        66 => (Some("T2EE_use"), Extensions),
        67 => (Some("conformance"), Misc),
        68 => (Some("Virtualization_use"), Extensions),
        70 => (Some("MPextension_use"), Extensions),
        72 => (Some("FramePointer_use"), Misc),
        74 => (Some("BTI_use"), Extensions),
        76 => (Some("PACRET_use"), Extensions),
        _ => (None, Misc),
    }
}

/// Decodes an unsigned LEB128 value, returning the value and the number
/// of bytes consumed, or `None` on truncation or overflow.
fn decode_uleb128(data: &[u8]) -> Option<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if shift >= 64 {
            return None;
        }
        let value = u64::from(byte & 0x7f);
        if shift > 0 && value > (u64::MAX >> shift) {
            return None;
        }
        result |= value << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }
    }
    None
}

fn read_u32_at(data: &[u8], at: usize, endian: Endianness) -> Option<u32> {
    let bytes: [u8; 4] = data.get(at..at + 4)?.try_into().ok()?;
    Some(match endian {
        Endianness::Little => u32::from_le_bytes(bytes),
        Endianness::Big => u32::from_be_bytes(bytes),
    })
}

fn read_ntbs(data: &[u8], at: usize) -> Option<&str> {
    let rest = data.get(at..)?;
    let nul = rest.iter().position(|&b| b == 0)?;
    std::str::from_utf8(&rest[..nul]).ok()
}

/// Parses the raw bytes of a build-attributes section.
pub fn parse_build_attributes(bytes: &[u8], endian: Endianness) -> Option<BuildAttributes> {
    if bytes.first() != Some(&FORMAT_VERSION) {
        return None;
    }

    let mut at = 1usize;
    while at < bytes.len() {
        let subsection_len = read_u32_at(bytes, at, endian)? as usize;
        let subsection_end = at.checked_add(subsection_len)?;
        if subsection_end > bytes.len() || subsection_len < 4 {
            return None;
        }
        let vendor = read_ntbs(bytes, at + 4)?;
        if vendor == AEABI_VENDOR {
            let body_start = at + 4 + vendor.len() + 1;
            return parse_file_scope(&bytes[body_start..subsection_end], endian);
        }
        at = subsection_end;
    }
    None
}

/// Walks the vendor subsection's inner blocks, decoding the file-scope
/// (tag 1) block's tag/value records.
fn parse_file_scope(body: &[u8], endian: Endianness) -> Option<BuildAttributes> {
    let mut at = 0usize;
    while at < body.len() {
        let tag = *body.get(at)?;
        let block_len = read_u32_at(body, at + 1, endian)? as usize;
        // Every block covers at least its own tag byte and length word.
        if block_len < 5 {
            return None;
        }
        if tag == TAG_FILE {
            let block_end = at.checked_add(block_len)?.min(body.len());
            return Some(BuildAttributes {
                vendor: AEABI_VENDOR.to_string(),
                entries: parse_records(&body[at + 5..block_end]),
            });
        }
        // Skip section- and symbol-scope blocks.
        at += block_len;
    }
    None
}

fn parse_records(mut records: &[u8]) -> Vec<BuildAttribute> {
    let mut entries = Vec::new();
    while !records.is_empty() {
        let Some((tag, consumed)) = decode_uleb128(records) else {
            tracing::warn!("truncated build-attribute tag, stopping");
            break;
        };
        records = &records[consumed..];

        let value = if is_string_tag(tag) {
            let Some(text) = read_ntbs(records, 0) else {
                tracing::warn!(tag, "truncated build-attribute string, stopping");
                break;
            };
            records = &records[text.len() + 1..];
            AttributeValue::Text(text.to_string())
        } else {
            let Some((number, consumed)) = decode_uleb128(records) else {
                tracing::warn!(tag, "truncated build-attribute value, stopping");
                break;
            };
            records = &records[consumed..];
            AttributeValue::Int(number)
        };

        let (name, bucket) = tag_info(tag);
        entries.push(BuildAttribute {
            tag,
            name,
            bucket,
            value,
        });
    }
    entries
}
