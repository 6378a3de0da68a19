use thiserror::Error;

use crate::codec::CodecKind;

/// Capacity of the compressible-run buffer: the auxiliary Z80's address
/// space ends at 0x2000.
pub const DEFAULT_RUN_CAPACITY: usize = 0x2000;

/// Label the implicit compatibility-mode region reports under.
pub const DEFAULT_REGION_LABEL: &str = "comp_z80_size";

/// Where a flushed run's compressed output is placed relative to the
/// surrounding verbatim segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Rewind to the previous verbatim segment's start and compress over it.
    Before,
    /// Write at the current cursor, into the gap reserved after it.
    After,
}

impl OverlapPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "before" => Some(OverlapPolicy::Before),
            "after" => Some(OverlapPolicy::After),
            _ => None,
        }
    }
}

/// Whether compressed output exceeding its reserved space aborts the
/// conversion or is emitted anyway with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    Strict,
    Permissive,
}

/// One registered compressible region: segments of the auxiliary family
/// starting at `trigger_address` open a run compressed with `codec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressibleRegionSpec {
    pub trigger_address: u32,
    pub codec: CodecKind,
    pub label: String,
    pub overlap: OverlapPolicy,
}

impl CompressibleRegionSpec {
    /// The compatibility-mode singleton: any auxiliary segment at address
    /// zero opens the one implicit region.
    pub fn implicit(codec: CodecKind) -> Self {
        Self {
            trigger_address: 0,
            codec,
            label: DEFAULT_REGION_LABEL.to_string(),
            overlap: OverlapPolicy::After,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("expected ADDRESS,CODEC,LABEL,OVERLAP but got {0} field(s)")]
    WrongFieldCount(usize),
    #[error("invalid trigger address '{0}'")]
    BadAddress(String),
    #[error("unrecognised codec name '{0}'")]
    BadCodec(String),
    #[error("region label must not be empty")]
    EmptyLabel,
    #[error("unrecognised overlap type '{0}' (expected 'before' or 'after')")]
    BadOverlap(String),
}

/// Parses one `ADDRESS,CODEC,LABEL,OVERLAP` region directive.
pub fn parse_region_directive(input: &str) -> Result<CompressibleRegionSpec, DirectiveError> {
    let fields = input.split(',').collect::<Vec<_>>();
    if fields.len() != 4 {
        return Err(DirectiveError::WrongFieldCount(fields.len()));
    }
    let trigger_address = parse_u32_with_hex(fields[0])
        .map_err(|_| DirectiveError::BadAddress(fields[0].to_string()))?;
    let codec = CodecKind::from_name(fields[1].trim())
        .ok_or_else(|| DirectiveError::BadCodec(fields[1].to_string()))?;
    let label = fields[2].trim();
    if label.is_empty() {
        return Err(DirectiveError::EmptyLabel);
    }
    let overlap = OverlapPolicy::from_name(fields[3].trim())
        .ok_or_else(|| DirectiveError::BadOverlap(fields[3].to_string()))?;
    Ok(CompressibleRegionSpec {
        trigger_address,
        codec,
        label: label.to_string(),
        overlap,
    })
}

/// Parses a batch of directives. A malformed directive is skipped and
/// reported back, never substituted with a default; the rest of the
/// configuration is unaffected.
pub fn parse_region_directives(
    inputs: &[String],
) -> (Vec<CompressibleRegionSpec>, Vec<(String, DirectiveError)>) {
    let mut specs = Vec::new();
    let mut rejected = Vec::new();
    for input in inputs {
        match parse_region_directive(input) {
            Ok(spec) => specs.push(spec),
            Err(err) => rejected.push((input.clone(), err)),
        }
    }
    (specs, rejected)
}

pub fn parse_u32_with_hex(input: &str) -> Result<u32, String> {
    let s = input.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex value '{input}': {e}"))
    } else {
        s.parse::<u32>()
            .map_err(|e| format!("invalid decimal value '{input}': {e}"))
    }
}

pub fn parse_u8_with_hex(input: &str) -> Result<u8, String> {
    let value = parse_u32_with_hex(input)?;
    u8::try_from(value).map_err(|_| format!("value '{input}' does not fit in a byte"))
}
