use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid header magic {0:#06x} - input is not a valid code file (expected 0x8914)")]
    BadMagic(u16),
    #[error("input ended prematurely while reading the record stream")]
    UnexpectedEof,
    #[error("unrecognised record header value {0:#04x}")]
    UnrecognisedRecord(u8),
    #[error("unsupported segment granularity {0} (only 1 is supported)")]
    UnsupportedGranularity(u8),
}

pub mod record;
