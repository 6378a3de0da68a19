use clap::Parser;

use crate::codec::CodecKind;
use crate::config::parse_u8_with_hex;
use crate::feedback::SinkMode;

fn parse_codec(input: &str) -> Result<CodecKind, String> {
    CodecKind::from_name(input.trim())
        .ok_or_else(|| format!("unrecognised codec name '{input}'"))
}

fn parse_sink_mode(input: &str) -> Result<SinkMode, String> {
    SinkMode::from_name(input.trim())
        .ok_or_else(|| format!("unrecognised sink mode '{input}' (expected 'overwrite' or 'update')"))
}

#[derive(Debug, Parser)]
#[command(name = "p2bin", version)]
pub struct Args {
    #[arg(value_name = "INPUT")]
    pub input: String,

    #[arg(value_name = "OUTPUT")]
    pub output: String,

    /// Size-feedback file receiving one "<label> 0x<HEX> " token per
    /// compressed region, for a later patch pass.
    #[arg(value_name = "SIZE_FILE")]
    pub size_file: Option<String>,

    /// Fill byte for gaps between segments.
    #[arg(short = 'p', long = "padding", value_parser = parse_u8_with_hex, default_value = "0xFF")]
    pub padding: u8,

    /// Registers a compressible region. Repeatable.
    #[arg(short = 'r', long = "region", value_name = "ADDR,CODEC,LABEL,OVERLAP")]
    pub regions: Vec<String>,

    /// Codec for the implicit region used when no --region is given.
    #[arg(long = "codec", value_parser = parse_codec, default_value = "kosinski")]
    pub codec: CodecKind,

    /// Emit oversized compressed output with a warning instead of aborting.
    #[arg(long = "permissive")]
    pub permissive: bool,

    #[arg(long = "sink-mode", value_parser = parse_sink_mode, default_value = "overwrite")]
    pub sink_mode: SinkMode,

    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,
}
