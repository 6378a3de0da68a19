use std::fs;
use std::path::Path;

use anyhow::Context;
use thiserror::Error;

use crate::cli::Args;
use crate::codec::{CodecError, CodecKind};
use crate::config::{
    parse_region_directives, CompressibleRegionSpec, OverflowPolicy, DEFAULT_RUN_CAPACITY,
};
use crate::feedback::{FileSink, NullSink, ReportSink};
use crate::format::record::{Record, RecordStream, Z80_FAMILY};
use crate::format::FormatError;
use crate::image::OutputImage;
use crate::router::Converter;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("'{label}' segment ends at {end:#x}, past the {capacity:#x}-byte run buffer")]
    RunCapacityExceeded {
        label: String,
        end: u64,
        capacity: usize,
    },
    #[error(
        "compressed '{label}' data ends at {output_end:#x} but the next segment starts at {next_start:#x}"
    )]
    ReservedSpaceExceeded {
        label: String,
        next_start: u64,
        output_end: u64,
    },
    #[error(
        "compressed '{label}' data ({compressed_size:#x} bytes) exceeds the {reserved:#x} bytes it overlaps"
    )]
    OverlapExceeded {
        label: String,
        compressed_size: u64,
        reserved: u64,
    },
    #[error("region '{label}' overlaps backwards but no verbatim segment precedes it")]
    NoOverlapTarget { label: String },
    #[error("failed to write the size-feedback file")]
    Report(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub padding: u8,
    pub regions: Vec<CompressibleRegionSpec>,
    pub overflow: OverflowPolicy,
    pub aux_family: u8,
    pub run_capacity: usize,
    pub verbose: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            padding: 0x00,
            regions: vec![CompressibleRegionSpec::implicit(
                CodecKind::KosinskiAuthentic,
            )],
            overflow: OverflowPolicy::Strict,
            aux_family: Z80_FAMILY,
            run_capacity: DEFAULT_RUN_CAPACITY,
            verbose: false,
        }
    }
}

/// Converts one code file into a flat binary image.
///
/// # Errors
/// Any fatal condition (malformed input, run-buffer
/// overflow, codec failure, a strict-policy reserved-space overflow)
/// aborts the whole conversion; no partial image is returned.
pub fn convert(
    input: &[u8],
    options: &ConvertOptions,
    sink: &mut dyn ReportSink,
) -> Result<Vec<u8>, ConvertError> {
    let mut stream = RecordStream::new(input)?;
    let mut converter = Converter::new(
        OutputImage::new(options.padding),
        options.regions.clone(),
        options.aux_family,
        options.run_capacity,
        options.overflow,
        options.verbose,
        sink,
    );
    loop {
        match stream.next_record()? {
            Record::EndOfStream => break,
            Record::EntryPoint { .. } => {}
            Record::Segment(segment) => converter.route(segment)?,
        }
    }
    converter.finish()
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let input = fs::read(&args.input)
        .with_context(|| format!("could not open input file '{}' for reading", args.input))?;

    let (mut regions, rejected) = parse_region_directives(&args.regions);
    for (directive, err) in &rejected {
        eprintln!("Warning: skipping region directive '{directive}': {err}");
    }
    if args.regions.is_empty() {
        // Compatibility mode: one implicit region triggered at address 0.
        regions = vec![CompressibleRegionSpec::implicit(args.codec)];
    }

    let options = ConvertOptions {
        padding: args.padding,
        regions,
        overflow: if args.permissive {
            OverflowPolicy::Permissive
        } else {
            OverflowPolicy::Strict
        },
        verbose: args.verbose,
        ..ConvertOptions::default()
    };

    let mut sink: Box<dyn ReportSink> = match &args.size_file {
        Some(path) => Box::new(
            FileSink::create(Path::new(path), args.sink_mode)
                .with_context(|| format!("could not open size-feedback file '{path}'"))?,
        ),
        None => Box::new(NullSink),
    };

    match convert(&input, &options, sink.as_mut()) {
        Ok(payload) => {
            fs::write(&args.output, payload)
                .with_context(|| format!("failed to write '{}'", args.output))?;
            if args.verbose {
                println!("wrote output: {}", args.output);
            }
            Ok(())
        }
        Err(err) => {
            // Build tooling detects failure from the artifacts' absence.
            // The size file was truncated on open and may hold reports
            // from flushes that preceded the failure.
            let _ = fs::remove_file(&args.output);
            if let Some(path) = &args.size_file {
                let _ = fs::remove_file(path);
            }
            Err(err.into())
        }
    }
}
