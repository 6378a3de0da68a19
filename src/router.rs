use crate::codec::{self, CompressionOutcome, SliceSource};
use crate::config::{CompressibleRegionSpec, OverflowPolicy, OverlapPolicy};
use crate::convert::ConvertError;
use crate::feedback::ReportSink;
use crate::format::record::Segment;
use crate::image::{OutputImage, PlainSegment};

/// A run of contiguous auxiliary segments accumulating ahead of one codec
/// flush. At most one is open at a time.
struct CompressibleRun {
    region: CompressibleRegionSpec,
    buffer: Vec<u8>,
    expected_next_address: u32,
}

/// Reserved-space watch armed by an `After`-policy flush; checked against
/// the next verbatim segment.
struct ReservedSpaceGuard {
    label: String,
    output_end: u64,
}

/// Routes each segment either into the open compressible run or verbatim
/// into the output image, flushing runs through the codec dispatcher at
/// every boundary.
pub struct Converter<'a> {
    image: OutputImage,
    regions: Vec<CompressibleRegionSpec>,
    aux_family: u8,
    run_capacity: usize,
    overflow: OverflowPolicy,
    verbose: bool,
    sink: &'a mut dyn ReportSink,
    run: Option<CompressibleRun>,
    guard: Option<ReservedSpaceGuard>,
    last_plain: Option<PlainSegment>,
}

impl<'a> Converter<'a> {
    pub fn new(
        image: OutputImage,
        regions: Vec<CompressibleRegionSpec>,
        aux_family: u8,
        run_capacity: usize,
        overflow: OverflowPolicy,
        verbose: bool,
        sink: &'a mut dyn ReportSink,
    ) -> Self {
        Self {
            image,
            regions,
            aux_family,
            run_capacity,
            overflow,
            verbose,
            sink,
            run: None,
            guard: None,
            last_plain: None,
        }
    }

    pub fn route(&mut self, segment: Segment<'_>) -> Result<(), ConvertError> {
        if segment.processor_family == self.aux_family {
            let capacity = self.run_capacity;
            if let Some(run) = self
                .run
                .as_mut()
                .filter(|run| segment.start_address == run.expected_next_address)
            {
                return append_to_run(run, capacity, segment);
            }
            if let Some(region) = self.matching_region(segment.start_address) {
                // A non-contiguous trigger closes the old run first.
                self.flush()?;
                let run = self.run.insert(CompressibleRun {
                    region,
                    buffer: Vec::new(),
                    expected_next_address: segment.start_address,
                });
                return append_to_run(run, capacity, segment);
            }
        }
        self.flush()?;
        self.check_reserved_space(segment.start_address)?;
        self.image.write_verbatim(segment.start_address, segment.data);
        self.last_plain = Some(PlainSegment {
            start_address: segment.start_address,
            length: segment.data.len(),
        });
        Ok(())
    }

    /// Flushes any open run and hands the finished image back.
    pub fn finish(mut self) -> Result<Vec<u8>, ConvertError> {
        self.flush()?;
        Ok(self.image.into_bytes())
    }

    fn matching_region(&self, start_address: u32) -> Option<CompressibleRegionSpec> {
        self.regions
            .iter()
            .find(|region| region.trigger_address == start_address)
            .cloned()
    }

    /// Flushes the open run, if any, through its codec. A missing run is
    /// a no-op with a zero-sized outcome.
    fn flush(&mut self) -> Result<CompressionOutcome, ConvertError> {
        let Some(run) = self.run.take() else {
            return Ok(CompressionOutcome::default());
        };

        let overlapped = match run.region.overlap {
            OverlapPolicy::After => None,
            OverlapPolicy::Before => {
                let plain = self.last_plain.ok_or_else(|| ConvertError::NoOverlapTarget {
                    label: run.region.label.clone(),
                })?;
                self.image.set_position(u64::from(plain.start_address));
                Some(plain)
            }
        };

        let output_start = self.image.position();
        let mut source = SliceSource::new(&run.buffer);
        codec::compress_into(run.region.codec, &mut source, &mut self.image)?;
        let output_end = self.image.position();
        let outcome = CompressionOutcome {
            compressed_size: output_end - output_start,
            output_start,
            output_end,
        };

        if self.verbose {
            println!(
                "{}: {} {:#x} -> {:#x} bytes at {:#x}",
                run.region.label,
                run.region.codec.name(),
                run.buffer.len(),
                outcome.compressed_size,
                outcome.output_start,
            );
        }

        match overlapped {
            Some(plain) => {
                if outcome.compressed_size > plain.length as u64 {
                    self.overflowed(ConvertError::OverlapExceeded {
                        label: run.region.label.clone(),
                        compressed_size: outcome.compressed_size,
                        reserved: plain.length as u64,
                    })?;
                }
            }
            None => {
                self.guard = Some(ReservedSpaceGuard {
                    label: run.region.label.clone(),
                    output_end: outcome.output_end,
                });
            }
        }

        self.sink.report(&run.region.label, outcome.compressed_size)?;
        Ok(outcome)
    }

    fn check_reserved_space(&mut self, next_start: u32) -> Result<(), ConvertError> {
        let Some(guard) = self.guard.take() else {
            return Ok(());
        };
        if u64::from(next_start) < guard.output_end {
            self.overflowed(ConvertError::ReservedSpaceExceeded {
                label: guard.label,
                next_start: u64::from(next_start),
                output_end: guard.output_end,
            })?;
        }
        Ok(())
    }

    fn overflowed(&self, error: ConvertError) -> Result<(), ConvertError> {
        match self.overflow {
            OverflowPolicy::Strict => Err(error),
            OverflowPolicy::Permissive => {
                eprintln!("Warning: {error}");
                Ok(())
            }
        }
    }
}

fn append_to_run(
    run: &mut CompressibleRun,
    capacity: usize,
    segment: Segment<'_>,
) -> Result<(), ConvertError> {
    let end = run.buffer.len() + segment.data.len();
    if end > capacity {
        return Err(ConvertError::RunCapacityExceeded {
            label: run.region.label.clone(),
            end: u64::from(run.region.trigger_address) + end as u64,
            capacity,
        });
    }
    run.buffer.extend_from_slice(segment.data);
    run.expected_next_address = segment
        .start_address
        .wrapping_add(segment.data.len() as u32);
    Ok(())
}
