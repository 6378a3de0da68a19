use thiserror::Error;

pub mod kosinski;
mod optimal;
pub mod saxman;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("codec backend could not obtain working memory")]
    OutOfMemory,
}

/// Byte-pull side of the codec capability surface.
pub trait ByteSource {
    fn read_byte(&mut self) -> Option<u8>;
}

/// Byte-push side of the codec capability surface.
pub trait ByteSink {
    fn write_byte(&mut self, byte: u8);

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }
}

/// Random access required by the optimal-parsing backends, which revisit
/// already-written descriptor bytes.
pub trait RandomAccessSink: ByteSink {
    fn seek(&mut self, pos: u64);
    fn tell(&self) -> u64;
}

pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl ByteSource for SliceSource<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        byte
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Uncompressed,
    KosinskiAuthentic,
    KosinskiOptimal,
    KosinskiPlus,
    SaxmanAuthentic,
    SaxmanOptimal,
}

impl CodecKind {
    pub fn name(self) -> &'static str {
        match self {
            CodecKind::Uncompressed => "uncompressed",
            CodecKind::KosinskiAuthentic => "kosinski",
            CodecKind::KosinskiOptimal => "kosinski-optimal",
            CodecKind::KosinskiPlus => "kosinski-plus",
            CodecKind::SaxmanAuthentic => "saxman",
            CodecKind::SaxmanOptimal => "saxman-optimal",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "uncompressed" => Some(CodecKind::Uncompressed),
            "kosinski" => Some(CodecKind::KosinskiAuthentic),
            "kosinski-optimal" => Some(CodecKind::KosinskiOptimal),
            "kosinski-plus" => Some(CodecKind::KosinskiPlus),
            "saxman" => Some(CodecKind::SaxmanAuthentic),
            "saxman-optimal" => Some(CodecKind::SaxmanOptimal),
            _ => None,
        }
    }
}

/// Measured span of one flushed compressible run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionOutcome {
    pub compressed_size: u64,
    pub output_start: u64,
    pub output_end: u64,
}

/// The consuming runtime transfers the authentic Kosinski stream in
/// 16-byte units, so its output is zero-padded to that granularity.
const KOSINSKI_DMA_ALIGNMENT: u64 = 16;

/// Trailing byte legacy Saxman assets carry after the encoder's own
/// output. It has no decoding significance.
pub const SAXMAN_TERMINATOR: u8 = b'N';

/// Runs `source` through the selected backend, writing at the sink's
/// current position. The caller measures the span via `tell`.
pub fn compress_into<W: RandomAccessSink>(
    kind: CodecKind,
    source: &mut dyn ByteSource,
    sink: &mut W,
) -> Result<(), CodecError> {
    let data = drain(source)?;
    match kind {
        CodecKind::Uncompressed => sink.write_bytes(&data),
        CodecKind::KosinskiAuthentic => {
            let start = sink.tell();
            kosinski::compress_greedy(&data, sink);
            while (sink.tell() - start) % KOSINSKI_DMA_ALIGNMENT != 0 {
                sink.write_byte(0);
            }
        }
        CodecKind::KosinskiOptimal => kosinski::compress_optimal(&data, sink)?,
        CodecKind::KosinskiPlus => kosinski::compress_plus(&data, sink)?,
        CodecKind::SaxmanAuthentic => {
            saxman::compress_greedy(&data, sink);
            sink.write_byte(SAXMAN_TERMINATOR);
        }
        CodecKind::SaxmanOptimal => {
            saxman::compress_optimal(&data, sink)?;
            sink.write_byte(SAXMAN_TERMINATOR);
        }
    }
    Ok(())
}

fn drain(source: &mut dyn ByteSource) -> Result<Vec<u8>, CodecError> {
    let mut data = Vec::new();
    while let Some(byte) = source.read_byte() {
        if data.len() == data.capacity() {
            data.try_reserve(data.len().max(64))
                .map_err(|_| CodecError::OutOfMemory)?;
        }
        data.push(byte);
    }
    Ok(data)
}
