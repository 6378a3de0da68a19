//! Saxman LZSS encoders.
//!
//! Token framing: 8-bit descriptor bytes consumed LSB-first, refilled
//! lazily (the decoder pulls the next descriptor only when it needs a
//! flag bit). Each token spends exactly one flag bit:
//! - `1` + byte: literal.
//! - `0` + two bytes: match of length 3-18 within a 0x1000-byte window.
//!   The bytes pack a 12-bit window base, stored as
//!   `(source - 0x12) & 0xFFF`, and the length minus 3 in the second
//!   byte's low nibble.
//!
//! There is no in-stream terminator; the stream is size-bounded. Bases
//! that resolve ahead of the decode cursor are zero fill, a quirk the
//! encoders here never emit.

use crate::codec::optimal::{self, CostModel};
use crate::codec::{ByteSink, CodecError, RandomAccessSink};

const WINDOW: usize = 0x1000;
const MAX_LENGTH: usize = 18;
const MIN_LENGTH: usize = 3;
const BASE_BIAS: usize = 0x12;

/// Streaming greedy encoder.
pub fn compress_greedy<W: ByteSink + ?Sized>(data: &[u8], sink: &mut W) {
    let mut field = BitField::new(sink);
    let mut pos = 0;
    while pos < data.len() {
        let (length, distance) = find_match(data, pos);
        if length >= MIN_LENGTH {
            emit_match(&mut field, pos - distance, length);
            pos += length;
        } else {
            emit_literal(&mut field, data[pos]);
            pos += 1;
        }
    }
    field.finish();
}

/// Optimal-parse encoder, emitted through the random-access sink with
/// descriptor backpatching.
pub fn compress_optimal<W: RandomAccessSink + ?Sized>(
    data: &[u8],
    sink: &mut W,
) -> Result<(), CodecError> {
    let edges = optimal::parse::<SaxmanCost>(data)?;
    let mut field = BackpatchField::new(sink);
    let mut pos = 0;
    for edge in edges {
        if edge.distance == 0 {
            emit_literal(&mut field, data[pos]);
        } else {
            emit_match(&mut field, pos - edge.distance, edge.length);
        }
        pos += edge.length;
    }
    field.finish();
    Ok(())
}

struct SaxmanCost;

impl CostModel for SaxmanCost {
    const MAX_DISTANCE: usize = WINDOW;
    const MAX_LENGTH: usize = MAX_LENGTH;
    const LITERAL_COST: u32 = 1 + 8;

    fn match_cost(length: usize, distance: usize) -> Option<u32> {
        ((MIN_LENGTH..=MAX_LENGTH).contains(&length) && distance <= WINDOW).then_some(1 + 16)
    }
}

fn find_match(data: &[u8], pos: usize) -> (usize, usize) {
    let limit = MAX_LENGTH.min(data.len() - pos);
    let window_start = pos.saturating_sub(WINDOW);
    let mut best = (0, 0);
    for src in (window_start..pos).rev() {
        if data[src] != data[pos] {
            continue;
        }
        let mut length = 1;
        while length < limit && data[src + length] == data[pos + length] {
            length += 1;
        }
        if length > best.0 {
            best = (length, pos - src);
            if length == limit {
                break;
            }
        }
    }
    best
}

trait Field {
    fn push_bit(&mut self, bit: bool);
    fn push_byte(&mut self, byte: u8);
}

fn emit_literal<F: Field>(field: &mut F, byte: u8) {
    field.push_bit(true);
    field.push_byte(byte);
}

fn emit_match<F: Field>(field: &mut F, source: usize, length: usize) {
    field.push_bit(false);
    let base = source.wrapping_sub(BASE_BIAS) & 0xfff;
    field.push_byte((base & 0xff) as u8);
    field.push_byte(((base >> 4) & 0xf0) as u8 | (length - MIN_LENGTH) as u8);
}

/// Buffering field writer: the descriptor byte and its data bytes flush
/// together when the next field opens, matching the decoder's lazy
/// refill.
struct BitField<'a, W: ByteSink + ?Sized> {
    sink: &'a mut W,
    descriptor: u8,
    bits: u32,
    pending: Vec<u8>,
}

impl<'a, W: ByteSink + ?Sized> BitField<'a, W> {
    fn new(sink: &'a mut W) -> Self {
        Self {
            sink,
            descriptor: 0,
            bits: 0,
            pending: Vec::new(),
        }
    }

    fn flush(&mut self) {
        self.sink.write_byte(self.descriptor);
        self.sink.write_bytes(&self.pending);
        self.pending.clear();
        self.descriptor = 0;
        self.bits = 0;
    }

    fn finish(&mut self) {
        if self.bits > 0 {
            self.flush();
        }
    }
}

impl<W: ByteSink + ?Sized> Field for BitField<'_, W> {
    fn push_bit(&mut self, bit: bool) {
        if self.bits == 8 {
            self.flush();
        }
        if bit {
            self.descriptor |= 1 << self.bits;
        }
        self.bits += 1;
    }

    fn push_byte(&mut self, byte: u8) {
        self.pending.push(byte);
    }
}

/// Random-access field writer: reserves the descriptor byte when a field
/// opens and patches it once the field is complete.
struct BackpatchField<'a, W: RandomAccessSink + ?Sized> {
    sink: &'a mut W,
    descriptor: u8,
    bits: u32,
    descriptor_pos: u64,
}

impl<'a, W: RandomAccessSink + ?Sized> BackpatchField<'a, W> {
    fn new(sink: &'a mut W) -> Self {
        Self {
            sink,
            descriptor: 0,
            bits: 0,
            descriptor_pos: 0,
        }
    }

    fn patch(&mut self) {
        let here = self.sink.tell();
        self.sink.seek(self.descriptor_pos);
        self.sink.write_byte(self.descriptor);
        self.sink.seek(here);
        self.descriptor = 0;
        self.bits = 0;
    }

    fn finish(&mut self) {
        if self.bits > 0 {
            self.patch();
        }
    }
}

impl<W: RandomAccessSink + ?Sized> Field for BackpatchField<'_, W> {
    fn push_bit(&mut self, bit: bool) {
        if self.bits == 8 {
            self.patch();
        }
        if self.bits == 0 {
            self.descriptor_pos = self.sink.tell();
            self.sink.write_byte(0);
        }
        if bit {
            self.descriptor |= 1 << self.bits;
        }
        self.bits += 1;
    }

    fn push_byte(&mut self, byte: u8) {
        self.sink.write_byte(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct VecSink {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl ByteSink for VecSink {
        fn write_byte(&mut self, byte: u8) {
            if self.pos < self.bytes.len() {
                self.bytes[self.pos] = byte;
            } else {
                self.bytes.push(byte);
            }
            self.pos += 1;
        }
    }

    impl RandomAccessSink for VecSink {
        fn seek(&mut self, pos: u64) {
            self.pos = pos as usize;
        }

        fn tell(&self) -> u64 {
            self.pos as u64
        }
    }

    /// Reference decoder with lazy descriptor refill; runs until the
    /// compressed stream is exhausted.
    fn decode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut pos = 0;
        let mut descriptor = 0u8;
        let mut bits = 0u32;
        loop {
            if bits == 0 {
                if pos >= data.len() {
                    break;
                }
                descriptor = data[pos];
                pos += 1;
                bits = 8;
            }
            let literal = descriptor & 1 != 0;
            descriptor >>= 1;
            bits -= 1;
            if literal {
                if pos >= data.len() {
                    break;
                }
                out.push(data[pos]);
                pos += 1;
                continue;
            }
            if pos + 2 > data.len() {
                break;
            }
            let low = usize::from(data[pos]);
            let high = usize::from(data[pos + 1]);
            pos += 2;
            let base = (high & 0xf0) << 4 | low;
            let count = (high & 0x0f) + MIN_LENGTH;
            let raw = (base + BASE_BIAS) & 0xfff;
            let mut src = (out.len() & !0xfff) | raw;
            if src >= out.len() {
                src = src.wrapping_sub(WINDOW);
            }
            if src >= out.len() {
                // Bases resolving ahead of the cursor are zero fill.
                out.extend(std::iter::repeat(0).take(count));
            } else {
                for offset in 0..count {
                    let byte = out[src + offset];
                    out.push(byte);
                }
            }
        }
        out
    }

    fn samples() -> Vec<Vec<u8>> {
        let mut long_run = vec![0x11u8; 5000];
        long_run.extend_from_slice(b"far away far away");
        vec![
            Vec::new(),
            b"z".to_vec(),
            b"driver driver driver".to_vec(),
            (0u8..=255).collect(),
            long_run,
            b"totototototototototo".to_vec(),
        ]
    }

    #[test]
    fn greedy_round_trips() {
        for sample in samples() {
            let mut sink = VecSink::default();
            compress_greedy(&sample, &mut sink);
            assert_eq!(decode(&sink.bytes), sample);
        }
    }

    #[test]
    fn optimal_round_trips() {
        for sample in samples() {
            let mut sink = VecSink::default();
            compress_optimal(&sample, &mut sink).expect("compress");
            assert_eq!(decode(&sink.bytes), sample);
        }
    }

    #[test]
    fn optimal_is_no_larger_than_greedy() {
        for sample in samples() {
            let mut greedy = VecSink::default();
            compress_greedy(&sample, &mut greedy);
            let mut optimal = VecSink::default();
            compress_optimal(&sample, &mut optimal).expect("compress");
            assert!(optimal.bytes.len() <= greedy.bytes.len());
        }
    }

    #[test]
    fn empty_input_produces_an_empty_stream() {
        let mut sink = VecSink::default();
        compress_greedy(&[], &mut sink);
        assert!(sink.bytes.is_empty());
    }

    #[test]
    fn match_beyond_its_own_start_copies_forward() {
        // A 16-byte run compresses to a literal plus one overlapping
        // match that reads bytes it has just written.
        let sample = vec![0xaau8; 16];
        let mut sink = VecSink::default();
        compress_greedy(&sample, &mut sink);
        assert_eq!(decode(&sink.bytes), sample);
        assert!(sink.bytes.len() < sample.len());
    }
}
