//! Kosinski LZSS encoders.
//!
//! Token framing: descriptor fields holding one flag bit per token,
//! refilled eagerly by the decoder the moment the last bit is consumed.
//! The classic dialect uses 16-bit little-endian fields consumed
//! LSB-first; the "plus" dialect uses 8-bit fields consumed MSB-first.
//!
//! Tokens:
//! - `1` + byte: literal.
//! - `00` + two length bits (high first, length 2-5) + byte
//!   (`0x100 - distance`, distance 1-256): inline match.
//! - `01` + two bytes packing a 13-bit `0x2000 - distance` and a 3-bit
//!   `length - 2` (length 3-9); a zero length field pulls one extra byte
//!   (`length - 1`, length 10-256, `0x00` terminates the stream).

use crate::codec::optimal::{self, CostModel};
use crate::codec::{ByteSink, CodecError, RandomAccessSink};

const WINDOW: usize = 0x2000;
const SHORT_WINDOW: usize = 0x100;
const MAX_LENGTH: usize = 0x100;

/// Streaming greedy encoder: the byte-exact framing the authentic
/// deployment shipped with, buffering each descriptor field and its data
/// bytes until the field is full.
pub fn compress_greedy<W: ByteSink + ?Sized>(data: &[u8], sink: &mut W) {
    let mut field = BitField::new(sink);
    let mut pos = 0;
    while pos < data.len() {
        let (length, distance) = find_match(data, pos);
        if (2..=5).contains(&length) && distance <= SHORT_WINDOW {
            emit_inline_match(&mut field, distance, length);
        } else if length >= 3 {
            emit_full_match(&mut field, distance, length);
        } else {
            emit_literal(&mut field, data[pos]);
            pos += 1;
            continue;
        }
        pos += length;
    }
    emit_terminator(&mut field);
    field.finish();
}

/// Optimal-parse encoder over the same token set, emitted through the
/// random-access sink with descriptor backpatching.
pub fn compress_optimal<W: RandomAccessSink + ?Sized>(
    data: &[u8],
    sink: &mut W,
) -> Result<(), CodecError> {
    compress_parsed(data, &mut BackpatchField::classic(sink))
}

/// The "plus" dialect: 8-bit MSB-first descriptors, no other changes.
pub fn compress_plus<W: RandomAccessSink + ?Sized>(
    data: &[u8],
    sink: &mut W,
) -> Result<(), CodecError> {
    compress_parsed(data, &mut BackpatchField::plus(sink))
}

fn compress_parsed<F: Field>(data: &[u8], field: &mut F) -> Result<(), CodecError> {
    let edges = optimal::parse::<KosinskiCost>(data)?;
    let mut pos = 0;
    for edge in edges {
        if edge.distance == 0 {
            emit_literal(field, data[pos]);
        } else if (2..=5).contains(&edge.length) && edge.distance <= SHORT_WINDOW {
            emit_inline_match(field, edge.distance, edge.length);
        } else {
            emit_full_match(field, edge.distance, edge.length);
        }
        pos += edge.length;
    }
    emit_terminator(field);
    field.finish();
    Ok(())
}

struct KosinskiCost;

impl CostModel for KosinskiCost {
    const MAX_DISTANCE: usize = WINDOW;
    const MAX_LENGTH: usize = MAX_LENGTH;
    const LITERAL_COST: u32 = 1 + 8;

    fn match_cost(length: usize, distance: usize) -> Option<u32> {
        if distance > WINDOW {
            None
        } else if (2..=5).contains(&length) && distance <= SHORT_WINDOW {
            Some(2 + 2 + 8)
        } else if (3..=9).contains(&length) {
            Some(2 + 16)
        } else if (10..=MAX_LENGTH).contains(&length) {
            Some(2 + 24)
        } else {
            None
        }
    }
}

fn find_match(data: &[u8], pos: usize) -> (usize, usize) {
    let limit = MAX_LENGTH.min(data.len() - pos);
    let window_start = pos.saturating_sub(WINDOW);
    let mut best = (0, 0);
    // Nearest source wins ties so short matches stay inline-encodable.
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

fn emit_literal<F: Field>(field: &mut F, byte: u8) {
    field.push_bit(true);
    field.push_byte(byte);
}

fn emit_inline_match<F: Field>(field: &mut F, distance: usize, length: usize) {
    field.push_bit(false);
    field.push_bit(false);
    let count = length - 2;
    field.push_bit(count & 2 != 0);
    field.push_bit(count & 1 != 0);
    field.push_byte((SHORT_WINDOW - distance) as u8);
}

fn emit_full_match<F: Field>(field: &mut F, distance: usize, length: usize) {
    field.push_bit(false);
    field.push_bit(true);
    let packed = WINDOW - distance;
    let low = (packed & 0xff) as u8;
    let high = ((packed >> 5) & 0xf8) as u8;
    if length <= 9 {
        field.push_byte(low);
        field.push_byte(high | (length - 2) as u8);
    } else {
        field.push_byte(low);
        field.push_byte(high);
        field.push_byte((length - 1) as u8);
    }
}

fn emit_terminator<F: Field>(field: &mut F) {
    field.push_bit(false);
    field.push_bit(true);
    field.push_byte(0x00);
    field.push_byte(0xf0);
    field.push_byte(0x00);
}

trait Field {
    fn push_bit(&mut self, bit: bool);
    fn push_byte(&mut self, byte: u8);
    fn finish(&mut self);
}

/// Buffering field writer for the streaming encoder: data bytes queue up
/// behind the 16-bit descriptor and flush the moment it fills, matching
/// the decoder's eager refill.
struct BitField<'a, W: ByteSink + ?Sized> {
    sink: &'a mut W,
    descriptor: u16,
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
        let [low, high] = self.descriptor.to_le_bytes();
        self.sink.write_byte(low);
        self.sink.write_byte(high);
        self.sink.write_bytes(&self.pending);
        self.pending.clear();
        self.descriptor = 0;
        self.bits = 0;
    }
}

impl<W: ByteSink + ?Sized> Field for BitField<'_, W> {
    fn push_bit(&mut self, bit: bool) {
        if bit {
            self.descriptor |= 1 << self.bits;
        }
        self.bits += 1;
        if self.bits == 16 {
            self.flush();
        }
    }

    fn push_byte(&mut self, byte: u8) {
        self.pending.push(byte);
    }

    fn finish(&mut self) {
        if self.bits > 0 || !self.pending.is_empty() {
            self.flush();
        }
    }
}

/// Random-access field writer: reserves each descriptor in place and
/// patches it once full, reserving the next one immediately so the
/// decoder's eager refill lands on it.
struct BackpatchField<'a, W: RandomAccessSink + ?Sized> {
    sink: &'a mut W,
    descriptor: u16,
    bits: u32,
    width: u32,
    msb_first: bool,
    descriptor_pos: u64,
}

impl<'a, W: RandomAccessSink + ?Sized> BackpatchField<'a, W> {
    fn classic(sink: &'a mut W) -> Self {
        Self::new(sink, 16, false)
    }

    fn plus(sink: &'a mut W) -> Self {
        Self::new(sink, 8, true)
    }

    fn new(sink: &'a mut W, width: u32, msb_first: bool) -> Self {
        let descriptor_pos = sink.tell();
        for _ in 0..width / 8 {
            sink.write_byte(0);
        }
        Self {
            sink,
            descriptor: 0,
            bits: 0,
            width,
            msb_first,
            descriptor_pos,
        }
    }

    fn patch(&mut self) {
        let here = self.sink.tell();
        self.sink.seek(self.descriptor_pos);
        if self.width == 16 {
            self.sink.write_bytes(&self.descriptor.to_le_bytes());
        } else {
            self.sink.write_byte(self.descriptor as u8);
        }
        self.sink.seek(here);
        self.descriptor = 0;
        self.bits = 0;
    }
}

impl<W: RandomAccessSink + ?Sized> Field for BackpatchField<'_, W> {
    fn push_bit(&mut self, bit: bool) {
        if bit {
            let shift = if self.msb_first {
                self.width - 1 - self.bits
            } else {
                self.bits
            };
            self.descriptor |= 1 << shift;
        }
        self.bits += 1;
        if self.bits == self.width {
            self.patch();
            self.descriptor_pos = self.sink.tell();
            for _ in 0..self.width / 8 {
                self.sink.write_byte(0);
            }
        }
    }

    fn push_byte(&mut self, byte: u8) {
        self.sink.write_byte(byte);
    }

    fn finish(&mut self) {
        if self.bits > 0 {
            self.patch();
        }
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

    /// Reference decoder for both dialects, refilling eagerly like the
    /// hardware decompressor.
    struct BitReader<'a> {
        data: &'a [u8],
        pos: usize,
        descriptor: u16,
        consumed: u32,
        width: u32,
        msb_first: bool,
    }

    impl<'a> BitReader<'a> {
        fn new(data: &'a [u8], width: u32, msb_first: bool) -> Self {
            let mut reader = Self {
                data,
                pos: 0,
                descriptor: 0,
                consumed: 0,
                width,
                msb_first,
            };
            reader.refill();
            reader
        }

        fn refill(&mut self) {
            self.descriptor = if self.width == 16 {
                let value = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
                self.pos += 2;
                value
            } else {
                let value = u16::from(self.data[self.pos]);
                self.pos += 1;
                value
            };
            self.consumed = 0;
        }

        fn bit(&mut self) -> bool {
            let shift = if self.msb_first {
                self.width - 1 - self.consumed
            } else {
                self.consumed
            };
            let bit = self.descriptor >> shift & 1 != 0;
            self.consumed += 1;
            if self.consumed == self.width {
                self.refill();
            }
            bit
        }

        fn byte(&mut self) -> u8 {
            let byte = self.data[self.pos];
            self.pos += 1;
            byte
        }
    }

    fn decode(data: &[u8], width: u32, msb_first: bool) -> Vec<u8> {
        let mut reader = BitReader::new(data, width, msb_first);
        let mut out = Vec::new();
        loop {
            if reader.bit() {
                let byte = reader.byte();
                out.push(byte);
                continue;
            }
            let (distance, count) = if reader.bit() {
                let low = usize::from(reader.byte());
                let high = usize::from(reader.byte());
                let packed = (high & 0xf8) << 5 | low;
                let distance = WINDOW - packed;
                let count = match high & 7 {
                    0 => {
                        let extra = usize::from(reader.byte());
                        match extra {
                            0 => break,
                            1 => continue,
                            _ => extra + 1,
                        }
                    }
                    bits => bits + 2,
                };
                (distance, count)
            } else {
                let mut count = 0;
                count |= usize::from(reader.bit()) << 1;
                count |= usize::from(reader.bit());
                let distance = SHORT_WINDOW - usize::from(reader.byte());
                (distance, count + 2)
            };
            for _ in 0..count {
                let byte = out[out.len() - distance];
                out.push(byte);
            }
        }
        out
    }

    fn samples() -> Vec<Vec<u8>> {
        let mut long_run = vec![0u8; 600];
        long_run.extend_from_slice(b"tail");
        vec![
            Vec::new(),
            b"a".to_vec(),
            b"abcabcabcabcabc".to_vec(),
            b"mississippi mississippi".to_vec(),
            (0u8..=255).collect(),
            long_run,
            b"aaaaabbbbbaaaaabbbbbaaaaabbbbb".to_vec(),
        ]
    }

    #[test]
    fn greedy_round_trips() {
        for sample in samples() {
            let mut sink = VecSink::default();
            compress_greedy(&sample, &mut sink);
            assert_eq!(decode(&sink.bytes, 16, false), sample);
        }
    }

    #[test]
    fn optimal_round_trips() {
        for sample in samples() {
            let mut sink = VecSink::default();
            compress_optimal(&sample, &mut sink).expect("compress");
            assert_eq!(decode(&sink.bytes, 16, false), sample);
        }
    }

    #[test]
    fn plus_round_trips() {
        for sample in samples() {
            let mut sink = VecSink::default();
            compress_plus(&sample, &mut sink).expect("compress");
            assert_eq!(decode(&sink.bytes, 8, true), sample);
        }
    }

    #[test]
    fn optimal_is_no_larger_than_greedy() {
        for sample in samples() {
            let mut greedy = VecSink::default();
            compress_greedy(&sample, &mut greedy);
            let mut optimal = VecSink::default();
            compress_optimal(&sample, &mut optimal).expect("compress");
            // Up to one trailing reserved descriptor plus field rounding.
            assert!(
                optimal.bytes.len() <= greedy.bytes.len() + 4,
                "optimal {} vs greedy {}",
                optimal.bytes.len(),
                greedy.bytes.len()
            );
        }
    }

    #[test]
    fn empty_input_is_just_a_terminator_field() {
        let mut sink = VecSink::default();
        compress_greedy(&[], &mut sink);
        // Descriptor word plus the three terminator bytes.
        assert_eq!(sink.bytes, [0x02, 0x00, 0x00, 0xf0, 0x00]);
    }
}
