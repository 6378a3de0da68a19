use crate::codec::{ByteSink, RandomAccessSink};

/// The most recent verbatim segment written to the image. `Before`-policy
/// runs rewind to its start address before compressing over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainSegment {
    pub start_address: u32,
    pub length: usize,
}

/// Flat binary image under construction.
///
/// The payload length doubles as the high-water mark: it only ever grows,
/// and writes below it overwrite in place. Gaps opened by a forward
/// verbatim write are filled with the configured padding byte.
#[derive(Debug)]
pub struct OutputImage {
    bytes: Vec<u8>,
    cursor: usize,
    padding: u8,
}

impl OutputImage {
    pub fn new(padding: u8) -> Self {
        Self {
            bytes: Vec::new(),
            cursor: 0,
            padding,
        }
    }

    /// Greatest address ever written, monotonically non-decreasing.
    pub fn high_water_mark(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn position(&self) -> u64 {
        self.cursor as u64
    }

    pub fn set_position(&mut self, pos: u64) {
        self.cursor = pos as usize;
    }

    /// Copies one segment to its absolute address, padding
    /// `[high_water_mark, start_address)` first when the write lands
    /// beyond the current end.
    pub fn write_verbatim(&mut self, start_address: u32, data: &[u8]) {
        let start = start_address as usize;
        if start > self.bytes.len() {
            self.bytes.resize(start, self.padding);
        }
        self.cursor = start;
        self.write(data);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn write(&mut self, data: &[u8]) {
        if self.cursor > self.bytes.len() {
            self.bytes.resize(self.cursor, self.padding);
        }
        let end = self.cursor + data.len();
        let overlap = (self.bytes.len() - self.cursor).min(data.len());
        self.bytes[self.cursor..self.cursor + overlap].copy_from_slice(&data[..overlap]);
        self.bytes.extend_from_slice(&data[overlap..]);
        self.cursor = end;
    }
}

impl ByteSink for OutputImage {
    fn write_byte(&mut self, byte: u8) {
        self.write(&[byte]);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.write(bytes);
    }
}

impl RandomAccessSink for OutputImage {
    fn seek(&mut self, pos: u64) {
        self.set_position(pos);
    }

    fn tell(&self) -> u64 {
        self.position()
    }
}

#[cfg(test)]
mod tests {
    use super::OutputImage;
    use crate::codec::{ByteSink, RandomAccessSink};
    use pretty_assertions::assert_eq;

    #[test]
    fn forward_write_pads_the_gap() {
        let mut image = OutputImage::new(0xff);
        image.write_verbatim(0x10, &[0x01, 0x02]);
        image.write_verbatim(0x20, &[0x03, 0x04]);

        let mut expected = vec![0xff; 0x10];
        expected.extend_from_slice(&[0x01, 0x02]);
        expected.extend_from_slice(&[0xff; 14]);
        expected.extend_from_slice(&[0x03, 0x04]);
        assert_eq!(image.into_bytes(), expected);
    }

    #[test]
    fn backward_write_overwrites_without_shrinking() {
        let mut image = OutputImage::new(0x00);
        image.write_verbatim(0, &[0xaa; 8]);
        image.write_verbatim(2, &[0xbb, 0xbb]);
        assert_eq!(image.high_water_mark(), 8);
        assert_eq!(
            image.into_bytes(),
            [0xaa, 0xaa, 0xbb, 0xbb, 0xaa, 0xaa, 0xaa, 0xaa]
        );
    }

    #[test]
    fn high_water_mark_tracks_the_furthest_write() {
        let mut image = OutputImage::new(0x00);
        assert_eq!(image.high_water_mark(), 0);
        image.write_verbatim(4, &[1, 2, 3]);
        assert_eq!(image.high_water_mark(), 7);
        image.write_verbatim(0, &[9]);
        assert_eq!(image.high_water_mark(), 7);
        assert_eq!(image.position(), 1);
    }

    #[test]
    fn sink_writes_extend_from_the_cursor() {
        let mut image = OutputImage::new(0x00);
        image.write_verbatim(0, &[1, 2, 3, 4]);
        image.seek(2);
        image.write_byte(0x55);
        image.write_byte(0x66);
        image.write_byte(0x77);
        assert_eq!(image.tell(), 5);
        assert_eq!(image.into_bytes(), [1, 2, 0x55, 0x66, 0x77]);
    }
}
