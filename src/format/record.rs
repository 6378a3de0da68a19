use crate::format::FormatError;

/// Two-byte magic prefix of an AS code file.
pub const MAGIC: [u8; 2] = [0x89, 0x14];

/// Processor-family code of the auxiliary Z80 sound CPU.
pub const Z80_FAMILY: u8 = 0x51;

const TAG_END: u8 = 0x00;
const TAG_ENTRY_POINT: u8 = 0x80;
const TAG_EXTENDED_SEGMENT: u8 = 0x81;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record<'a> {
    /// End-of-stream sentinel (the creator string follows; it is never read).
    EndOfStream,
    /// Entry-point record. Parsed for framing, discarded by the converter.
    EntryPoint { address: u32 },
    Segment(Segment<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub processor_family: u8,
    pub start_address: u32,
    pub data: &'a [u8],
}

/// Sequential record reader over one code file.
///
/// # Errors
/// `new` fails when the magic header is missing or wrong; `next_record`
/// fails on short reads, unknown tags and unsupported granularity. Every
/// failure is fatal to the whole conversion - there is no resync path.
#[derive(Debug)]
pub struct RecordStream<'a> {
    reader: Reader<'a>,
}

impl<'a> RecordStream<'a> {
    pub fn new(input: &'a [u8]) -> Result<Self, FormatError> {
        let mut reader = Reader::new(input);
        let magic = reader.read_bytes(2)?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic(u16::from_be_bytes([
                magic[0], magic[1],
            ])));
        }
        Ok(Self { reader })
    }

    pub fn next_record(&mut self) -> Result<Record<'a>, FormatError> {
        let header = self.reader.read_u8()?;
        match header {
            TAG_END => Ok(Record::EndOfStream),
            TAG_ENTRY_POINT => {
                let address = self.reader.read_u32_le()?;
                Ok(Record::EntryPoint { address })
            }
            TAG_EXTENDED_SEGMENT => {
                let processor_family = self.reader.read_u8()?;
                let _segment_id = self.reader.read_u8()?;
                let granularity = self.reader.read_u8()?;
                if granularity != 1 {
                    return Err(FormatError::UnsupportedGranularity(granularity));
                }
                self.read_segment_body(processor_family)
            }
            _ if header >= 0x80 => Err(FormatError::UnrecognisedRecord(header)),
            // Legacy CODE segment: the header byte doubles as the family code.
            _ => self.read_segment_body(header),
        }
    }

    fn read_segment_body(&mut self, processor_family: u8) -> Result<Record<'a>, FormatError> {
        let start_address = self.reader.read_u32_le()?;
        let length = self.reader.read_u16_le()?;
        let data = self.reader.read_bytes(usize::from(length))?;
        Ok(Record::Segment(Segment {
            processor_family,
            start_address,
            data,
        }))
    }
}

#[derive(Debug)]
struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn read_u8(&mut self) -> Result<u8, FormatError> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    fn read_u16_le(&mut self) -> Result<u16, FormatError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32_le(&mut self) -> Result<u32, FormatError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_bytes(&mut self, size: usize) -> Result<&'a [u8], FormatError> {
        if self.pos + size > self.input.len() {
            return Err(FormatError::UnexpectedEof);
        }
        let begin = self.pos;
        self.pos += size;
        Ok(&self.input[begin..self.pos])
    }
}
