use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

/// Destination for measured compressed sizes, consumed by a later patch
/// pass. One report per completed run.
pub trait ReportSink {
    fn report(&mut self, label: &str, size: u64) -> io::Result<()>;
}

/// Sink used when no feedback file is configured.
pub struct NullSink;

impl ReportSink for NullSink {
    fn report(&mut self, _label: &str, _size: u64) -> io::Result<()> {
        Ok(())
    }
}

/// How `FileSink` lays out multiple reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    /// Historical behaviour: every report rewinds to the start of the
    /// file and writes from there, so a later, shorter report leaves the
    /// tail of an earlier one in place.
    OverwriteFromStart,
    /// Keyed behaviour: reports are merged by label and the whole file is
    /// rewritten on every report.
    UpdateByKey,
}

impl SinkMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "overwrite" => Some(SinkMode::OverwriteFromStart),
            "update" => Some(SinkMode::UpdateByKey),
            _ => None,
        }
    }
}

/// File-backed sink emitting `"<label> 0x<HEX> "` tokens.
pub struct FileSink {
    file: File,
    mode: SinkMode,
    entries: BTreeMap<String, u64>,
}

impl FileSink {
    pub fn create(path: &Path, mode: SinkMode) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file,
            mode,
            entries: BTreeMap::new(),
        })
    }
}

impl ReportSink for FileSink {
    fn report(&mut self, label: &str, size: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        match self.mode {
            SinkMode::OverwriteFromStart => {
                write!(self.file, "{label} 0x{size:X} ")?;
            }
            SinkMode::UpdateByKey => {
                self.entries.insert(label.to_string(), size);
                self.file.set_len(0)?;
                for (label, size) in &self.entries {
                    write!(self.file, "{label} 0x{size:X} ")?;
                }
            }
        }
        self.file.flush()
    }
}
