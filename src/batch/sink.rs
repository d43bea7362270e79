//! Append-only sink for confirmed identifiers

use crate::Result;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Writes one identifier per line and flushes after every write so partial
/// progress survives a crash.
pub struct ResultSink<W: Write> {
    writer: Mutex<W>,
}

impl ResultSink<File> {
    /// Open `path` for appending, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> ResultSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn record(&self, identifier: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", identifier)?;
        writer.flush()?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}
