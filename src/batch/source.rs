//! Identifier sources
//!
//! Identifiers are read lazily, one per line. Blank lines are skipped and
//! lines that are not valid UTF-8 are reported and skipped.

use crate::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::warn;

/// Where identifiers come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierSource {
    /// Newline-delimited file
    File(PathBuf),
    /// A single identifier given on the command line
    Single(String),
}

impl IdentifierSource {
    /// Open the source as a lazy iterator of trimmed, non-empty identifiers.
    pub fn open(&self) -> Result<Box<dyn Iterator<Item = String> + Send>> {
        match self {
            IdentifierSource::File(path) => {
                let file = File::open(path).map_err(|e| {
                    Error::Config(format!("cannot open identifier file {}: {}", path.display(), e))
                })?;
                Ok(Box::new(Identifiers::new(BufReader::new(file))))
            }
            IdentifierSource::Single(identifier) => {
                let identifier = identifier.trim().to_string();
                Ok(Box::new((!identifier.is_empty()).then_some(identifier).into_iter()))
            }
        }
    }
}

/// Iterator over the identifiers of a reader
pub struct Identifiers<R> {
    lines: std::io::Split<R>,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> Identifiers<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.split(b'\n'),
            line_no: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for Identifiers<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.done {
            let raw = match self.lines.next() {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    warn!(line = self.line_no + 1, error = %e, "stopped reading identifiers");
                    self.done = true;
                    return None;
                }
                None => {
                    self.done = true;
                    return None;
                }
            };
            self.line_no += 1;

            match String::from_utf8(raw) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        return Some(trimmed.to_string());
                    }
                }
                Err(_) => warn!(line = self.line_no, "skipping identifier that is not valid UTF-8"),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_blank_lines_skipped_and_trimmed() {
        let input = Cursor::new("a@x.com\n\n   \n  b@x.com  \r\nc@x.com");
        let ids: Vec<String> = Identifiers::new(input).collect();
        assert_eq!(ids, vec!["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let input = Cursor::new(b"a@x.com\n\xff\xfe\nb@x.com\n".to_vec());
        let ids: Vec<String> = Identifiers::new(input).collect();
        assert_eq!(ids, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_single_source() {
        let ids: Vec<String> = IdentifierSource::Single(" a@x.com ".to_string())
            .open()
            .unwrap()
            .collect();
        assert_eq!(ids, vec!["a@x.com"]);

        let empty: Vec<String> = IdentifierSource::Single("  ".to_string())
            .open()
            .unwrap()
            .collect();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "one@x.com").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "two@x.com").unwrap();

        let ids: Vec<String> = IdentifierSource::File(file.path().to_path_buf())
            .open()
            .unwrap()
            .collect();
        assert_eq!(ids, vec!["one@x.com", "two@x.com"]);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = IdentifierSource::File(dir.path().join("missing.txt")).open();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
