//! `import.txt` writer.
//!
//! One line per output file: `<key>@<path>`, where `<key>` is the record's
//! delimited index on the record's first line and empty everywhere else.
//! The file is opened for appending so a second run into the same
//! destination extends the index instead of truncating it.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct IndexWriter<W: Write> {
    writer: W,
    /// Written paths are made relative to this directory when set.
    relative_to: Option<PathBuf>,
    lines: usize,
}

impl IndexWriter<BufWriter<File>> {
    /// Open (or create) the index at `path` in append mode.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> IndexWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer,
            relative_to: None,
            lines: 0,
        }
    }

    /// Write paths relative to `base` instead of as allocated.
    pub fn relative_to(mut self, base: impl Into<PathBuf>) -> Self {
        self.relative_to = Some(base.into());
        self
    }

    /// Append one line. `key` is `None` for every line but a record's first.
    pub fn write_line(&mut self, key: Option<&str>, path: &Path) -> io::Result<()> {
        let shown = match &self.relative_to {
            Some(base) => path.strip_prefix(base).unwrap_or(path),
            None => path,
        };
        writeln!(self.writer, "{}@{}", key.unwrap_or(""), shown.display())?;
        self.lines += 1;
        Ok(())
    }

    /// Lines written through this writer.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
