//! Destinations for rendered access log lines.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An append-only destination for log lines.
///
/// Each call appends one whole line; lines from concurrent callers never
/// interleave.
pub trait Sink: Send + Sync {
    /// Append `line` followed by a newline.
    fn append_line(&self, line: &str) -> io::Result<()>;
}

/// Acquire the sink named by `target`.
///
/// `""` and `"stdout"` select standard output, `"stderr"` selects standard
/// error, and anything else is a file path opened for appending.
pub fn acquire(target: &str) -> Result<Arc<dyn Sink>> {
    match target {
        "" | "stdout" => Ok(Arc::new(StdoutSink)),
        "stderr" => Ok(Arc::new(StderrSink)),
        path => Ok(Arc::new(FileSink::open(path)?)),
    }
}

fn with_newline(line: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    buf
}

/// Writes lines to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn append_line(&self, line: &str) -> io::Result<()> {
        io::stdout().lock().write_all(&with_newline(line))
    }
}

/// Writes lines to standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl Sink for StderrSink {
    fn append_line(&self, line: &str) -> io::Result<()> {
        io::stderr().lock().write_all(&with_newline(line))
    }
}

/// Appends lines to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Open `path` for appending, creating the file if needed.
    ///
    /// Missing parent directories are not created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::output_unavailable(path.display().to_string(), e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Get the path this sink writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn append_line(&self, line: &str) -> io::Result<()> {
        self.file.lock().write_all(&with_newline(line))
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Create an empty memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of every line appended so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Number of lines appended so far.
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Check whether nothing was appended yet.
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl Sink for MemorySink {
    fn append_line(&self, line: &str) -> io::Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }
}
