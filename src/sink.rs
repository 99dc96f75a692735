//! Single buffered output shared by all workers behind one lock.

use crate::error::{Error, Result};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Buffered writer guarded by a mutex.
///
/// Callers hand over fully assembled segments, so a segment is never split
/// by another thread's write.
#[derive(Debug)]
pub(crate) struct SharedSink<W: Write> {
    path: PathBuf,
    writer: Mutex<BufWriter<W>>,
}

impl<W: Write> SharedSink<W> {
    /// Wraps `inner` with a buffer of `capacity` bytes; `path` is used in
    /// error messages.
    pub(crate) fn new(path: impl Into<PathBuf>, inner: W, capacity: usize) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(BufWriter::with_capacity(capacity, inner)),
        }
    }

    /// Writes all of `bytes` while holding the lock.
    pub(crate) fn write(&self, bytes: &[u8]) -> Result<()> {
        self.lock()?
            .write_all(bytes)
            .map_err(|e| Error::io(&self.path, e))
    }

    /// Flushes buffered bytes to the underlying writer.
    pub(crate) fn flush(&self) -> Result<()> {
        self.lock()?.flush().map_err(|e| Error::io(&self.path, e))
    }

    /// Flushes and returns the underlying writer.
    pub(crate) fn into_inner(self) -> Result<W> {
        let writer = self
            .writer
            .into_inner()
            .map_err(|_| Error::worker("output lock poisoned by a panicked worker"))?;
        writer
            .into_inner()
            .map_err(|e| Error::io(&self.path, e.into_error()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, BufWriter<W>>> {
        self.writer
            .lock()
            .map_err(|_| Error::worker("output lock poisoned by a panicked worker"))
    }
}
