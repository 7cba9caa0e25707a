//! Per-unit buffered output
//!
//! A [`UnitWriter`] collects a unit's output and hands it to the shared
//! destination in whole chunks: whenever a write ends with a newline, on an
//! explicit flush, and when the writer is dropped. Each chunk is written
//! while holding the destination's lock from [`OutputLocks`], so output of
//! concurrently running units never interleaves mid-line.
//!
//! `write` always accepts the whole buffer. If the newline flush fails, the
//! unwritten bytes stay pending and the failure surfaces from the next
//! explicit `flush`, which retries them.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use super::locks::OutputLocks;
use super::SharedSink;

pub struct UnitWriter {
    buffer: Vec<u8>,
    sink: SharedSink,
    locks: Arc<OutputLocks>,
}

impl UnitWriter {
    /// Buffers output for `sink`, serialized through the global lock registry
    pub fn new(sink: SharedSink) -> Self {
        Self::with_locks(sink, OutputLocks::global())
    }

    pub fn with_locks(sink: SharedSink, locks: Arc<OutputLocks>) -> Self {
        Self {
            buffer: Vec::new(),
            sink,
            locks,
        }
    }

    /// A writer with its own buffer that writes to the same destination
    pub fn nested(&self) -> UnitWriter {
        Self::with_locks(Arc::clone(&self.sink), Arc::clone(&self.locks))
    }

    /// Output accepted but not yet flushed
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    fn flush_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let lock = self.locks.lock_for(&self.sink);
        let _guard = lock.lock();

        let mut written = 0;
        while written < self.buffer.len() {
            match self.sink.write(&self.buffer[written..]) {
                Ok(0) => {
                    self.buffer.drain(..written);
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "destination accepted no bytes",
                    ));
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.buffer.drain(..written);
                    return Err(e);
                }
            }
        }

        self.buffer.clear();
        self.sink.flush()
    }
}

impl Write for UnitWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        if buf.ends_with(b"\n") {
            if let Err(err) = self.flush_buffer() {
                tracing::debug!(error = %err, pending = self.buffer.len(), "deferring failed line flush");
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer()
    }
}

impl Drop for UnitWriter {
    fn drop(&mut self) {
        if let Err(err) = self.flush_buffer() {
            tracing::warn!(error = %err, "dropping unflushed unit output");
        }
    }
}

impl fmt::Debug for UnitWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitWriter")
            .field("pending", &self.buffer.len())
            .finish_non_exhaustive()
    }
}
