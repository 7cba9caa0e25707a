//! # Output sinks
//!
//! Destinations for unit output and the per-unit writer that buffers into
//! them. A destination only needs to accept bytes and support a flush; it
//! is shared behind an `Arc`, and the `Arc` identity is what decides which
//! writers must take turns.
//!
//! Use [`stdout()`] and [`stderr()`] rather than wrapping the standard
//! streams yourself, so every writer targeting them shares one identity.

mod locks;
mod writer;

use std::io::{self, Write};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

pub use locks::OutputLocks;
pub use writer::UnitWriter;

/// Something unit output can be written to
pub trait OutputSink: Send + Sync {
    fn write(&self, buf: &[u8]) -> io::Result<usize>;
    fn flush(&self) -> io::Result<()>;
}

pub type SharedSink = Arc<dyn OutputSink>;

/// Identity of a destination, used as the lock key
pub(crate) fn sink_key(sink: &SharedSink) -> usize {
    Arc::as_ptr(sink).cast::<()>() as usize
}

impl OutputSink for io::Stdout {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut handle: &io::Stdout = self;
        Write::write(&mut handle, buf)
    }

    fn flush(&self) -> io::Result<()> {
        let mut handle: &io::Stdout = self;
        Write::flush(&mut handle)
    }
}

impl OutputSink for io::Stderr {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut handle: &io::Stderr = self;
        Write::write(&mut handle, buf)
    }

    fn flush(&self) -> io::Result<()> {
        let mut handle: &io::Stderr = self;
        Write::flush(&mut handle)
    }
}

impl<W: Write + Send> OutputSink for Mutex<W> {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Write::write(&mut *self.lock(), buf)
    }

    fn flush(&self) -> io::Result<()> {
        Write::flush(&mut *self.lock())
    }
}

static STDOUT: LazyLock<SharedSink> = LazyLock::new(|| Arc::new(io::stdout()));
static STDERR: LazyLock<SharedSink> = LazyLock::new(|| Arc::new(io::stderr()));

/// The process-wide standard output destination
pub fn stdout() -> SharedSink {
    Arc::clone(&STDOUT)
}

/// The process-wide standard error destination
pub fn stderr() -> SharedSink {
    Arc::clone(&STDERR)
}

/// Wraps any writer as a shared destination
pub fn shared<W: Write + Send + 'static>(writer: W) -> SharedSink {
    Arc::new(Mutex::new(writer))
}

/// In-memory destination, handy for capturing output
#[derive(Debug, Default)]
pub struct MemorySink {
    bytes: Mutex<Vec<u8>>,
}

impl MemorySink {
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }
}

impl OutputSink for MemorySink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Creates an in-memory destination, returning it both as a sink and for inspection
pub fn memory() -> (SharedSink, Arc<MemorySink>) {
    let memory = Arc::new(MemorySink::default());
    let sink: SharedSink = memory.clone();
    (sink, memory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_streams_have_stable_identity() {
        assert_eq!(sink_key(&stdout()), sink_key(&stdout()));
        assert_ne!(sink_key(&stdout()), sink_key(&stderr()));
    }

    #[test]
    fn shared_writer_accepts_bytes() {
        let sink = shared(Vec::<u8>::new());
        assert_eq!(sink.write(b"abc").unwrap(), 3);
        sink.flush().unwrap();
    }

    #[test]
    fn memory_sink_and_handle_are_one_destination() {
        let (sink, memory) = memory();
        sink.write(b"hello").unwrap();
        assert_eq!(memory.contents(), b"hello");
    }
}
