#![deny(warnings)]
#![deny(clippy::all)]

use std::io::{self, BufRead, Read, Write};

use boundcopy_core::{CopyToN, Shape, Source, TransferError};

pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// In-memory source that implements the bounded copy fast path and records
/// how often it was used.
#[derive(Debug, Clone)]
pub struct CapableSource {
    data: Vec<u8>,
    pos: usize,
    calls: usize,
    chunk: usize,
}

impl CapableSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            calls: 0,
            chunk: 4096,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(sample_bytes(capacity))
    }

    /// Largest slice handed to the sink in one `write` call.
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn called(&self) -> bool {
        self.calls > 0
    }

    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl Read for CapableSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = std::cmp::min(buf.len(), self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl CopyToN for CapableSource {
    fn copy_to_n(&mut self, sink: &mut dyn Write, max: u64) -> Result<u64, TransferError> {
        self.calls += 1;

        let end = self.pos + std::cmp::min(max, self.remaining() as u64) as usize;
        let mut written = 0u64;
        while self.pos < end {
            let stop = std::cmp::min(end, self.pos + self.chunk);
            match sink.write(&self.data[self.pos..stop]) {
                Ok(0) => {
                    return Err(TransferError::io(
                        written,
                        io::Error::new(io::ErrorKind::WriteZero, "sink accepted no bytes"),
                    ))
                }
                Ok(n) => {
                    self.pos += n;
                    written += n as u64;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(TransferError::io(written, err)),
            }
        }

        Ok(written)
    }
}

impl Source for CapableSource {
    fn shape(&mut self) -> Shape<'_> {
        Shape::CopyToN(self)
    }
}

/// In-memory source with no fast path. Optionally returns at most `trickle`
/// bytes per read.
#[derive(Debug, Clone)]
pub struct PlainSource {
    data: Vec<u8>,
    pos: usize,
    trickle: Option<usize>,
}

impl PlainSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            trickle: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(sample_bytes(capacity))
    }

    pub fn trickle(mut self, per_read: usize) -> Self {
        self.trickle = Some(per_read.max(1));
        self
    }

    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl Read for PlainSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = std::cmp::min(buf.len(), self.remaining());
        if let Some(per_read) = self.trickle {
            n = std::cmp::min(n, per_read);
        }
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Source for PlainSource {}

/// Yields `ok_bytes` bytes, then fails every read.
#[derive(Debug)]
pub struct FailingSource {
    inner: PlainSource,
    ok_bytes: usize,
}

impl FailingSource {
    pub fn new(data: Vec<u8>, ok_bytes: usize) -> Self {
        Self {
            inner: PlainSource::new(data),
            ok_bytes,
        }
    }
}

impl Read for FailingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let left = self.ok_bytes.saturating_sub(self.inner.consumed());
        if left == 0 {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "source failed"));
        }
        let len = std::cmp::min(buf.len(), left);
        self.inner.read(&mut buf[..len])
    }
}

impl Source for FailingSource {}

/// Accepts `capacity` bytes, then fails every write with `BrokenPipe`.
#[derive(Debug, Default)]
pub struct FailingSink {
    accepted: Vec<u8>,
    capacity: usize,
}

impl FailingSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            accepted: Vec::new(),
            capacity,
        }
    }

    pub fn accepted(&self) -> &[u8] {
        &self.accepted
    }
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.capacity - self.accepted.len();
        if room == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
        }
        let n = std::cmp::min(room, buf.len());
        self.accepted.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Fails the first `read`, `fill_buf` or `write` with `Interrupted`, then
/// forwards every call to `inner`.
#[derive(Debug)]
pub struct Interrupting<T> {
    inner: T,
    pending: bool,
}

impl<T> Interrupting<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            pending: true,
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn interrupt(&mut self) -> io::Result<()> {
        if std::mem::take(&mut self.pending) {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted"));
        }
        Ok(())
    }
}

impl<R: Read> Read for Interrupting<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.interrupt()?;
        self.inner.read(buf)
    }
}

impl<R: BufRead> BufRead for Interrupting<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.interrupt()?;
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

impl<R: Read> Source for Interrupting<R> {}

impl<W: Write> Write for Interrupting<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.interrupt()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
