use std::io::{self, Read, Write};

use crate::dispatch::dispatch;
use crate::error::TransferError;
use crate::source::Source;

/// Sink adapter that routes incoming copies through [`dispatch`].
///
/// Writes are forwarded unchanged; [`TransferWriter::read_from`] and
/// [`TransferWriter::copy_n`] detect `Take` wrappers around the source and use
/// the bounded fast path when one is available.
#[derive(Debug)]
pub struct TransferWriter<W> {
    inner: W,
}

impl<W: Write> TransferWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Copies `source` until it is exhausted. Reaching the end is not an error.
    pub fn read_from<S>(&mut self, source: &mut S) -> Result<u64, TransferError>
    where
        S: Source + ?Sized,
    {
        dispatch(&mut self.inner, source)
    }

    /// Copies exactly `len` bytes, failing with [`TransferError::Short`] when
    /// `source` runs out first.
    pub fn copy_n<S>(&mut self, source: &mut S, len: u64) -> Result<u64, TransferError>
    where
        S: Source + ?Sized,
    {
        let transferred = self.read_from(&mut Read::take(source, len))?;
        if transferred < len {
            return Err(TransferError::Short {
                transferred,
                requested: len,
            });
        }

        Ok(transferred)
    }
}

impl<W: Write> Write for TransferWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Copies everything `source` has into `sink`.
pub fn transfer_all<W, S>(sink: &mut W, source: &mut S) -> Result<u64, TransferError>
where
    W: Write + ?Sized,
    S: Source + ?Sized,
{
    TransferWriter::new(sink).read_from(source)
}

/// Copies exactly `len` bytes from `source` into `sink`.
pub fn transfer_n<W, S>(sink: &mut W, source: &mut S, len: u64) -> Result<u64, TransferError>
where
    W: Write + ?Sized,
    S: Source + ?Sized,
{
    TransferWriter::new(sink).copy_n(source, len)
}
