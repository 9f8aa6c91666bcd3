use std::fs::File;
use std::io::{
    self, BufReader, Cursor, Empty, Read, Repeat, Seek, SeekFrom, Stdin, StdinLock, Take, Write,
};

use crate::error::TransferError;
use crate::io_ext::{copy_buffered, copy_from_buffer};

/// Fast path for sources that can move a bounded amount of data into a sink
/// without going through an intermediate read buffer.
pub trait CopyToN {
    /// Writes at most `max` bytes into `sink`, stopping early on exhaustion.
    ///
    /// Returns the number of bytes the sink accepted. Errors must carry the
    /// bytes accepted before the failure.
    fn copy_to_n(&mut self, sink: &mut dyn Write, max: u64) -> Result<u64, TransferError>;
}

/// A reader that forwards at most a fixed number of bytes from an inner source.
///
/// The remaining budget is decremented by every byte read through the wrapper;
/// code that bypasses the wrapper must call [`Limited::set_limit`] itself.
pub trait Limited: Read {
    fn limit(&self) -> u64;

    fn set_limit(&mut self, limit: u64);

    fn inner_mut(&mut self) -> &mut dyn Source;
}

/// What a source is able to do for the dispatcher.
pub enum Shape<'a> {
    /// Only `Read`.
    Plain,
    /// Implements the bounded copy fast path.
    CopyToN(&'a mut dyn CopyToN),
    /// A bounded wrapper around another source.
    Bounded(&'a mut dyn Limited),
}

impl Shape<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Plain => "plain",
            Shape::CopyToN(_) => "copy_to_n",
            Shape::Bounded(_) => "bounded",
        }
    }
}

pub trait Source: Read {
    fn shape(&mut self) -> Shape<'_> {
        Shape::Plain
    }
}

impl<S: Source> Limited for Take<S> {
    fn limit(&self) -> u64 {
        Take::limit(self)
    }

    fn set_limit(&mut self, limit: u64) {
        Take::set_limit(self, limit)
    }

    fn inner_mut(&mut self) -> &mut dyn Source {
        self.get_mut()
    }
}

impl<S: Source> Source for Take<S> {
    fn shape(&mut self) -> Shape<'_> {
        Shape::Bounded(self)
    }
}

impl<S: Source + ?Sized> Source for &mut S {
    fn shape(&mut self) -> Shape<'_> {
        (**self).shape()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn shape(&mut self) -> Shape<'_> {
        (**self).shape()
    }
}

impl CopyToN for &[u8] {
    fn copy_to_n(&mut self, sink: &mut dyn Write, max: u64) -> Result<u64, TransferError> {
        copy_from_buffer(self, sink, max)
    }
}

impl Source for &[u8] {
    fn shape(&mut self) -> Shape<'_> {
        Shape::CopyToN(self)
    }
}

impl<T: AsRef<[u8]>> CopyToN for Cursor<T> {
    fn copy_to_n(&mut self, sink: &mut dyn Write, max: u64) -> Result<u64, TransferError> {
        copy_from_buffer(self, sink, max)
    }
}

impl<T: AsRef<[u8]>> Source for Cursor<T> {
    fn shape(&mut self) -> Shape<'_> {
        Shape::CopyToN(self)
    }
}

impl<R: Read> CopyToN for BufReader<R> {
    fn copy_to_n(&mut self, sink: &mut dyn Write, max: u64) -> Result<u64, TransferError> {
        copy_from_buffer(self, sink, max)
    }
}

impl<R: Read> Source for BufReader<R> {
    fn shape(&mut self) -> Shape<'_> {
        Shape::CopyToN(self)
    }
}

impl CopyToN for StdinLock<'_> {
    fn copy_to_n(&mut self, sink: &mut dyn Write, max: u64) -> Result<u64, TransferError> {
        copy_from_buffer(self, sink, max)
    }
}

impl Source for StdinLock<'_> {
    fn shape(&mut self) -> Shape<'_> {
        Shape::CopyToN(self)
    }
}

/// Reads at most `max` bytes straight from the file handle. On a sink failure
/// a seekable file is repositioned right after the last accepted byte.
impl CopyToN for &File {
    fn copy_to_n(&mut self, sink: &mut dyn Write, max: u64) -> Result<u64, TransferError> {
        let start = self.stream_position().ok();
        let result = copy_buffered(&mut Read::take(&mut *self, max), sink);
        if let (Err(err), Some(start)) = (&result, start) {
            let _ = self.seek(SeekFrom::Start(start + err.transferred()));
        }
        result
    }
}

impl Source for &File {
    fn shape(&mut self) -> Shape<'_> {
        Shape::CopyToN(self)
    }
}

impl CopyToN for File {
    fn copy_to_n(&mut self, sink: &mut dyn Write, max: u64) -> Result<u64, TransferError> {
        let mut file: &File = self;
        file.copy_to_n(sink, max)
    }
}

impl Source for File {
    fn shape(&mut self) -> Shape<'_> {
        Shape::CopyToN(self)
    }
}

impl Source for Stdin {}

impl Source for Empty {}

impl Source for Repeat {}

/// Wraps any reader as a [`Source`] with the [`Shape::Plain`] shape.
#[derive(Debug)]
pub struct PlainReader<R>(pub R);

impl<R: Read> Read for PlainReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read> Source for PlainReader<R> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_reports_bounded_shape() {
        let mut limited = (&b"hello"[..]).take(3);
        match limited.shape() {
            Shape::Bounded(bounded) => {
                assert_eq!(bounded.limit(), 3);
                assert_eq!(bounded.inner_mut().shape().name(), "copy_to_n");
            }
            other => panic!("unexpected shape {}", other.name()),
        }
    }

    #[test]
    fn references_forward_shape() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);
        let mut by_ref = &mut cursor;
        assert_eq!(Source::shape(&mut by_ref).name(), "copy_to_n");

        let mut boxed: Box<dyn Source> = Box::new(io::empty());
        assert_eq!(boxed.shape().name(), "plain");
    }

    #[test]
    fn plain_reader_hides_capability() {
        let mut reader = PlainReader(Cursor::new(vec![1u8, 2, 3]));
        assert_eq!(reader.shape().name(), "plain");
    }

    #[test]
    fn slice_copy_to_n_advances() {
        let mut data = &b"abcdef"[..];
        let mut sink: Vec<u8> = Vec::new();

        let n = data.copy_to_n(&mut sink, 4).expect("copy");

        assert_eq!(n, 4);
        assert_eq!(sink, b"abcd");
        assert_eq!(data, b"ef");
    }
}
