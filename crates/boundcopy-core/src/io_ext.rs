use std::io::{self, BufRead, Read, Write};

use crate::error::TransferError;

pub const COPY_BUFFER_SIZE: usize = 8192;

/// Plain read/write loop through a stack buffer until `reader` reports EOF.
pub fn copy_buffered<R, W>(reader: &mut R, writer: &mut W) -> Result<u64, TransferError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = [0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(written),
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransferError::io(written, err)),
        };

        write_all_counted(writer, &buffer[..read], &mut written)
            .map_err(|err| TransferError::io(written, err))?;
    }
}

/// Writes at most `max` bytes straight out of `source`'s internal buffer.
///
/// Only the bytes the sink accepted are consumed, so on error the source is
/// positioned right after the last byte that made it out.
pub fn copy_from_buffer<B, W>(source: &mut B, sink: &mut W, max: u64) -> Result<u64, TransferError>
where
    B: BufRead + ?Sized,
    W: Write + ?Sized,
{
    let mut written = 0u64;

    while written < max {
        let available = match source.fill_buf() {
            Ok(available) => available,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransferError::io(written, err)),
        };
        if available.is_empty() {
            break;
        }

        let len = std::cmp::min(available.len() as u64, max - written) as usize;
        let before = written;
        let outcome = write_all_counted(sink, &available[..len], &mut written);
        source.consume((written - before) as usize);
        outcome.map_err(|err| TransferError::io(written, err))?;
    }

    Ok(written)
}

/// Discards exactly `len` bytes from `reader`.
pub fn skip_exact<R: Read + ?Sized>(reader: &mut R, len: u64) -> Result<(), TransferError> {
    let mut buffer = [0u8; COPY_BUFFER_SIZE];
    let mut skipped = 0u64;

    while skipped < len {
        let to_read = std::cmp::min(len - skipped, buffer.len() as u64) as usize;
        let read = match reader.read(&mut buffer[..to_read]) {
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransferError::io(skipped, err)),
        };
        if read == 0 {
            return Err(TransferError::Short {
                transferred: skipped,
                requested: len,
            });
        }
        skipped += read as u64;
    }

    Ok(())
}

/// `write_all` that keeps `written` current even when the sink fails midway.
pub fn write_all_counted<W: Write + ?Sized>(
    sink: &mut W,
    mut buf: &[u8],
    written: &mut u64,
) -> io::Result<()> {
    while !buf.is_empty() {
        match sink.write(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "sink accepted no bytes",
                ))
            }
            Ok(n) => {
                *written += n as u64;
                buf = &buf[n..];
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }

    Ok(())
}
