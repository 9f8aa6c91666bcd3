use std::io::{Read, Write};

use tracing::{debug, trace};

use crate::error::TransferError;
use crate::io_ext::copy_buffered;
use crate::source::{Limited, Shape, Source};

/// Copies `source` into `sink`, taking the cheapest route its shape allows.
///
/// Unbounded sources always go through the buffered loop. Bounded sources are
/// unwrapped until either a [`CopyToN`](crate::CopyToN) source turns up or the
/// chain ends in a plain reader. Each wrapper on the way has its budget
/// reduced by the bytes actually moved.
pub fn dispatch<S>(sink: &mut dyn Write, source: &mut S) -> Result<u64, TransferError>
where
    S: Source + ?Sized,
{
    let result = match source.shape() {
        Shape::Bounded(bounded) => dispatch_bounded(sink, bounded),
        Shape::Plain | Shape::CopyToN(_) => {
            trace!("unbounded source, buffered copy");
            copy_buffered(source, sink)
        }
    };

    if let Err(err) = &result {
        debug!(transferred = err.transferred(), error = %err, "transfer stopped");
    }
    result
}

fn dispatch_bounded(sink: &mut dyn Write, bounded: &mut dyn Limited) -> Result<u64, TransferError> {
    let limit = bounded.limit();

    let result = match bounded.inner_mut().shape() {
        Shape::CopyToN(inner) => {
            trace!(limit, "bounded copy fast path");
            inner.copy_to_n(sink, limit)
        }
        Shape::Bounded(nested) => {
            let nested_limit = nested.limit();
            if nested_limit < limit {
                trace!(limit, nested_limit, "nested bound is tighter, unwrapping");
                dispatch_bounded(sink, nested)
            } else {
                trace!(limit, nested_limit, "outer bound is tighter, bypassing nested wrapper");
                let mut bypass = Read::take(nested.inner_mut(), limit);
                let result = dispatch(sink, &mut bypass);
                nested.set_limit(nested_limit.saturating_sub(moved(&result)));
                result
            }
        }
        Shape::Plain => {
            trace!(limit, "plain inner source, buffered copy through the bound");
            return copy_buffered(bounded, sink);
        }
    };

    bounded.set_limit(limit.saturating_sub(moved(&result)));
    result
}

fn moved(result: &Result<u64, TransferError>) -> u64 {
    match result {
        Ok(n) => *n,
        Err(err) => err.transferred(),
    }
}
