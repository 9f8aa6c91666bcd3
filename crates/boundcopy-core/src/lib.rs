#![deny(warnings)]
#![deny(clippy::all)]

//! Bounded copy dispatch for `std::io`.
//!
//! `Read::take` hides its limit from the reader it wraps, so a source that
//! could hand its bytes straight to a writer never learns how many it is
//! allowed to send. [`dispatch`] looks through `Take` wrappers, however deeply
//! nested, and calls [`CopyToN::copy_to_n`] on the innermost source when it
//! supports it, keeping every wrapper's remaining limit accurate.
//!
//! ```
//! use std::io::{Cursor, Read};
//!
//! let mut source = Cursor::new(b"hello world".to_vec()).take(5);
//! let mut sink = Vec::new();
//!
//! let n = boundcopy_core::transfer_all(&mut sink, &mut source).unwrap();
//! assert_eq!(n, 5);
//! assert_eq!(sink, b"hello");
//! assert_eq!(source.limit(), 0);
//! ```

pub mod dispatch;
pub mod error;
pub mod io_ext;
pub mod source;
pub mod transfer;

pub use dispatch::dispatch;
pub use error::TransferError;
pub use io_ext::{copy_buffered, copy_from_buffer, skip_exact, COPY_BUFFER_SIZE};
pub use source::{CopyToN, Limited, PlainReader, Shape, Source};
pub use transfer::{transfer_all, transfer_n, TransferWriter};

pub type Result<T> = std::result::Result<T, TransferError>;
