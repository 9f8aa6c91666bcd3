use std::io;

use thiserror::Error;

/// Failure of a transfer, carrying the bytes moved before it stopped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransferError {
    #[error("I/O error after {transferred} bytes: {source}")]
    Io {
        transferred: u64,
        source: io::Error,
    },
    #[error("short transfer: {transferred} of {requested} bytes")]
    Short { transferred: u64, requested: u64 },
}

impl TransferError {
    pub fn io(transferred: u64, source: io::Error) -> Self {
        Self::Io {
            transferred,
            source,
        }
    }

    /// Bytes accepted by the sink before the transfer stopped.
    pub fn transferred(&self) -> u64 {
        match self {
            Self::Io { transferred, .. } | Self::Short { transferred, .. } => *transferred,
        }
    }

    pub fn is_short(&self) -> bool {
        matches!(self, Self::Short { .. })
    }

    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Io { source, .. } => source.kind(),
            Self::Short { .. } => io::ErrorKind::UnexpectedEof,
        }
    }
}

impl From<TransferError> for io::Error {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Io { source, .. } => source,
            short @ TransferError::Short { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, short)
            }
        }
    }
}
