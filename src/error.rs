//! Library-wide error and result types.

use std::io;

use thiserror::Error;

/// Result alias used throughout retex.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; the orchestrator prefixes
/// them with the path of the file being processed.
#[derive(Debug, Error)]
pub enum Error {
    /// A magic/signature field did not match the expected value.
    #[error("bad magic value")]
    BadMagic,
    /// The stream ended before all expected bytes could be read.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// An offset or size field would read or write outside the valid region.
    #[error("invalid offset or size")]
    InvalidRange,
    /// A structural constraint was violated (message describes which one).
    #[error("parse error: {0}")]
    Parse(&'static str),
    /// The zlib stream inside a compressed blob is corrupt.
    #[error("deflate stream error: {0}")]
    Deflate(#[source] io::Error),
    /// A compressed blob declares more than one embedded file.
    #[error("unsupported xbc1 file count: {0}")]
    UnsupportedFileCount(u32),
    /// A DXGI pixel format with no block layout or surface code.
    #[error("unsupported pixel format: {0}")]
    UnsupportedPixelFormat(u32),
    /// A legacy DDS FourCC with no DXGI equivalent.
    #[error("unsupported fourcc: {}", String::from_utf8_lossy(.0))]
    UnsupportedFourCc([u8; 4]),
    /// An index or id lies outside its declared bounds.
    #[error("index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
    /// Every replacement candidate was skipped.
    #[error("no files replaced")]
    NoReplacementsApplied,
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl Error {
    /// Whether this error only invalidates the item being processed.
    ///
    /// Format and I/O errors are recoverable at the item level; the
    /// orchestrator treats them as fatal only while loading or emitting.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::NoReplacementsApplied)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_maps_to_its_own_variant() {
        let eof = io::Error::from(io::ErrorKind::UnexpectedEof);
        assert!(matches!(Error::from(eof), Error::UnexpectedEof));
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(Error::from(denied), Error::Io(_)));
    }

    #[test]
    fn only_an_empty_run_is_terminal() {
        assert!(Error::OutOfRange { index: 3, len: 2 }.is_recoverable());
        assert!(Error::UnsupportedPixelFormat(99).is_recoverable());
        assert!(!Error::NoReplacementsApplied.is_recoverable());
    }
}
