//! Crate-wide error type.
//!
//! Every fallible operation in this crate returns [`Error`] rather than a
//! per-module error, since callers generally propagate diff/patch/package
//! failures straight up through several layers (codec → differ → vdir).

use std::fmt;
use std::path::PathBuf;

/// Errors produced while compressing, diffing, patching, or packaging data.
#[derive(Debug)]
pub enum Error {
    /// A requested byte or instruction range fell outside the bounds of the
    /// buffer it was read from.
    OutOfRange,
    /// An operation that requires non-empty input was given zero bytes.
    EmptyInput,
    /// A framed artifact's magic string didn't match the expected one.
    BadMagic {
        expected: &'static str,
        found: [u8; 16],
    },
    /// A framed artifact was shorter than its own header claims.
    Truncated,
    /// The LZ4 block encoder could not fit the compressed output into its
    /// worst-case-sized buffer.
    CompressionFailed,
    /// The LZ4 block decoder rejected its input as malformed.
    DecompressionFailed,
    /// An instruction tag byte did not match `C`, `I`, or `R`.
    UnknownInstructionTag(u8),
    /// A decompressed payload's integrity hash didn't match the one stored
    /// alongside it.
    HashMismatch,
    /// A `U` patch entry's pre-apply hash did not match the `source_hash`
    /// recorded when the delta was produced; `found` is the hash actually
    /// observed on the file being patched.
    VersionMismatch { found: u64 },
    /// A path referenced by a virtual directory entry is missing on disk.
    FileMissing(PathBuf),
    /// An I/O operation on the given path failed.
    Io { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfRange => write!(f, "range extends past the end of the buffer"),
            Error::EmptyInput => write!(f, "input must not be empty"),
            Error::BadMagic { expected, found } => {
                let found_str = String::from_utf8_lossy(found);
                write!(
                    f,
                    "bad magic: expected {:?}, found {:?}",
                    expected, found_str
                )
            }
            Error::Truncated => write!(f, "framed artifact is shorter than its header claims"),
            Error::CompressionFailed => write!(f, "LZ4 block compression failed"),
            Error::DecompressionFailed => write!(f, "LZ4 block decompression failed"),
            Error::UnknownInstructionTag(tag) => {
                write!(f, "unknown instruction tag byte {:#04x}", tag)
            }
            Error::HashMismatch => write!(f, "integrity hash mismatch"),
            Error::VersionMismatch { found } => {
                write!(f, "file does not match the expected source version (hash {:#018x})", found)
            }
            Error::FileMissing(path) => write!(f, "file missing: {}", path.display()),
            Error::Io { path, source } => write!(f, "I/O error at {}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<crate::block::Lz4Error> for Error {
    fn from(_: crate::block::Lz4Error) -> Self {
        Error::CompressionFailed
    }
}

impl From<crate::block::DecompressError> for Error {
    fn from(_: crate::block::DecompressError) -> Self {
        Error::DecompressionFailed
    }
}

/// A specialized [`Result`](std::result::Result) using this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
