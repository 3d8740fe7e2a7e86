//! Framed compression on top of the LZ4 block engine.
//!
//! A compressed artifact is a 16-byte NUL-padded magic (`"yatta compress"`),
//! followed by the uncompressed size as a native-endian `u64`, followed by
//! the raw LZ4 block. This lets [`decompress`] allocate the exact output
//! size up front instead of guessing and growing.

use crate::block;
use crate::error::{Error, Result};
use crate::membuf::{Buffer, MemoryRange};

const MAGIC: &[u8; 16] = b"yatta compress\0\0";
const HEADER_LEN: usize = 24; // 16-byte magic + 8-byte size

/// Compress `src` into a framed, self-describing artifact.
///
/// Fails with [`Error::EmptyInput`] if `src` is empty, or
/// [`Error::CompressionFailed`] if the underlying LZ4 encoder cannot fit the
/// output into its worst-case bound (should not happen given the scratch
/// buffer size below, but is still surfaced rather than unwrapped).
pub fn compress(src: MemoryRange<'_>) -> Result<Buffer> {
    if src.empty() {
        return Err(Error::EmptyInput);
    }

    let bound = block::compress_bound(src.size() as i32).max(0) as usize;
    let mut scratch = vec![0u8; bound];
    let written = block::compress_default(src.as_slice(), &mut scratch)?;

    let mut out = Buffer::with_size(HEADER_LEN + written);
    out.write_raw(MAGIC, 0)?;
    out.write_as::<u64>(src.size() as u64, 16)?;
    out.write_raw(&scratch[..written], HEADER_LEN)?;
    out.resize(HEADER_LEN + written);
    out.shrink();
    Ok(out)
}

/// Decompress a framed artifact produced by [`compress`].
///
/// Fails with [`Error::Truncated`] if `src` is shorter than a header,
/// [`Error::BadMagic`] if the magic doesn't match, or
/// [`Error::DecompressionFailed`] if the LZ4 block is malformed.
pub fn decompress(src: MemoryRange<'_>) -> Result<Buffer> {
    if src.size() < HEADER_LEN {
        return Err(Error::Truncated);
    }

    let mut found = [0u8; 16];
    src.read_raw(&mut found, 16, 0)?;
    if &found != MAGIC {
        return Err(Error::BadMagic {
            expected: "yatta compress",
            found,
        });
    }

    let uncompressed_size: u64 = src.read_as(16)?;
    let uncompressed_size = uncompressed_size as usize;

    let payload = &src.as_slice()[HEADER_LEN..];
    let mut out = Buffer::with_size(uncompressed_size);
    let written = block::decompress_safe(payload, out.as_mut_slice())?;
    if written != uncompressed_size {
        return Err(Error::Truncated);
    }
    Ok(out)
}
