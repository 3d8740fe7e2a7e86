//! Reconstructs target bytes from source bytes and an instruction stream
//! produced by [`crate::differ::diff`].
//!
//! Direct analogue of the reference implementation's `BFT::PatchBuffer`:
//! decompress, walk instructions, apply each one. The source submitted one
//! `Threader` job per instruction since every instruction writes a disjoint
//! `target_index` range by construction; this port does the same against a
//! [`WorkerPool`], using a raw-pointer handle to let independent instructions
//! write into disjoint slices of the same output buffer concurrently.

use std::sync::{Arc, Mutex};

use crate::codec;
use crate::error::{Error, Result};
use crate::instruction::Instruction;
use crate::membuf::{Buffer, MemoryRange, MemoryRangeMut};
use crate::util::count_cores;
use crate::workerpool::WorkerPool;

const MAGIC: &[u8; 16] = b"yatta diff\0\0\0\0\0\0";
const HEADER_LEN: usize = 24;

/// A `Send`/`Sync` handle onto a fixed-size byte buffer, used to let
/// independent [`WorkerPool`] jobs write into disjoint ranges of the same
/// allocation without a lock.
///
/// # Safety contract
///
/// Every instruction produced by [`crate::differ::diff`] writes a
/// `target_index` range disjoint from every other instruction's, so
/// concurrent jobs never touch the same byte. This invariant is the crate's
/// to uphold (it is not checked here); a corrupted or hand-crafted
/// instruction stream with overlapping ranges would race, not crash — LZ4
/// block decode failures and bounds checks catch malformed streams before
/// they reach this point, but overlap within an otherwise well-formed stream
/// is outside what can be statically ruled out.
struct SharedOut {
    ptr: *mut u8,
    len: usize,
}

unsafe impl Send for SharedOut {}
unsafe impl Sync for SharedOut {}

impl SharedOut {
    fn range_mut(&self) -> MemoryRangeMut<'static> {
        // SAFETY: the pointer is valid for `len` bytes for the lifetime of
        // the `Buffer` this was carved from, which outlives every job
        // submitted against it (the pool is joined before the buffer is
        // returned to the caller).
        let slice = unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) };
        MemoryRangeMut::new(slice)
    }
}

/// Apply a framed `"yatta diff"` artifact produced by [`crate::differ::diff`]
/// against `source`, returning the reconstructed target.
///
/// Fails with [`Error::BadMagic`]/[`Error::Truncated`] if `diff` isn't a
/// well-formed diff artifact, [`Error::DecompressionFailed`] if its payload
/// doesn't decompress, or [`Error::UnknownInstructionTag`] if a decoded
/// instruction's tag byte isn't `C`, `I`, or `R`.
pub fn patch(source: MemoryRange<'_>, diff: MemoryRange<'_>) -> Result<Buffer> {
    patch_with_threads(source, diff, count_cores())
}

/// Like [`patch`], but with an explicit cap on how many worker threads apply
/// instructions concurrently.
pub fn patch_with_threads(source: MemoryRange<'_>, diff: MemoryRange<'_>, max_threads: usize) -> Result<Buffer> {
    if diff.size() < HEADER_LEN {
        return Err(Error::Truncated);
    }

    let mut found = [0u8; 16];
    diff.read_raw(&mut found, 16, 0)?;
    if &found != MAGIC {
        return Err(Error::BadMagic {
            expected: "yatta diff",
            found,
        });
    }

    let target_size: u64 = diff.read_as(16)?;
    let target_size = target_size as usize;

    let payload = diff.sub_range(HEADER_LEN, diff.size() - HEADER_LEN)?;
    let decompressed = codec::decompress(payload)?;

    let mut instructions = Vec::new();
    let range = decompressed.as_range();
    let mut offset = 0usize;
    while offset < range.size() {
        let (inst, next) = Instruction::decode(range, offset)?;
        instructions.push(inst);
        offset = next;
    }

    let mut out = Buffer::with_size(target_size);
    let shared = Arc::new(SharedOut {
        ptr: out.as_mut_slice().as_mut_ptr(),
        len: target_size,
    });
    let source_data: Arc<Vec<u8>> = Arc::new(source.as_slice().to_vec());

    {
        let pool = WorkerPool::new(max_threads);
        for inst in instructions {
            let shared = Arc::clone(&shared);
            let source_data = Arc::clone(&source_data);
            pool.submit(move || {
                let mut target = shared.range_mut();
                inst.apply(&mut target, MemoryRange::new(&source_data));
            });
        }
        pool.prepare_for_shutdown();
        pool.wait_idle();
    }

    Ok(out)
}
