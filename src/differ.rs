//! Computes an instruction stream that transforms *source* bytes into
//! *target* bytes.
//!
//! This is a direct port of `BFT::DiffBuffers` from the reference
//! implementation's `BufferTools.cpp`: a windowed, 8-byte-stride chunk
//! matcher (phase 1) followed by an insert-to-repeat rewrite pass (phase 2),
//! both parallelized over [`WorkerPool`]. The window size, the offset-32
//! sentinel heuristic, and the 36-byte repeat threshold are all preserved
//! verbatim from the source, per spec Open Question 3 ("a faithful port
//! preserves it verbatim because the produced artifact format encodes the
//! resulting instruction stream").

use std::sync::{Arc, Mutex};

use crate::codec;
use crate::error::{Error, Result};
use crate::instruction::Instruction;
use crate::membuf::{Buffer, MemoryRange};
use crate::workerpool::WorkerPool;

const MAGIC: &[u8; 16] = b"yatta diff\0\0\0\0\0\0";
const HEADER_LEN: usize = 24; // 16-byte magic + 8-byte target size
const WINDOW: usize = 4096;

/// One contiguous equal-byte region found between a source and target
/// window. Indices are absolute offsets into the full source/target buffers.
struct MatchInfo {
    length: usize,
    src_start: usize,
    tgt_start: usize,
}

/// Diff `source` against `target`, returning a framed `"yatta diff"`
/// artifact that [`crate::patcher::patch`] can replay against `source` to
/// reproduce `target` exactly.
///
/// `max_threads` bounds the [`WorkerPool`] used to parallelize chunk
/// matching (phase 1) and insert-to-repeat rewriting (phase 2); it is
/// clamped to `[1, hardware_parallelism]` by the pool itself.
///
/// Fails with [`Error::EmptyInput`] if both `source` and `target` are empty.
pub fn diff(source: MemoryRange<'_>, target: MemoryRange<'_>, max_threads: usize) -> Result<Buffer> {
    if source.empty() && target.empty() {
        return Err(Error::EmptyInput);
    }

    let source_data: Arc<Vec<u8>> = Arc::new(source.as_slice().to_vec());
    let target_data: Arc<Vec<u8>> = Arc::new(target.as_slice().to_vec());
    let instructions: Arc<Mutex<Vec<Instruction>>> = Arc::new(Mutex::new(Vec::new()));

    {
        let pool = WorkerPool::new(max_threads);

        // Phase 1: windowed parallel chunk matching.
        let mut src_cur = 0usize;
        let mut tgt_cur = 0usize;
        while src_cur < source_data.len() && tgt_cur < target_data.len() {
            let window_size = WINDOW
                .min(source_data.len() - src_cur)
                .min(target_data.len() - tgt_cur);
            let source_data = Arc::clone(&source_data);
            let target_data = Arc::clone(&target_data);
            let instructions = Arc::clone(&instructions);
            pool.submit(move || {
                match_window(&source_data, &target_data, src_cur, tgt_cur, window_size, &instructions);
            });
            src_cur += window_size;
            tgt_cur += window_size;
        }
        pool.wait_idle();

        if tgt_cur < target_data.len() {
            let trailing = target_data[tgt_cur..].to_vec();
            instructions.lock().unwrap().push(Instruction::Insert {
                target_index: tgt_cur as u64,
                data: trailing,
            });
        }

        // Phase 2: insert-to-repeat rewriting, one job per phase-1 insert.
        let phase1_count = instructions.lock().unwrap().len();
        for i in 0..phase1_count {
            let instructions = Arc::clone(&instructions);
            pool.submit(move || {
                rewrite_insert_to_repeat(&instructions, i);
            });
        }
        pool.prepare_for_shutdown();
        pool.wait_idle();
    } // pool joins here

    let mut instructions = Arc::try_unwrap(instructions)
        .map(|m| m.into_inner().unwrap())
        .unwrap_or_else(|arc| arc.lock().unwrap().clone());

    // A purely-deletion diff (empty target) produces zero instructions;
    // guarantee a non-empty wire payload so the codec never sees an empty
    // buffer. Applying this sentinel against a zero-length target is a no-op.
    if instructions.is_empty() {
        instructions.push(Instruction::Insert {
            target_index: 0,
            data: Vec::new(),
        });
    }

    let mut raw = Vec::new();
    for inst in &instructions {
        inst.encode(&mut raw);
    }

    let compressed = codec::compress(MemoryRange::new(&raw))?;

    let mut out = Buffer::with_size(HEADER_LEN + compressed.size());
    out.write_raw(MAGIC, 0)?;
    out.write_as::<u64>(target_data.len() as u64, 16)?;
    out.write_raw(compressed.as_slice(), HEADER_LEN)?;
    out.resize(HEADER_LEN + compressed.size());
    out.shrink();
    Ok(out)
}

/// Builds the `"yatta diff"` artifact for an empty source and an empty
/// target directly, bypassing [`diff`]'s `EmptyInput` rejection. Callers that
/// already know both sides are empty (e.g. a newly added zero-byte file) use
/// this instead of feeding `diff` an input it is defined to refuse.
pub(crate) fn empty_diff() -> Result<Buffer> {
    let instructions = [Instruction::Insert {
        target_index: 0,
        data: Vec::new(),
    }];
    let mut raw = Vec::new();
    for inst in &instructions {
        inst.encode(&mut raw);
    }
    let compressed = codec::compress(MemoryRange::new(&raw))?;
    let mut out = Buffer::with_size(HEADER_LEN + compressed.size());
    out.write_raw(MAGIC, 0)?;
    out.write_as::<u64>(0u64, 16)?;
    out.write_raw(compressed.as_slice(), HEADER_LEN)?;
    out.resize(HEADER_LEN + compressed.size());
    out.shrink();
    Ok(out)
}

/// Reads a native-endian `u64` word at `offset` in `slice`. Caller
/// guarantees `offset + 8 <= slice.len()`.
fn word_at(slice: &[u8], offset: usize) -> u64 {
    u64::from_ne_bytes(slice[offset..offset + 8].try_into().unwrap())
}

/// Match one (source window, target window) pair and push the resulting
/// Copy/Insert instructions, in window order, under `instructions`' mutex.
fn match_window(
    source_data: &[u8],
    target_data: &[u8],
    src_cur: usize,
    tgt_cur: usize,
    window_size: usize,
    instructions: &Mutex<Vec<Instruction>>,
) {
    let src_slice = &source_data[src_cur..];
    let tgt_slice = &target_data[tgt_cur..];

    let mut best_continuous = 0usize;
    let mut best_match_count = window_size;
    let mut best_series: Vec<MatchInfo> = Vec::new();

    let mut i1 = 0usize;
    while i1 + 8 < window_size {
        let a = word_at(src_slice, i1);
        let mut series: Vec<MatchInfo> = Vec::new();
        let mut largest_continuous = 0usize;

        let mut i2 = 0usize;
        while i2 + 8 < window_size {
            let b = word_at(tgt_slice, i2);
            let mut advance = 8usize;
            if a == b {
                let sentinel_ok = i1 + 32 < src_slice.len()
                    && i2 + 32 < tgt_slice.len()
                    && src_slice[i1 + 32] == tgt_slice[i2 + 32];
                if sentinel_ok {
                    let mut offset = 8usize;
                    while i1 + offset < window_size
                        && i2 + offset < window_size
                        && src_slice[i1 + offset] == tgt_slice[i2 + offset]
                    {
                        offset += 1;
                    }
                    if offset >= 32 {
                        series.push(MatchInfo {
                            length: offset,
                            src_start: src_cur + i1,
                            tgt_start: tgt_cur + i2,
                        });
                        if offset > largest_continuous {
                            largest_continuous = offset;
                        }
                    }
                    advance = offset;
                }
            }
            i2 += advance;
        }

        if largest_continuous > best_continuous && series.len() <= best_match_count {
            best_continuous = largest_continuous;
            best_match_count = series.len();
            best_series = series;
        }
        if best_continuous >= window_size {
            break;
        }
        i1 += 8;
    }

    let mut local = Vec::new();
    if best_series.is_empty() {
        local.push(Instruction::Insert {
            target_index: tgt_cur as u64,
            data: tgt_slice[..window_size].to_vec(),
        });
    } else {
        let mut last_match_end = tgt_cur;
        for m in &best_series {
            let new_data_len = m.tgt_start - last_match_end;
            if new_data_len > 0 {
                local.push(Instruction::Insert {
                    target_index: last_match_end as u64,
                    data: target_data[last_match_end..last_match_end + new_data_len].to_vec(),
                });
            }
            local.push(Instruction::Copy {
                target_index: m.tgt_start as u64,
                source_begin: m.src_start as u64,
                source_end: (m.src_start + m.length) as u64,
            });
            last_match_end = m.tgt_start + m.length;
        }
        let new_data_len = (tgt_cur + window_size).saturating_sub(last_match_end);
        if new_data_len > 0 {
            local.push(Instruction::Insert {
                target_index: last_match_end as u64,
                data: target_data[last_match_end..last_match_end + new_data_len].to_vec(),
            });
        }
    }

    instructions.lock().unwrap().extend(local);
}

/// Rewrite a single phase-1 `Insert` at index `i` into a shorter `Insert`
/// plus `Insert`/`Repeat` splits wherever its data contains a run of more
/// than 36 repeated bytes.
///
/// The reference implementation expressed the "keep scanning after a split"
/// step with `x = ULLONG_MAX` relying on unsigned wraparound (spec Open
/// Question 2); here the restart is an explicit outer loop instead.
fn rewrite_insert_to_repeat(instructions: &Mutex<Vec<Instruction>>, i: usize) {
    loop {
        let mut guard = instructions.lock().unwrap();
        let (len, target_index) = match &guard[i] {
            Instruction::Insert { data, target_index } => (data.len(), *target_index),
            _ => return,
        };
        if len <= 36 {
            return;
        }

        // A run starting at `x` needs bytes `x..x+36` to all exist, so `x`
        // only ever scans up to `len - 36` (exclusive); the run itself, once
        // found, is extended all the way to `len`, not just to that bound.
        let x_bound = len - 36;
        let mut split = None;
        {
            let data = match &guard[i] {
                Instruction::Insert { data, .. } => data,
                _ => unreachable!(),
            };
            let mut x = 0usize;
            while x < x_bound {
                let value_at_x = data[x];
                if data[x + 36] != value_at_x {
                    x += 1;
                    continue;
                }
                let mut y = x + 1;
                while y < len && data[y] == value_at_x {
                    y += 1;
                }
                let length = y - x;
                if length > 36 {
                    split = Some((x, y, length, value_at_x));
                    break;
                }
                x = y;
            }
        }

        let Some((x, y, length, value_at_x)) = split else {
            return;
        };

        let data = match &guard[i] {
            Instruction::Insert { data, .. } => data.clone(),
            _ => unreachable!(),
        };
        let before = Instruction::Insert {
            target_index,
            data: data[..x].to_vec(),
        };
        let repeat = Instruction::Repeat {
            target_index: target_index + x as u64,
            count: length as u64,
            value: value_at_x,
        };
        guard[i] = Instruction::Insert {
            target_index: target_index + (x + length) as u64,
            data: data[y..].to_vec(),
        };
        guard.push(before);
        guard.push(repeat);
        drop(guard);
        // Loop restarts, rescanning the now-shorter insert for further runs.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patcher;

    fn instructions_of(diff_buf: &Buffer) -> Vec<Instruction> {
        let decompressed = codec::decompress(
            diff_buf
                .as_range()
                .sub_range(HEADER_LEN, diff_buf.size() - HEADER_LEN)
                .unwrap(),
        )
        .unwrap();
        let range = decompressed.as_range();
        let mut offset = 0;
        let mut out = Vec::new();
        while offset < range.size() {
            let (inst, next) = Instruction::decode(range, offset).unwrap();
            out.push(inst);
            offset = next;
        }
        out
    }

    #[test]
    fn s1_empty_source_produces_single_insert() {
        let diff_buf = diff(MemoryRange::new(&[]), MemoryRange::new(b"hello"), 2).unwrap();
        let insts = instructions_of(&diff_buf);
        assert_eq!(insts.len(), 1);
        assert!(matches!(&insts[0], Instruction::Insert { target_index: 0, data } if data == b"hello"));
        let patched = patcher::patch(MemoryRange::new(&[]), diff_buf.as_range()).unwrap();
        assert_eq!(patched.as_slice(), b"hello");
    }

    #[test]
    fn s2_identical_buffers_yield_only_copies() {
        let data = b"A".repeat(65);
        let diff_buf = diff(MemoryRange::new(&data), MemoryRange::new(&data), 2).unwrap();
        let insts = instructions_of(&diff_buf);
        assert!(insts.iter().all(|i| matches!(i, Instruction::Copy { .. })));
        let total: u64 = insts.iter().map(|i| i.effect_len()).sum();
        assert_eq!(total, 65);
        let patched = patcher::patch(MemoryRange::new(&data), diff_buf.as_range()).unwrap();
        assert_eq!(patched.as_slice(), data.as_slice());
    }

    #[test]
    fn s3_all_zero_to_all_repeat_collapses_to_one_repeat() {
        let source = vec![0u8; 1024];
        let target = vec![0x5Au8; 1024];
        let diff_buf = diff(MemoryRange::new(&source), MemoryRange::new(&target), 2).unwrap();
        let insts = instructions_of(&diff_buf);
        assert!(insts
            .iter()
            .any(|i| matches!(i, Instruction::Repeat { count: 1024, value: 0x5A, .. })));
        let patched = patcher::patch(MemoryRange::new(&source), diff_buf.as_range()).unwrap();
        assert_eq!(patched.as_slice(), target.as_slice());
    }

    #[test]
    fn s4_single_byte_flip_yields_small_diff() {
        let base = b"the quick brown fox jumps over the lazy dog".repeat(100);
        let mut flipped = base.clone();
        flipped[500] ^= 0xFF;
        let diff_buf = diff(MemoryRange::new(&base), MemoryRange::new(&flipped), 2).unwrap();
        let insts = instructions_of(&diff_buf);
        let raw_len: usize = insts.iter().map(|i| i.wire_size()).sum();
        assert!(raw_len <= 400, "uncompressed instruction stream was {raw_len} bytes");
        let patched = patcher::patch(MemoryRange::new(&base), diff_buf.as_range()).unwrap();
        assert_eq!(patched.as_slice(), flipped.as_slice());
    }

    #[test]
    fn round_trips_arbitrary_growth_and_shrinkage() {
        let source = b"0123456789".repeat(500);
        let mut target = source[100..].to_vec();
        target.extend_from_slice(b"some brand new tail content appended here");
        let diff_buf = diff(MemoryRange::new(&source), MemoryRange::new(&target), 4).unwrap();
        let patched = patcher::patch(MemoryRange::new(&source), diff_buf.as_range()).unwrap();
        assert_eq!(patched.as_slice(), target.as_slice());
    }

    #[test]
    fn empty_to_empty_is_rejected() {
        let err = diff(MemoryRange::new(&[]), MemoryRange::new(&[]), 1).unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[test]
    fn non_empty_source_to_empty_target_round_trips() {
        let source = b"goodbye cruel world".to_vec();
        let diff_buf = diff(MemoryRange::new(&source), MemoryRange::new(&[]), 1).unwrap();
        let patched = patcher::patch(MemoryRange::new(&source), diff_buf.as_range()).unwrap();
        assert_eq!(patched.size(), 0);
    }
}
