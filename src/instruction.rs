//! Edit instructions that transform source bytes into target bytes.
//!
//! The reference implementation (`Instructions.h`) modeled `Copy`/`Insert`/
//! `Repeat` as a class hierarchy dispatched through `std::variant` and
//! `std::visit`. Here they are one plain enum with an explicit one-byte wire
//! tag, matched exhaustively wherever they're encoded, decoded, or applied.

use crate::error::{Error, Result};
use crate::membuf::{MemoryRange, MemoryRangeMut};

/// One edit step in the instruction stream produced by [`crate::differ::diff`]
/// and consumed by [`crate::patcher::patch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Copy `source[source_begin..source_end]` into `target[target_index..]`.
    Copy {
        target_index: u64,
        source_begin: u64,
        source_end: u64,
    },
    /// Write `data` into `target[target_index..]`.
    Insert { target_index: u64, data: Vec<u8> },
    /// Write `value` repeated `count` times into `target[target_index..]`.
    Repeat {
        target_index: u64,
        count: u64,
        value: u8,
    },
}

const TAG_COPY: u8 = b'C';
const TAG_INSERT: u8 = b'I';
const TAG_REPEAT: u8 = b'R';

impl Instruction {
    /// The `target_index` this instruction writes starting at.
    pub fn target_index(&self) -> u64 {
        match self {
            Instruction::Copy { target_index, .. }
            | Instruction::Insert { target_index, .. }
            | Instruction::Repeat { target_index, .. } => *target_index,
        }
    }

    /// Number of bytes this instruction writes into the target.
    pub fn effect_len(&self) -> u64 {
        match self {
            Instruction::Copy {
                source_begin,
                source_end,
                ..
            } => source_end.saturating_sub(*source_begin),
            Instruction::Insert { data, .. } => data.len() as u64,
            Instruction::Repeat { count, .. } => *count,
        }
    }

    /// Serialized size in bytes: one tag byte plus the variant's fields.
    pub fn wire_size(&self) -> usize {
        match self {
            Instruction::Copy { .. } => 1 + 8 + 8 + 8,
            Instruction::Insert { data, .. } => 1 + 8 + 8 + data.len(),
            Instruction::Repeat { .. } => 1 + 8 + 8 + 1,
        }
    }

    /// Append this instruction's wire encoding to `out`.
    ///
    /// Layout (native-endian `u64` fields): tag byte first, then
    /// `Copy(target_index, source_begin, source_end)`,
    /// `Insert(target_index, len, bytes)`, or `Repeat(target_index, count, value)`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Instruction::Copy {
                target_index,
                source_begin,
                source_end,
            } => {
                out.push(TAG_COPY);
                out.extend_from_slice(&target_index.to_ne_bytes());
                out.extend_from_slice(&source_begin.to_ne_bytes());
                out.extend_from_slice(&source_end.to_ne_bytes());
            }
            Instruction::Insert { target_index, data } => {
                out.push(TAG_INSERT);
                out.extend_from_slice(&target_index.to_ne_bytes());
                out.extend_from_slice(&(data.len() as u64).to_ne_bytes());
                out.extend_from_slice(data);
            }
            Instruction::Repeat {
                target_index,
                count,
                value,
            } => {
                out.push(TAG_REPEAT);
                out.extend_from_slice(&target_index.to_ne_bytes());
                out.extend_from_slice(&count.to_ne_bytes());
                out.push(*value);
            }
        }
    }

    /// Decode one instruction starting at `offset` in `range`, returning the
    /// instruction and the offset immediately after it.
    pub fn decode(range: MemoryRange<'_>, offset: usize) -> Result<(Instruction, usize)> {
        let mut tag = [0u8; 1];
        range.read_raw(&mut tag, 1, offset)?;
        let mut off = offset + 1;

        match tag[0] {
            TAG_COPY => {
                let target_index: u64 = range.read_as(off)?;
                off += 8;
                let source_begin: u64 = range.read_as(off)?;
                off += 8;
                let source_end: u64 = range.read_as(off)?;
                off += 8;
                Ok((
                    Instruction::Copy {
                        target_index,
                        source_begin,
                        source_end,
                    },
                    off,
                ))
            }
            TAG_INSERT => {
                let target_index: u64 = range.read_as(off)?;
                off += 8;
                let len: u64 = range.read_as(off)?;
                off += 8;
                let len = len as usize;
                if !range.is_within(off, len) {
                    return Err(Error::Truncated);
                }
                let mut data = vec![0u8; len];
                range.read_raw(&mut data, len, off)?;
                off += len;
                Ok((
                    Instruction::Insert { target_index, data },
                    off,
                ))
            }
            TAG_REPEAT => {
                let target_index: u64 = range.read_as(off)?;
                off += 8;
                let count: u64 = range.read_as(off)?;
                off += 8;
                let mut value = [0u8; 1];
                range.read_raw(&mut value, 1, off)?;
                off += 1;
                Ok((
                    Instruction::Repeat {
                        target_index,
                        count,
                        value: value[0],
                    },
                    off,
                ))
            }
            other => Err(Error::UnknownInstructionTag(other)),
        }
    }

    /// Apply this instruction to `target`, reading from `source` for `Copy`.
    ///
    /// Every write is clamped to `target`'s size: an overlong instruction has
    /// its tail silently truncated rather than returning an error, matching
    /// spec.md §4.7. A `Copy` whose declared source range runs past
    /// `source`'s size has its read (and therefore its write) truncated the
    /// same way.
    pub fn apply(&self, target: &mut MemoryRangeMut<'_>, source: MemoryRange<'_>) {
        match self {
            Instruction::Copy {
                target_index,
                source_begin,
                source_end,
            } => {
                let target_index = *target_index as usize;
                let source_begin = *source_begin as usize;
                let source_end = (*source_end as usize).min(source.size());
                if source_begin >= source_end || target_index >= target.size() {
                    return;
                }
                let want = source_end - source_begin;
                let room = target.size() - target_index;
                let len = want.min(room);
                if len == 0 {
                    return;
                }
                let bytes = &source.as_slice()[source_begin..source_begin + len];
                let _ = target.write_raw(bytes, target_index);
            }
            Instruction::Insert { target_index, data } => {
                let target_index = *target_index as usize;
                if target_index >= target.size() {
                    return;
                }
                let room = target.size() - target_index;
                let len = data.len().min(room);
                if len == 0 {
                    return;
                }
                let _ = target.write_raw(&data[..len], target_index);
            }
            Instruction::Repeat {
                target_index,
                count,
                value,
            } => {
                let target_index = *target_index as usize;
                if target_index >= target.size() {
                    return;
                }
                let room = target.size() - target_index;
                let len = (*count as usize).min(room);
                if len == 0 {
                    return;
                }
                let filler = vec![*value; len];
                let _ = target.write_raw(&filler, target_index);
            }
        }
    }
}
