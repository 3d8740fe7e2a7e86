//! On-disk record describing one file's change within a directory delta.
//!
//! Wire layout mirrors spec.md §3's `PatchFileEntry` and the field order the
//! reference implementation's `writeInstructions` lambda in
//! `original_source/src/DirectoryTools.cpp` writes: path length, path bytes,
//! op flag, source hash, target hash, instruction length, instruction bytes.

use crate::error::{Error, Result};
use crate::membuf::MemoryRange;

/// What happened to a file between the old and new side of a directory diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOp {
    /// File exists on both sides with different contents.
    Updated,
    /// File exists only on the new side.
    New,
    /// File exists only on the old side.
    Deleted,
}

impl PatchOp {
    fn tag(self) -> u8 {
        match self {
            PatchOp::Updated => b'U',
            PatchOp::New => b'N',
            PatchOp::Deleted => b'D',
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            b'U' => Ok(PatchOp::Updated),
            b'N' => Ok(PatchOp::New),
            b'D' => Ok(PatchOp::Deleted),
            // Reuses the instruction-tag error kind: both are a one-byte
            // discriminant validated against a small fixed set, and spec.md
            // §7 has no separate error kind for a bad op byte.
            other => Err(Error::UnknownInstructionTag(other)),
        }
    }
}

/// One file's change record within a `"yatta patch"` artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFileEntry {
    pub relative_path: String,
    pub op: PatchOp,
    pub source_hash: u64,
    pub target_hash: u64,
    pub instruction_bytes: Vec<u8>,
}

impl PatchFileEntry {
    /// Append this entry's wire encoding to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let path_bytes = self.relative_path.as_bytes();
        out.extend_from_slice(&(path_bytes.len() as u64).to_ne_bytes());
        out.extend_from_slice(path_bytes);
        out.push(self.op.tag());
        out.extend_from_slice(&self.source_hash.to_ne_bytes());
        out.extend_from_slice(&self.target_hash.to_ne_bytes());
        out.extend_from_slice(&(self.instruction_bytes.len() as u64).to_ne_bytes());
        out.extend_from_slice(&self.instruction_bytes);
    }

    /// Decode one entry starting at `offset` in `range`, returning the entry
    /// and the offset immediately after it.
    pub fn decode(range: MemoryRange<'_>, offset: usize) -> Result<(Self, usize)> {
        let mut off = offset;

        let path_len: u64 = range.read_as(off)?;
        off += 8;
        let path_len = path_len as usize;
        if !range.is_within(off, path_len) {
            return Err(Error::Truncated);
        }
        let mut path_bytes = vec![0u8; path_len];
        range.read_raw(&mut path_bytes, path_len, off)?;
        off += path_len;
        let relative_path = String::from_utf8(path_bytes).map_err(|_| Error::Truncated)?;

        let mut tag = [0u8; 1];
        range.read_raw(&mut tag, 1, off)?;
        off += 1;
        let op = PatchOp::from_tag(tag[0])?;

        let source_hash: u64 = range.read_as(off)?;
        off += 8;
        let target_hash: u64 = range.read_as(off)?;
        off += 8;

        let instr_len: u64 = range.read_as(off)?;
        off += 8;
        let instr_len = instr_len as usize;
        if !range.is_within(off, instr_len) {
            return Err(Error::Truncated);
        }
        let mut instruction_bytes = vec![0u8; instr_len];
        range.read_raw(&mut instruction_bytes, instr_len, off)?;
        off += instr_len;

        Ok((
            PatchFileEntry {
                relative_path,
                op,
                source_hash,
                target_hash,
                instruction_bytes,
            },
            off,
        ))
    }
}
