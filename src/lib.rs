//! yatta — directory synchronization toolkit built on a ported LZ4 block
//! engine.
//!
//! Four framed artifact kinds move data through this crate: a compressed
//! blob ([`codec`]), a binary diff between two buffers ([`differ`]/[`patcher`]),
//! a packed directory snapshot, and a directory delta (the latter two on
//! [`vdir::VDir`]). Each artifact opens with a 16-byte NUL-padded magic string
//! so a caller handed an unknown blob can at least identify what it is before
//! trying to decode it.

pub mod block;
pub mod codec;
pub mod differ;
pub mod error;
pub mod hash;
pub mod instruction;
pub mod membuf;
pub mod observer;
pub mod patcher;
pub mod util;
pub mod vdir;
pub mod workerpool;

pub use codec::{compress, decompress};
pub use differ::diff;
pub use error::{Error, Result};
pub use hash::hash;
pub use instruction::Instruction;
pub use membuf::{Buffer, MemoryRange, MemoryRangeMut};
pub use observer::{NullObserver, Observer};
pub use patcher::patch;
pub use vdir::{ApplyReport, PatchFileEntry, PatchOp, VDir, VirtualFile};
pub use workerpool::WorkerPool;
