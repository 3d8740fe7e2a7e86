//! Byte-range primitives: owning [`Buffer`] and non-owning
//! [`MemoryRange`]/[`MemoryRangeMut`] views over it.
//!
//! Every other component in this crate is built on top of these two
//! concepts: public APIs accept `MemoryRange` for inputs and return `Buffer`
//! for outputs, so ownership is always unambiguous at a call boundary.

pub mod buffer;
pub mod range;

pub use buffer::Buffer;
pub use range::{MemoryRange, MemoryRangeMut};
