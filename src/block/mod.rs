//! LZ4 block compression and decompression.
//!
//! This module contains the core LZ4 block-format engine, ported from lz4.c
//! v1.10.0. Only the one-shot entry points are kept here — [`codec::Codec`]
//! (the framed compress/decompress component) is the only caller; the
//! streaming and dictionary APIs the original engine also exposed have no
//! caller in this crate and were dropped in the final trim.
//!
//! [`codec::Codec`]: crate::codec::Codec

pub mod compress;
pub mod decompress_api;
pub mod decompress_core;
pub mod types;

// Re-export the items `codec` actually calls.
pub use compress::{compress_bound, compress_default, Lz4Error};
pub use decompress_api::decompress_safe;
pub use decompress_core::DecompressError;
