//! I/O seams: positional reads (C2), the deduplicating read cache (C3), and
//! the decompression seam (ambient A2).

pub mod cache;
pub mod inflate;
pub mod reader;

pub use cache::ReadCache;
pub use inflate::{Inflate, LibdeflateInflate};
pub use reader::{AbortToken, ByteReader, FileByteReader};
