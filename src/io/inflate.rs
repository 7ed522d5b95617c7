//! Ambient A2: the decompression seam. BigWig/BigBed compress each data
//! block independently as a single zlib/deflate stream, sized to fit within
//! the header's `uncompress_buf_size`.
//!
//! Grounded on `ghuls-bigtools/src/bbi/bbiread.rs::get_block_data`, which
//! uses the same crate (`libdeflater`) and the same "pre-size the output
//! buffer from the header, then truncate to the actual decompressed length"
//! pattern.

use libdeflater::Decompressor;

use crate::error::Error;

/// Single-stream zlib inflate of one fetched data block.
pub trait Inflate: Send + Sync {
    fn inflate(&self, compressed: &[u8], uncompressed_size_hint: usize) -> Result<Vec<u8>, Error>;
}

#[derive(Default)]
pub struct LibdeflateInflate;

impl Inflate for LibdeflateInflate {
    fn inflate(&self, compressed: &[u8], uncompressed_size_hint: usize) -> Result<Vec<u8>, Error> {
        let mut decompressor = Decompressor::new();
        let mut out = vec![0u8; uncompressed_size_hint];
        let n = decompressor
            .zlib_decompress(compressed, &mut out)
            .map_err(|e| Error::DecompressionFailure(e.to_string()))?;
        out.truncate(n);
        Ok(out)
    }
}
