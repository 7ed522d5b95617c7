//! C6: BlockDecoder — parses one fetched (post-inflate) data block into
//! features, dispatched by the block's type tag.

pub mod bigbed;
pub mod bigwig;
pub mod summary;

use byteordered::Endianness;

use crate::error::Error;
use crate::feature::Feature;
use crate::request::CoordRequest;

/// Which on-disk layout a fetched data block uses. Mirrors the external
/// header's `blockType`/`filetype` (see `header::BlockType`), but is passed
/// explicitly per query since a single bbi file's zoom levels are always
/// `Summary` even when its full-resolution data is `BigWig`/`BigBed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Summary,
    BigWig,
    BigBed,
}

pub fn decode_block(
    kind: BlockKind,
    buf: &[u8],
    start_offset: u64,
    endianness: Endianness,
    req: &CoordRequest,
) -> Result<Vec<Feature>, Error> {
    match kind {
        BlockKind::Summary => summary::decode(buf, endianness, req),
        BlockKind::BigWig => bigwig::decode(buf, endianness, req),
        BlockKind::BigBed => bigbed::decode(buf, start_offset, endianness, req),
    }
}
