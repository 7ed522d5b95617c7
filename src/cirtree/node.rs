//! Byte-exact parsing of CIR-tree headers and nodes.
//!
//! Mirrors `ghuls-bigtools/src/bbi/bbiread.rs::search_overlapping_blocks` and
//! its sibling constant/entry layout, generalized to return owned node data
//! instead of immediately recursing (see `cirtree::traverse`).

use byteordered::Endianness;
use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::request::CoordRequest;

pub const CIR_TREE_MAGIC: u32 = 0x2468_ACE0;

const NODE_HEADER_LEN: usize = 4;
const INTERNAL_ENTRY_LEN: usize = 24;
const LEAF_ENTRY_LEN: usize = 32;
/// The 48-byte tree header at `cirTreeOffset`.
pub const CIR_HEADER_LEN: usize = 48;

/// The 48-byte header at the start of the CIR tree. Only `block_size` is
/// consumed by the traverser; the rest is kept for diagnostics/CLI display.
#[derive(Clone, Copy, Debug)]
pub struct CirHeader {
    pub magic: u32,
    pub block_size: u32,
    pub item_count: u64,
    pub start_chrom_ix: u32,
    pub start_base: u32,
    pub end_chrom_ix: u32,
    pub end_base: u32,
    pub end_file_offset: u64,
    pub items_per_slot: u32,
}

pub fn parse_header(buf: &[u8], endianness: Endianness) -> Result<CirHeader, Error> {
    if buf.len() < CIR_HEADER_LEN {
        return Err(Error::ParseFailure(format!(
            "cir tree header too short: {} < {}",
            buf.len(),
            CIR_HEADER_LEN
        )));
    }
    let mut b = Bytes::copy_from_slice(&buf[..CIR_HEADER_LEN]);
    let (magic, block_size, item_count, start_chrom_ix, start_base, end_chrom_ix, end_base, end_file_offset, items_per_slot) =
        match endianness {
            Endianness::Big => (
                b.get_u32(),
                b.get_u32(),
                b.get_u64(),
                b.get_u32(),
                b.get_u32(),
                b.get_u32(),
                b.get_u32(),
                b.get_u64(),
                b.get_u32(),
            ),
            Endianness::Little => (
                b.get_u32_le(),
                b.get_u32_le(),
                b.get_u64_le(),
                b.get_u32_le(),
                b.get_u32_le(),
                b.get_u32_le(),
                b.get_u32_le(),
                b.get_u64_le(),
                b.get_u32_le(),
            ),
        };
    if magic != CIR_TREE_MAGIC {
        return Err(Error::ParseFailure(format!(
            "invalid cir tree magic: {magic:#x}"
        )));
    }
    Ok(CirHeader {
        magic,
        block_size,
        item_count,
        start_chrom_ix,
        start_base,
        end_chrom_ix,
        end_base,
        end_file_offset,
        items_per_slot,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InternalEntry {
    pub start_chrom_ix: u32,
    pub start_base: u32,
    pub end_chrom_ix: u32,
    pub end_base: u32,
    pub child_offset: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeafEntry {
    pub start_chrom_ix: u32,
    pub start_base: u32,
    pub end_chrom_ix: u32,
    pub end_base: u32,
    pub data_offset: u64,
    pub data_size: u64,
}

/// One decoded CIR-tree node (design note §9: sum-typed, not a shared struct
/// with an `is_leaf` flag callers must remember to check).
#[derive(Clone, Debug)]
pub enum CirNode {
    Leaf(Vec<LeafEntry>),
    Internal(Vec<InternalEntry>),
}

/// Parse one node from `buf`, which must start at the node's 4-byte header.
/// `buf` may be longer than the node (it is a slice of a merged-range read);
/// only the bytes the header's `cnt` declares are consumed.
pub fn parse_node(buf: &[u8], endianness: Endianness) -> Result<CirNode, Error> {
    if buf.len() < NODE_HEADER_LEN {
        return Err(Error::ParseFailure(format!(
            "cir node header too short: {} < {}",
            buf.len(),
            NODE_HEADER_LEN
        )));
    }
    let is_leaf = buf[0];
    let count = match endianness {
        Endianness::Big => u16::from_be_bytes([buf[2], buf[3]]),
        Endianness::Little => u16::from_le_bytes([buf[2], buf[3]]),
    };
    let body = &buf[NODE_HEADER_LEN..];

    match is_leaf {
        1 => {
            let need = count as usize * LEAF_ENTRY_LEN;
            if body.len() < need {
                return Err(Error::ParseFailure(format!(
                    "cir leaf node body too short: {} < {}",
                    body.len(),
                    need
                )));
            }
            let mut entries = Vec::with_capacity(count as usize);
            for i in 0..count as usize {
                let e = &body[i * LEAF_ENTRY_LEN..(i + 1) * LEAF_ENTRY_LEN];
                entries.push(parse_leaf_entry(e, endianness));
            }
            Ok(CirNode::Leaf(entries))
        }
        0 => {
            let need = count as usize * INTERNAL_ENTRY_LEN;
            if body.len() < need {
                return Err(Error::ParseFailure(format!(
                    "cir internal node body too short: {} < {}",
                    body.len(),
                    need
                )));
            }
            let mut entries = Vec::with_capacity(count as usize);
            for i in 0..count as usize {
                let e = &body[i * INTERNAL_ENTRY_LEN..(i + 1) * INTERNAL_ENTRY_LEN];
                entries.push(parse_internal_entry(e, endianness));
            }
            Ok(CirNode::Internal(entries))
        }
        other => Err(Error::ParseFailure(format!(
            "unexpected cir node isLeaf byte: {other}"
        ))),
    }
}

fn get_u32(b: &[u8], endianness: Endianness) -> u32 {
    match endianness {
        Endianness::Big => u32::from_be_bytes(b.try_into().unwrap()),
        Endianness::Little => u32::from_le_bytes(b.try_into().unwrap()),
    }
}

fn get_u64(b: &[u8], endianness: Endianness) -> u64 {
    match endianness {
        Endianness::Big => u64::from_be_bytes(b.try_into().unwrap()),
        Endianness::Little => u64::from_le_bytes(b.try_into().unwrap()),
    }
}

fn parse_internal_entry(b: &[u8], endianness: Endianness) -> InternalEntry {
    InternalEntry {
        start_chrom_ix: get_u32(&b[0..4], endianness),
        start_base: get_u32(&b[4..8], endianness),
        end_chrom_ix: get_u32(&b[8..12], endianness),
        end_base: get_u32(&b[12..16], endianness),
        child_offset: get_u64(&b[16..24], endianness),
    }
}

fn parse_leaf_entry(b: &[u8], endianness: Endianness) -> LeafEntry {
    LeafEntry {
        start_chrom_ix: get_u32(&b[0..4], endianness),
        start_base: get_u32(&b[4..8], endianness),
        end_chrom_ix: get_u32(&b[8..12], endianness),
        end_base: get_u32(&b[12..16], endianness),
        data_offset: get_u64(&b[16..24], endianness),
        data_size: get_u64(&b[24..32], endianness),
    }
}

/// Pruning predicate (spec §4.5): does an entry spanning
/// `[startChrom:startBase, endChrom:endBase]` touch `req` on `req.chromId`?
pub fn overlaps(
    start_chrom_ix: u32,
    start_base: u32,
    end_chrom_ix: u32,
    end_base: u32,
    req: &CoordRequest,
) -> bool {
    let req_chrom = req.chrom_id;
    let before_or_at_end = start_chrom_ix < req_chrom
        || (start_chrom_ix == req_chrom && (start_base as i64) <= req.end as i64);
    let after_or_at_start = end_chrom_ix > req_chrom
        || (end_chrom_ix == req_chrom && (end_base as i64) >= req.start as i64);
    before_or_at_end && after_or_at_start
}
