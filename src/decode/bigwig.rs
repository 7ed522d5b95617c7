//! §4.6.3: BigWig value block decoding — fixed-step, variable-step, and
//! graph layouts.
//!
//! Grounded on `ghuls-bigtools/src/bbi/bbiread.rs`'s byte-exact block-header
//! dispatch style (not present verbatim for FSTEP/VSTEP/GRAPH in the
//! retrieved teacher slice; built from spec §4.6.3 in that idiom). The
//! unknown block type case returns no features after a `warn!`, per spec
//! §4.6.3.

use byteordered::Endianness;
use bytes::{Buf, Bytes};
use log::warn;

use crate::error::Error;
use crate::feature::{coord_filter, Feature};
use crate::request::CoordRequest;

const BLOCK_HEADER_LEN: usize = 24;

const BLOCK_TYPE_GRAPH: u8 = 1;
const BLOCK_TYPE_VSTEP: u8 = 2;
const BLOCK_TYPE_FSTEP: u8 = 3;

pub fn decode(buf: &[u8], endianness: Endianness, req: &CoordRequest) -> Result<Vec<Feature>, Error> {
    if buf.len() < BLOCK_HEADER_LEN {
        return Err(Error::ParseFailure(format!(
            "bigWig block header too short: {} < {BLOCK_HEADER_LEN}",
            buf.len()
        )));
    }

    let mut h = Bytes::copy_from_slice(&buf[..BLOCK_HEADER_LEN]);
    let (_chrom_id, block_start, _block_end, item_step, item_span, block_type, _reserved, item_count) =
        match endianness {
            Endianness::Big => (
                h.get_u32(),
                h.get_i32(),
                h.get_i32(),
                h.get_u32(),
                h.get_u32(),
                h.get_u8(),
                h.get_u8(),
                h.get_u16(),
            ),
            Endianness::Little => (
                h.get_u32_le(),
                h.get_i32_le(),
                h.get_i32_le(),
                h.get_u32_le(),
                h.get_u32_le(),
                h.get_u8(),
                h.get_u8(),
                h.get_u16_le(),
            ),
        };

    let items = &buf[BLOCK_HEADER_LEN..];

    let (item_len, parse_item): (
        usize,
        fn(&[u8], Endianness, i32, u32, u32, usize) -> (i32, i32, f32),
    ) = match block_type {
        BLOCK_TYPE_FSTEP => (4, parse_fstep_item),
        BLOCK_TYPE_VSTEP => (8, parse_vstep_item),
        BLOCK_TYPE_GRAPH => (12, parse_graph_item),
        other => {
            warn!("unknown bigWig block type {other}");
            return Ok(Vec::new());
        }
    };

    let need = item_count as usize * item_len;
    if items.len() < need {
        return Err(Error::ParseFailure(format!(
            "bigWig block body too short: {} < {need}",
            items.len()
        )));
    }

    let mut features = Vec::with_capacity(item_count as usize);
    for i in 0..item_count as usize {
        let item_buf = &items[i * item_len..(i + 1) * item_len];
        let (start, end, score) = parse_item(item_buf, endianness, block_start, item_step, item_span, i);
        let feature = Feature::new(start, end, score);
        if coord_filter(&feature, req) {
            features.push(feature);
        }
    }

    Ok(features)
}

fn parse_fstep_item(
    buf: &[u8],
    endianness: Endianness,
    block_start: i32,
    item_step: u32,
    item_span: u32,
    index: usize,
) -> (i32, i32, f32) {
    let score = match endianness {
        Endianness::Big => f32::from_be_bytes(buf.try_into().unwrap()),
        Endianness::Little => f32::from_le_bytes(buf.try_into().unwrap()),
    };
    let start = block_start + (index as u32 * item_step) as i32;
    (start, start + item_span as i32, score)
}

fn parse_vstep_item(
    buf: &[u8],
    endianness: Endianness,
    _block_start: i32,
    _item_step: u32,
    item_span: u32,
    _index: usize,
) -> (i32, i32, f32) {
    let mut b = Bytes::copy_from_slice(buf);
    let (start, score) = match endianness {
        Endianness::Big => (b.get_i32(), b.get_f32()),
        Endianness::Little => (b.get_i32_le(), b.get_f32_le()),
    };
    (start, start + item_span as i32, score)
}

fn parse_graph_item(
    buf: &[u8],
    endianness: Endianness,
    _block_start: i32,
    _item_step: u32,
    _item_span: u32,
    _index: usize,
) -> (i32, i32, f32) {
    let mut b = Bytes::copy_from_slice(buf);
    match endianness {
        Endianness::Big => (b.get_i32(), b.get_i32(), b.get_f32()),
        Endianness::Little => (b.get_i32_le(), b.get_i32_le(), b.get_f32_le()),
    }
}
