//! §4.6.2: BigBed record decoding.
//!
//! Grounded on `ghuls-bigtools/src/bbi/bigbedread.rs`'s record-walking loop
//! (NUL-terminated `rest` field, record-relative offset bookkeeping),
//! adapted to emit the crate's uniform `Feature` type with a synthesized
//! `unique_id` for cross-block dedup instead of a `BedEntry`.

use byteordered::Endianness;
use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::feature::{coord_filter, Feature};
use crate::request::CoordRequest;

const RECORD_FIXED_LEN: usize = 12;

pub fn decode(
    buf: &[u8],
    start_offset: u64,
    endianness: Endianness,
    req: &CoordRequest,
) -> Result<Vec<Feature>, Error> {
    let mut features = Vec::new();
    let mut pos = 0usize;

    while pos < buf.len() {
        if buf.len() - pos < RECORD_FIXED_LEN {
            return Err(Error::ParseFailure(format!(
                "bigBed record truncated at byte {pos}: {} bytes remain, need {RECORD_FIXED_LEN}",
                buf.len() - pos
            )));
        }
        let record_start = pos;
        let mut b = Bytes::copy_from_slice(&buf[pos..pos + RECORD_FIXED_LEN]);
        let (_chrom_id, start, end) = match endianness {
            Endianness::Big => (b.get_u32(), b.get_i32(), b.get_i32()),
            Endianness::Little => (b.get_u32_le(), b.get_i32_le(), b.get_i32_le()),
        };
        pos += RECORD_FIXED_LEN;

        let nul_pos = buf[pos..]
            .iter()
            .position(|&byte| byte == 0)
            .ok_or_else(|| Error::ParseFailure("bigBed rest field missing NUL terminator".to_string()))?;
        let rest = Bytes::copy_from_slice(&buf[pos..pos + nul_pos]);
        pos += nul_pos + 1;

        let unique_id = format!("bb-{}", start_offset + record_start as u64);
        let feature = Feature {
            start,
            end,
            score: 0.0,
            min_score: None,
            max_score: None,
            summary: false,
            rest: Some(rest),
            unique_id: Some(unique_id),
        };
        if coord_filter(&feature, req) {
            features.push(feature);
        }
    }

    Ok(features)
}
