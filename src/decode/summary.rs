//! §4.6.1: Summary (zoom) record decoding.
//!
//! Grounded on `ghuls-bigtools/src/bbi/bbiread.rs::get_zoom_block_values`
//! (identical 32-byte record layout and big/little dispatch), adapted to
//! project into the crate's uniform `Feature` type instead of `ZoomRecord`.

use byteordered::Endianness;
use bytes::Buf;

use crate::error::Error;
use crate::feature::{coord_filter, Feature};
use crate::request::CoordRequest;

pub const SUMMARY_RECORD_LEN: usize = 32;

pub fn decode(buf: &[u8], endianness: Endianness, req: &CoordRequest) -> Result<Vec<Feature>, Error> {
    if buf.len() % SUMMARY_RECORD_LEN != 0 {
        return Err(Error::ParseFailure(format!(
            "summary block length {} is not a multiple of {}",
            buf.len(),
            SUMMARY_RECORD_LEN
        )));
    }

    let count = buf.len() / SUMMARY_RECORD_LEN;
    let mut features = Vec::new();
    let mut b = bytes::Bytes::copy_from_slice(buf);

    for _ in 0..count {
        let (chrom_id, start, end, valid_cnt, min_score, max_score, sum_data, _sum_sq) =
            match endianness {
                Endianness::Big => (
                    b.get_u32(),
                    b.get_u32(),
                    b.get_u32(),
                    b.get_u32(),
                    b.get_f32(),
                    b.get_f32(),
                    b.get_f32(),
                    b.get_f32(),
                ),
                Endianness::Little => (
                    b.get_u32_le(),
                    b.get_u32_le(),
                    b.get_u32_le(),
                    b.get_u32_le(),
                    b.get_f32_le(),
                    b.get_f32_le(),
                    b.get_f32_le(),
                    b.get_f32_le(),
                ),
            };

        if chrom_id != req.chrom_id {
            continue;
        }

        let feature = Feature {
            start: start as i32,
            end: end as i32,
            score: sum_data / (valid_cnt.max(1) as f32),
            min_score: Some(min_score),
            max_score: Some(max_score),
            summary: true,
            rest: None,
            unique_id: None,
        };
        if coord_filter(&feature, req) {
            features.push(feature);
        }
    }

    Ok(features)
}
