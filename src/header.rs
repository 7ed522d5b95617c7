//! A1 (ambient): byte-exact parse of the 64-byte BBI common header, the zoom
//! headers, and the chromosome B-tree.
//!
//! Grounded on `ghuls-bigtools/src/bbi/bbiread.rs::read_info` /
//! `read_zoom_headers` / `read_chrom_tree_block`: same field layout, same
//! magic-based endianness detection, same recursive B-tree walk. This is the
//! crate's only synchronous, non-cached file read — it runs once at open
//! time, outside the query path (spec §6.1).

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

use byteordered::Endianness;
use bytes::{Buf, BytesMut};

use crate::error::Error;

pub const BIGWIG_MAGIC: u32 = 0x888F_FC26;
pub const BIGBED_MAGIC: u32 = 0x8789_F2EB;
pub const CHROM_TREE_MAGIC: u32 = 0x78CA_8C91;

/// The on-disk block layout a query targets: full-resolution bigWig or
/// bigBed data, or a zoom/summary level (always `Summary`, for either
/// filetype).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockType {
    Summary,
    BigWig,
    BigBed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoomHeader {
    pub reduction_level: u32,
    pub data_offset: u64,
    pub index_offset: u64,
}

/// Parsed BBI common header plus the chromosome name → id map the engine
/// needs to resolve a `CoordRequest`.
#[derive(Clone, Debug)]
pub struct Header {
    pub endianness: Endianness,
    pub version: u16,
    pub zoom_levels: u16,
    pub chromosome_tree_offset: u64,
    pub full_data_offset: u64,
    pub full_index_offset: u64,
    pub field_count: u16,
    pub defined_field_count: u16,
    pub auto_sql_offset: u64,
    pub total_summary_offset: u64,
    pub uncompress_buf_size: u32,
    pub filetype: BlockType,
    pub zoom_headers: Vec<ZoomHeader>,
    pub refs_by_name: HashMap<String, u32>,
}

impl Header {
    pub fn is_compressed(&self) -> bool {
        self.uncompress_buf_size > 0
    }
}

pub fn read_header<R: Read + Seek>(reader: &mut R) -> Result<Header, Error> {
    let mut common = BytesMut::zeroed(64);
    reader.read_exact(&mut common)?;

    let magic_be = u32::from_be_bytes([common[0], common[1], common[2], common[3]]);
    let (filetype, endianness) = if magic_be == BIGWIG_MAGIC {
        (BlockType::BigWig, Endianness::Big)
    } else if magic_be == BIGWIG_MAGIC.swap_bytes() {
        (BlockType::BigWig, Endianness::Little)
    } else if magic_be == BIGBED_MAGIC {
        (BlockType::BigBed, Endianness::Big)
    } else if magic_be == BIGBED_MAGIC.swap_bytes() {
        (BlockType::BigBed, Endianness::Little)
    } else {
        return Err(Error::ParseFailure(format!(
            "unrecognized bbi magic: {magic_be:#x}"
        )));
    };

    let mut b = common.split_off(4);
    let (
        version,
        zoom_levels,
        chromosome_tree_offset,
        full_data_offset,
        full_index_offset,
        field_count,
        defined_field_count,
        auto_sql_offset,
        total_summary_offset,
        uncompress_buf_size,
    ) = match endianness {
        Endianness::Big => (
            b.get_u16(),
            b.get_u16(),
            b.get_u64(),
            b.get_u64(),
            b.get_u64(),
            b.get_u16(),
            b.get_u16(),
            b.get_u64(),
            b.get_u64(),
            b.get_u32(),
        ),
        Endianness::Little => (
            b.get_u16_le(),
            b.get_u16_le(),
            b.get_u64_le(),
            b.get_u64_le(),
            b.get_u64_le(),
            b.get_u16_le(),
            b.get_u16_le(),
            b.get_u64_le(),
            b.get_u64_le(),
            b.get_u32_le(),
        ),
    };

    let zoom_headers = read_zoom_headers(reader, endianness, zoom_levels)?;

    reader.seek(SeekFrom::Start(chromosome_tree_offset))?;
    let mut chrom_header = BytesMut::zeroed(32);
    reader.read_exact(&mut chrom_header)?;

    let (key_size, item_count) = match endianness {
        Endianness::Big => {
            let magic = chrom_header.get_u32();
            if magic != CHROM_TREE_MAGIC {
                return Err(Error::ParseFailure(format!(
                    "invalid chromosome b-tree magic: {magic:#x}"
                )));
            }
            let _block_size = chrom_header.get_u32();
            let key_size = chrom_header.get_u32();
            let val_size = chrom_header.get_u32();
            debug_assert_eq!(val_size, 8);
            let item_count = chrom_header.get_u64();
            (key_size, item_count)
        }
        Endianness::Little => {
            let magic = chrom_header.get_u32_le();
            if magic != CHROM_TREE_MAGIC {
                return Err(Error::ParseFailure(format!(
                    "invalid chromosome b-tree magic: {magic:#x}"
                )));
            }
            let _block_size = chrom_header.get_u32_le();
            let key_size = chrom_header.get_u32_le();
            let val_size = chrom_header.get_u32_le();
            debug_assert_eq!(val_size, 8);
            let item_count = chrom_header.get_u64_le();
            (key_size, item_count)
        }
    };

    let mut refs_by_name = HashMap::with_capacity(item_count as usize);
    read_chrom_tree_block(reader, endianness, key_size, &mut refs_by_name)?;

    Ok(Header {
        endianness,
        version,
        zoom_levels,
        chromosome_tree_offset,
        full_data_offset,
        full_index_offset,
        field_count,
        defined_field_count,
        auto_sql_offset,
        total_summary_offset,
        uncompress_buf_size,
        filetype,
        zoom_headers,
        refs_by_name,
    })
}

fn read_zoom_headers<R: Read + Seek>(
    reader: &mut R,
    endianness: Endianness,
    zoom_levels: u16,
) -> Result<Vec<ZoomHeader>, Error> {
    let mut buf = BytesMut::zeroed(zoom_levels as usize * 24);
    reader.read_exact(&mut buf)?;

    let mut headers = Vec::with_capacity(zoom_levels as usize);
    for _ in 0..zoom_levels {
        let (reduction_level, data_offset, index_offset) = match endianness {
            Endianness::Big => {
                let reduction_level = buf.get_u32();
                let _reserved = buf.get_u32();
                (reduction_level, buf.get_u64(), buf.get_u64())
            }
            Endianness::Little => {
                let reduction_level = buf.get_u32_le();
                let _reserved = buf.get_u32_le();
                (reduction_level, buf.get_u64_le(), buf.get_u64_le())
            }
        };
        headers.push(ZoomHeader {
            reduction_level,
            data_offset,
            index_offset,
        });
    }
    Ok(headers)
}

fn read_chrom_tree_block<R: Read + Seek>(
    reader: &mut R,
    endianness: Endianness,
    key_size: u32,
    refs_by_name: &mut HashMap<String, u32>,
) -> Result<(), Error> {
    let mut node_header = BytesMut::zeroed(4);
    reader.read_exact(&mut node_header)?;

    let is_leaf = node_header[0];
    let count = match endianness {
        Endianness::Big => u16::from_be_bytes([node_header[2], node_header[3]]),
        Endianness::Little => u16::from_le_bytes([node_header[2], node_header[3]]),
    };

    let record_size = key_size as usize + 8;
    let mut body = BytesMut::zeroed(record_size * count as usize);
    reader.read_exact(&mut body)?;

    if is_leaf == 1 {
        for _ in 0..count {
            let key_bytes = body.split_to(key_size as usize);
            let name = std::str::from_utf8(&key_bytes)
                .map_err(|e| Error::ParseFailure(format!("invalid chrom name utf-8: {e}")))?
                .trim_end_matches('\0')
                .to_owned();
            let (chrom_id, _chrom_size) = match endianness {
                Endianness::Big => (body.get_u32(), body.get_u32()),
                Endianness::Little => (body.get_u32_le(), body.get_u32_le()),
            };
            refs_by_name.insert(name, chrom_id);
        }
    } else {
        let mut children = Vec::with_capacity(count as usize);
        for _ in 0..count {
            body.advance(key_size as usize);
            let child_offset = match endianness {
                Endianness::Big => body.get_u64(),
                Endianness::Little => body.get_u64_le(),
            };
            children.push(child_offset);
        }
        for child in children {
            reader.seek(SeekFrom::Start(child))?;
            read_chrom_tree_block(reader, endianness, key_size, refs_by_name)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn put_u16(buf: &mut Vec<u8>, v: u16) {
        buf.extend(v.to_be_bytes());
    }
    fn put_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend(v.to_be_bytes());
    }
    fn put_u64(buf: &mut Vec<u8>, v: u64) {
        buf.extend(v.to_be_bytes());
    }

    /// Builds a synthetic big-endian bigWig file with two zoom levels and a
    /// two-leaf chromosome B-tree (root is a leaf node directly).
    fn synthetic_image() -> (Vec<u8>, Vec<(&'static str, u32)>) {
        let chroms = vec![("chr1", 0u32), ("chr2", 1u32)];
        let key_size = 8u32; // fits "chr1"/"chr2" padded with NULs

        let mut image = Vec::new();

        // Common header (64 bytes).
        put_u32(&mut image, BIGWIG_MAGIC);
        put_u16(&mut image, 4); // version
        put_u16(&mut image, 2); // zoom_levels
        let chrom_tree_offset_pos = image.len();
        put_u64(&mut image, 0); // chromosome_tree_offset, patched below
        put_u64(&mut image, 0); // full_data_offset
        put_u64(&mut image, 0); // full_index_offset
        put_u16(&mut image, 0); // field_count
        put_u16(&mut image, 0); // defined_field_count
        put_u64(&mut image, 0); // auto_sql_offset
        put_u64(&mut image, 0); // total_summary_offset
        put_u32(&mut image, 8); // uncompress_buf_size (compressed)
        put_u64(&mut image, 0); // reserved

        // Two zoom headers, 24 bytes each.
        for level in [10u32, 100u32] {
            put_u32(&mut image, level);
            put_u32(&mut image, 0); // reserved
            put_u64(&mut image, 0); // data_offset
            put_u64(&mut image, 0); // index_offset
        }

        let chrom_tree_offset = image.len() as u64;
        image[chrom_tree_offset_pos..chrom_tree_offset_pos + 8]
            .copy_from_slice(&chrom_tree_offset.to_be_bytes());

        // Chromosome B-tree header (32 bytes): magic, block_size, key_size, val_size, item_count, reserved.
        put_u32(&mut image, CHROM_TREE_MAGIC);
        put_u32(&mut image, 2); // block_size
        put_u32(&mut image, key_size);
        put_u32(&mut image, 8); // val_size
        put_u64(&mut image, chroms.len() as u64);
        put_u64(&mut image, 0); // reserved

        // Root leaf node: isLeaf=1, reserved=0, cnt=2.
        image.push(1);
        image.push(0);
        put_u16(&mut image, chroms.len() as u16);
        for (name, id) in &chroms {
            let mut key = name.as_bytes().to_vec();
            key.resize(key_size as usize, 0);
            image.extend(key);
            put_u32(&mut image, *id);
            put_u32(&mut image, 1000); // chrom length
        }

        (image, chroms)
    }

    #[test]
    fn s9_header_round_trip() {
        let (image, chroms) = synthetic_image();
        let mut cursor = Cursor::new(image);
        let header = read_header(&mut cursor).unwrap();

        assert_eq!(header.filetype, BlockType::BigWig);
        assert_eq!(header.endianness, Endianness::Big);
        assert_eq!(header.zoom_levels, 2);
        assert_eq!(header.zoom_headers.len(), 2);
        assert_eq!(header.zoom_headers[0].reduction_level, 10);
        assert_eq!(header.zoom_headers[1].reduction_level, 100);
        assert!(header.is_compressed());
        assert_eq!(header.uncompress_buf_size, 8);

        for (name, id) in chroms {
            assert_eq!(header.refs_by_name.get(name), Some(&id));
        }
    }

    #[test]
    fn rejects_unknown_magic() {
        let mut cursor = Cursor::new(vec![0u8; 64]);
        assert!(read_header(&mut cursor).is_err());
    }

    #[test]
    fn detects_little_endian_bigbed() {
        let mut image = Vec::new();
        image.extend(BIGBED_MAGIC.swap_bytes().to_le_bytes());
        image.extend(4u16.to_le_bytes()); // version
        image.extend(0u16.to_le_bytes()); // zoom_levels
        image.extend(56u64.to_le_bytes()); // chromosome_tree_offset (right after 64-byte header)
        image.extend(0u64.to_le_bytes());
        image.extend(0u64.to_le_bytes());
        image.extend(0u16.to_le_bytes());
        image.extend(0u16.to_le_bytes());
        image.extend(0u64.to_le_bytes());
        image.extend(0u64.to_le_bytes());
        image.extend(0u32.to_le_bytes());
        image.extend(0u64.to_le_bytes());
        assert_eq!(image.len(), 64);

        // Empty chromosome b-tree: header only, root leaf node with cnt=0.
        image.extend(CHROM_TREE_MAGIC.to_le_bytes());
        image.extend(2u32.to_le_bytes());
        image.extend(8u32.to_le_bytes());
        image.extend(8u32.to_le_bytes());
        image.extend(0u64.to_le_bytes());
        image.extend(0u64.to_le_bytes());
        image.push(1);
        image.push(0);
        image.extend(0u16.to_le_bytes());

        let mut cursor = Cursor::new(image);
        let header = read_header(&mut cursor).unwrap();
        assert_eq!(header.filetype, BlockType::BigBed);
        assert_eq!(header.endianness, Endianness::Little);
        assert!(header.refs_by_name.is_empty());
    }
}
