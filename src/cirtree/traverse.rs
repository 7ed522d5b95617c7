//! C5: IndexTraverser — walks the CIR tree from the root, pruning by
//! coordinate overlap, emitting leaf data-block descriptors.
//!
//! Grounded on `ghuls-bigtools/src/bbi/bbiread.rs::search_overlapping_blocks`,
//! but restructured per design note §9 into an explicit round loop instead of
//! recursion interleaved with awaited I/O: a worklist of sibling offsets per
//! round, fetched concurrently through `ReadCache`, with discovered children
//! appended to the next round's worklist. The loop ends when a round
//! produces no children; `futures_util::stream::FuturesUnordered` drives the
//! concurrent fetches within a round, the same pattern
//! `stadiamaps-pmtiles-rs`'s directory-walk uses for sibling fan-out.

use byteordered::Endianness;
use bytes::Bytes;
use futures_util::stream::{FuturesUnordered, StreamExt};
use log::trace;

use crate::coalesce::DataBlockDescriptor;
use crate::error::Error;
use crate::io::cache::ReadCache;
use crate::io::reader::{AbortToken, ByteReader};
use crate::range::RangeSet;
use crate::request::CoordRequest;

use super::node::{self, CirNode};

pub struct IndexTraverser;

impl IndexTraverser {
    /// Walk the tree rooted at `cir_tree_offset + 48`, returning every leaf
    /// data block whose bounding range overlaps `req`.
    pub async fn walk(
        cache: &ReadCache,
        reader: &dyn ByteReader,
        cir_tree_offset: u64,
        cir_block_size: u32,
        endianness: Endianness,
        req: &CoordRequest,
        abort: &AbortToken,
    ) -> Result<Vec<DataBlockDescriptor>, Error> {
        let max_node_size = 4u64 + cir_block_size as u64 * 32;
        let root_offset = cir_tree_offset + 48;

        let mut worklist: Vec<u64> = vec![root_offset];
        let mut outstanding: i64 = worklist.len() as i64;
        let mut descriptors = Vec::new();
        let mut round = 0usize;

        while !worklist.is_empty() {
            round += 1;
            let Some(merged) = RangeSet::from_offsets(&worklist, max_node_size) else {
                // Empty sibling set: no-op round (spec §4.5 edge case).
                break;
            };

            let mut fetches = FuturesUnordered::new();
            for fr in merged.ranges() {
                let fr = *fr;
                fetches.push(async move {
                    let length = fr.max - fr.min;
                    let bytes = cache.get(reader, fr.min, length, abort).await;
                    (fr, bytes)
                });
            }

            let mut fetched: Vec<(crate::range::Range, Bytes)> = Vec::with_capacity(merged.ranges().len());
            while let Some((fr, result)) = fetches.next().await {
                match result {
                    Ok(bytes) => fetched.push((fr, bytes)),
                    Err(e) => return Err(e),
                }
            }

            let mut next_round: Vec<u64> = Vec::new();
            let mut pruned = 0usize;

            for &offset in &worklist {
                let Some((fr, buf)) = fetched.iter().find(|(fr, _)| fr.min <= offset && offset <= fr.max) else {
                    return Err(Error::ParseFailure(format!(
                        "node offset {offset} not covered by any fetched range"
                    )));
                };
                let slice_start = (offset - fr.min) as usize;
                let node = node::parse_node(&buf[slice_start..], endianness)?;
                outstanding -= 1;

                match node {
                    CirNode::Leaf(entries) => {
                        for entry in entries {
                            if node::overlaps(
                                entry.start_chrom_ix,
                                entry.start_base,
                                entry.end_chrom_ix,
                                entry.end_base,
                                req,
                            ) {
                                descriptors.push(DataBlockDescriptor {
                                    offset: entry.data_offset,
                                    length: entry.data_size,
                                });
                            } else {
                                pruned += 1;
                            }
                        }
                    }
                    CirNode::Internal(entries) => {
                        for entry in entries {
                            if node::overlaps(
                                entry.start_chrom_ix,
                                entry.start_base,
                                entry.end_chrom_ix,
                                entry.end_base,
                                req,
                            ) {
                                next_round.push(entry.child_offset);
                            } else {
                                pruned += 1;
                            }
                        }
                    }
                }
            }

            trace!(
                "cir traversal round {round}: {} nodes, {pruned} entries pruned, {} children queued",
                worklist.len(),
                next_round.len()
            );

            outstanding += next_round.len() as i64;
            worklist = next_round;
        }

        if outstanding != 0 {
            return Err(Error::TraversalIncomplete(outstanding.unsigned_abs() as usize));
        }

        Ok(descriptors)
    }
}
