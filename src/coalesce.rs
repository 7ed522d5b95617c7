//! C4: BlockCoalescer — group nearby data-block fetches into larger reads.

/// The fixed gap-amortization threshold (spec §4.4): blocks within this many
/// bytes of the current group's end are folded into it rather than starting
/// a new backing read.
pub const COALESCE_GAP_BYTES: u64 = 2048;

/// One data block the index traversal wants read, prior to grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataBlockDescriptor {
    pub offset: u64,
    pub length: u64,
}

/// A single backing read covering one or more `DataBlockDescriptor`s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockGroup {
    pub offset: u64,
    pub length: u64,
    pub blocks: Vec<DataBlockDescriptor>,
}

/// Sort and merge `blocks` into the minimal set of `BlockGroup`s such that no
/// two backing reads in a group are more than `COALESCE_GAP_BYTES` apart.
pub fn coalesce(mut blocks: Vec<DataBlockDescriptor>) -> Vec<BlockGroup> {
    if blocks.is_empty() {
        return Vec::new();
    }
    blocks.sort_by_key(|b| b.offset);

    let mut groups = Vec::new();
    let mut current = BlockGroup {
        offset: blocks[0].offset,
        length: blocks[0].length,
        blocks: vec![blocks[0]],
    };

    for &next in &blocks[1..] {
        let current_end = current.offset + current.length;
        if next.offset.saturating_sub(current_end) <= COALESCE_GAP_BYTES {
            let new_end = (next.offset + next.length).max(current_end);
            current.length = new_end - current.offset;
            current.blocks.push(next);
        } else {
            groups.push(current);
            current = BlockGroup {
                offset: next.offset,
                length: next.length,
                blocks: vec![next],
            };
        }
    }
    groups.push(current);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(offset: u64, length: u64) -> DataBlockDescriptor {
        DataBlockDescriptor { offset, length }
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(coalesce(vec![]).is_empty());
    }

    #[test]
    fn s3_scenario_coalesces_close_blocks_and_splits_far_ones() {
        // spec §8 S3
        let blocks = vec![d(1000, 200), d(1300, 100), d(10000, 50)];
        let groups = coalesce(blocks);
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].offset, 1000);
        assert_eq!(groups[0].length, 400);
        assert_eq!(groups[0].blocks, vec![d(1000, 200), d(1300, 100)]);

        assert_eq!(groups[1].offset, 10000);
        assert_eq!(groups[1].length, 50);
        assert_eq!(groups[1].blocks, vec![d(10000, 50)]);
    }

    #[test]
    fn gap_exactly_at_threshold_is_merged() {
        // gap from end of first block (offset 100) to next offset is exactly 2048
        let blocks = vec![d(0, 100), d(100 + COALESCE_GAP_BYTES, 10)];
        let groups = coalesce(blocks);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn gap_one_byte_over_threshold_splits() {
        let blocks = vec![d(0, 100), d(100 + COALESCE_GAP_BYTES + 1, 10)];
        let groups = coalesce(blocks);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let blocks = vec![d(10000, 50), d(1000, 200), d(1300, 100)];
        let groups = coalesce(blocks);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].offset, 1000);
    }

    #[test]
    fn group_invariant_covers_every_member_block() {
        let blocks = vec![d(5, 10), d(20, 5), d(10000, 1)];
        let groups = coalesce(blocks);
        for g in &groups {
            for b in &g.blocks {
                assert!(g.offset <= b.offset);
                assert!(b.offset + b.length <= g.offset + g.length);
            }
        }
    }

    #[test]
    fn out_of_order_overlapping_block_extends_group_without_shrinking() {
        // A later (by sort) block fully contained in the current group must not
        // shrink `current.length`.
        let blocks = vec![d(0, 1000), d(10, 5)];
        let groups = coalesce(blocks);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].length, 1000);
    }
}
