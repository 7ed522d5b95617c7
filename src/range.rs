//! C1: RangeSet — disjoint, sorted, inclusive-max integer intervals.
//!
//! Used to batch a set of candidate CIR-node offsets into the minimal number
//! of merged byte ranges worth fetching in one read (see `cirtree::traverse`).

use crate::error::Error;

/// A single inclusive interval `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub min: u64,
    pub max: u64,
}

impl Range {
    pub fn new(min: u64, max: u64) -> Self {
        debug_assert!(min <= max);
        Range { min, max }
    }

    /// Length of the half-open interval this range represents, i.e. `max - min + 1`.
    pub fn len(&self) -> u64 {
        self.max - self.min + 1
    }
}

/// A non-empty, sorted sequence of disjoint ranges, each pair separated by a
/// gap of at least 2 (i.e. `r[i].max + 1 < r[i+1].min`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<Range>,
}

impl RangeSet {
    pub fn singleton(min: u64, max: u64) -> Self {
        RangeSet {
            ranges: vec![Range::new(min, max)],
        }
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn contains(&self, pos: u64) -> bool {
        self.ranges
            .iter()
            .any(|r| r.min <= pos && pos <= r.max)
    }

    /// Merge-union with `other`. Adjacent (`a.max + 1 >= b.min`) or
    /// overlapping intervals are combined.
    pub fn union(&self, other: &RangeSet) -> RangeSet {
        let mut all: Vec<Range> = Vec::with_capacity(self.ranges.len() + other.ranges.len());
        all.extend_from_slice(&self.ranges);
        all.extend_from_slice(&other.ranges);
        all.sort_by_key(|r| r.min);

        let mut merged: Vec<Range> = Vec::with_capacity(all.len());
        for r in all {
            match merged.last_mut() {
                Some(last) if r.min <= last.max.saturating_add(1) => {
                    if r.max > last.max {
                        last.max = r.max;
                    }
                }
                _ => merged.push(r),
            }
        }
        RangeSet { ranges: merged }
    }

    /// Union a batch of candidate offsets, each widened to `[offset, offset + width]`,
    /// into the minimal covering RangeSet. Returns `None` for an empty input
    /// (callers treat an empty offset set as a no-op round, per spec §9).
    pub fn from_offsets(offsets: &[u64], width: u64) -> Option<RangeSet> {
        let mut iter = offsets.iter();
        let first = *iter.next()?;
        let mut set = RangeSet::singleton(first, first + width);
        for &o in iter {
            set = set.union(&RangeSet::singleton(o, o + width));
        }
        Some(set)
    }

    /// Standard two-pointer intersection. Fails with an `EmptyIntersection`-style
    /// error (modeled as `Error::ParseFailure` since this engine has no caller
    /// that expects a non-empty result here) if the result would be empty.
    ///
    /// Retained for external callers (see spec §4.1 design note); the
    /// traversal itself only needs `union`/`contains`.
    pub fn intersection(&self, other: &RangeSet) -> Result<RangeSet, Error> {
        let mut out = Vec::new();
        let (mut i, mut j) = (0usize, 0usize);
        let (a, b) = (&self.ranges, &other.ranges);
        while i < a.len() && j < b.len() {
            let lo = a[i].min.max(b[j].min);
            let hi = a[i].max.min(b[j].max);
            if lo <= hi {
                out.push(Range::new(lo, hi));
            }
            if a[i].max < b[j].max {
                i += 1;
            } else {
                j += 1;
            }
        }
        if out.is_empty() {
            return Err(Error::ParseFailure("empty range intersection".to_string()));
        }
        Ok(RangeSet { ranges: out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_merges_overlapping_and_touching() {
        let a = RangeSet::singleton(0, 10);
        let b = RangeSet::singleton(11, 20);
        let merged = a.union(&b);
        assert_eq!(merged.ranges(), &[Range::new(0, 20)]);

        let c = RangeSet::singleton(100, 200);
        let merged2 = merged.union(&c);
        assert_eq!(merged2.ranges(), &[Range::new(0, 20), Range::new(100, 200)]);
    }

    #[test]
    fn union_keeps_separated_ranges_disjoint() {
        let a = RangeSet::singleton(0, 10);
        let b = RangeSet::singleton(12, 20);
        let merged = a.union(&b);
        assert_eq!(merged.ranges(), &[Range::new(0, 10), Range::new(12, 20)]);
    }

    #[test]
    fn union_is_commutative_associative_idempotent() {
        let a = RangeSet::singleton(0, 5);
        let b = RangeSet::singleton(4, 9);
        let c = RangeSet::singleton(20, 30);

        assert_eq!(a.union(&b), b.union(&a));
        assert_eq!(a.union(&b).union(&c), a.union(&b.union(&c)));
        assert_eq!(a.union(&a), a);
    }

    #[test]
    fn intersection_of_self_is_self() {
        let a = RangeSet::singleton(0, 5).union(&RangeSet::singleton(10, 20));
        let inter = a.intersection(&a).unwrap();
        assert_eq!(inter, a);
    }

    #[test]
    fn intersection_empty_errors() {
        let a = RangeSet::singleton(0, 5);
        let b = RangeSet::singleton(10, 20);
        assert!(a.intersection(&b).is_err());
    }

    #[test]
    fn contains_checks_all_intervals() {
        let a = RangeSet::singleton(0, 5).union(&RangeSet::singleton(100, 200));
        assert!(a.contains(3));
        assert!(a.contains(150));
        assert!(!a.contains(50));
    }

    #[test]
    fn from_offsets_empty_is_none() {
        assert!(RangeSet::from_offsets(&[], 10).is_none());
    }

    #[test]
    fn from_offsets_widens_and_merges() {
        let set = RangeSet::from_offsets(&[0, 50], 60).unwrap();
        assert_eq!(set.ranges(), &[Range::new(0, 110)]);
    }
}
