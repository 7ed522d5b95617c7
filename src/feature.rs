//! The uniform output type emitted by every block decoder.

use bytes::Bytes;

use crate::request::CoordRequest;

/// A single genomic feature, projected from whatever on-disk record produced
/// it (summary/zoom record, bigWig value, or bigBed entry).
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub start: i32,
    pub end: i32,
    pub score: f32,
    pub min_score: Option<f32>,
    pub max_score: Option<f32>,
    pub summary: bool,
    pub rest: Option<Bytes>,
    pub unique_id: Option<String>,
}

impl Feature {
    pub fn new(start: i32, end: i32, score: f32) -> Self {
        Feature {
            start,
            end,
            score,
            min_score: None,
            max_score: None,
            summary: false,
            rest: None,
            unique_id: None,
        }
    }
}

/// `f.start < req.end ∧ f.end ≥ req.start` (spec §4.6, `coordFilter`).
pub fn coord_filter(f: &Feature, req: &CoordRequest) -> bool {
    f.start < req.end && f.end >= req.start
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_filter_rejects_disjoint_features() {
        let req = CoordRequest::new(0, 100, 200);
        let before = Feature::new(0, 50, 1.0);
        let after = Feature::new(250, 300, 1.0);
        // Starts exactly at req.end: req is half-open, so this does not overlap.
        let touching_end = Feature::new(200, 250, 1.0);
        assert!(!coord_filter(&before, &req));
        assert!(!coord_filter(&after, &req));
        assert!(!coord_filter(&touching_end, &req));
    }

    #[test]
    fn coord_filter_accepts_touching_and_overlapping_features() {
        let req = CoordRequest::new(0, 100, 200);
        let touching_start = Feature::new(50, 100, 1.0);
        let inside = Feature::new(120, 180, 1.0);
        assert!(touching_start.start < req.end && touching_start.end >= req.start);
        assert!(coord_filter(&touching_start, &req));
        assert!(coord_filter(&inside, &req));
    }
}
