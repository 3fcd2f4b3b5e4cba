/// A contiguous slice of the work index range assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetRange {
    /// Index of the first work item in this slice.
    pub start: usize,
    /// Number of work items in this slice.
    pub count: usize,
}

impl SetRange {
    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

/// Split `count` work items across `workers` contiguous, non-overlapping
/// slices covering `[0, count)` exactly once.
///
/// Every worker but the last receives `count / workers` items; the last
/// worker additionally takes the remainder, so uneven divisions never
/// drop or duplicate an index.
pub fn partition(count: usize, workers: usize) -> Vec<SetRange> {
    assert!(workers > 0, "cannot partition across zero workers");
    let base = count / workers;
    let excess = count % workers;
    let mut ranges = Vec::with_capacity(workers);
    for i in 0..workers - 1 {
        ranges.push(SetRange {
            start: i * base,
            count: base,
        });
    }
    ranges.push(SetRange {
        start: (workers - 1) * base,
        count: base + excess,
    });
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uneven_split_gives_remainder_to_last() {
        let ranges = partition(10, 3);
        assert_eq!(
            ranges,
            vec![
                SetRange { start: 0, count: 3 },
                SetRange { start: 3, count: 3 },
                SetRange { start: 6, count: 4 },
            ]
        );
    }

    #[test]
    fn single_item_single_worker() {
        let ranges = partition(1, 1);
        assert_eq!(ranges, vec![SetRange { start: 0, count: 1 }]);
    }

    #[test]
    fn even_split_has_no_remainder() {
        let ranges = partition(12, 4);
        for r in &ranges {
            assert_eq!(r.count, 3);
        }
    }

    #[test]
    fn slices_are_contiguous_and_cover_everything() {
        for count in 1..40 {
            for workers in 1..=count {
                let ranges = partition(count, workers);
                assert_eq!(ranges.len(), workers);
                // Disjoint and contiguous: each slice starts where the
                // previous one ended.
                let mut next = 0;
                for r in &ranges {
                    assert_eq!(r.start, next);
                    next = r.end();
                }
                // Union is exactly [0, count).
                assert_eq!(next, count);
                // All but the last get the base share.
                for r in &ranges[..workers - 1] {
                    assert_eq!(r.count, count / workers);
                }
            }
        }
    }

    #[test]
    fn partition_is_deterministic() {
        assert_eq!(partition(17, 5), partition(17, 5));
    }
}
