//! IntervalSet: sorted, non-overlapping integer intervals with attached data.
//!
//! The set keeps two aligned vectors:
//!
//! - `boundaries`: `2 * N` scalars, alternating `from`/`to` of each interval
//! - `intervals`: the N records, where boundary positions `2k, 2k + 1`
//!   belong to record `k`
//!
//! Point lookups binary-search the flat boundary vector. A value strictly
//! between two boundaries only matches when both boundaries belong to the same
//! record; otherwise it sits in the gap between record `k`'s `to` and record
//! `k + 1`'s `from`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval<T> {
    pub from: i64,
    pub to: i64,
    pub data: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("invalid interval {from}:{to}")]
    Inverted { from: i64, to: i64 },
    #[error("interval {from}:{to} overlaps with an existing interval")]
    Overlap { from: i64, to: i64 },
}

#[derive(Debug, Clone)]
pub struct IntervalSet<T> {
    boundaries: Vec<i64>,
    intervals: Vec<Interval<T>>,
}

impl<T> Default for IntervalSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntervalSet<T> {
    pub fn new() -> Self {
        Self {
            boundaries: Vec::new(),
            intervals: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Intervals in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &Interval<T>> {
        self.intervals.iter()
    }

    /// Insert `[from, to]`. Rejects inverted bounds and any overlap with an
    /// existing interval, including touching boundaries and enclosure.
    pub fn add(&mut self, from: i64, to: i64, data: T) -> Result<(), IntervalError> {
        if from > to {
            return Err(IntervalError::Inverted { from, to });
        }
        if self.index_of(from).is_some() || self.index_of(to).is_some() {
            return Err(IntervalError::Overlap { from, to });
        }

        // `from` is outside every interval, so this lands on an even position.
        let boundary_index = self.boundaries.partition_point(|&b| b < from);
        if let Some(&next_from) = self.boundaries.get(boundary_index) {
            if next_from <= to {
                return Err(IntervalError::Overlap { from, to });
            }
        }

        self.boundaries
            .splice(boundary_index..boundary_index, [from, to]);
        self.intervals
            .insert(boundary_index / 2, Interval { from, to, data });
        Ok(())
    }

    /// The interval containing `value`, if any.
    pub fn find(&self, value: i64) -> Option<&Interval<T>> {
        self.index_of(value).map(|index| &self.intervals[index])
    }

    /// Fragments covering `[from, to]`, clipped to the query bounds.
    ///
    /// Coverage is all-or-nothing: if either endpoint is uncovered, or the
    /// records between them are not contiguous (`to + 1 == next.from`), the
    /// result is empty.
    pub fn intersection(&self, from: i64, to: i64) -> Vec<Interval<&T>> {
        if from > to {
            return Vec::new();
        }
        let (Some(first), Some(last)) = (self.index_of(from), self.index_of(to)) else {
            return Vec::new();
        };

        if first == last {
            return vec![Interval {
                from,
                to,
                data: &self.intervals[first].data,
            }];
        }

        let spanned = &self.intervals[first..=last];
        if spanned.windows(2).any(|pair| pair[0].to + 1 != pair[1].from) {
            return Vec::new();
        }

        let mut out = Vec::with_capacity(spanned.len());
        for (i, interval) in spanned.iter().enumerate() {
            out.push(Interval {
                from: if i == 0 { from } else { interval.from },
                to: if i == spanned.len() - 1 { to } else { interval.to },
                data: &interval.data,
            });
        }
        out
    }

    fn index_of(&self, value: i64) -> Option<usize> {
        if self.boundaries.is_empty() {
            return None;
        }
        let mut start = 0usize;
        let mut end = self.boundaries.len() - 1;
        while end - start > 1 {
            let mid = start + (end - start) / 2;
            let mid_value = self.boundaries[mid];
            if value == mid_value {
                return Some(mid / 2);
            } else if value > mid_value {
                start = mid;
            } else {
                end = mid;
            }
        }

        let (low, high) = (self.boundaries[start], self.boundaries[end]);
        if value == low {
            Some(start / 2)
        } else if value == high {
            Some(end / 2)
        } else if value > low && value < high && start / 2 == end / 2 {
            Some(start / 2)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IntervalSet<char> {
        let mut set = IntervalSet::new();
        set.add(110, 150, 'D').unwrap();
        set.add(5, 20, 'A').unwrap();
        set.add(100, 109, 'C').unwrap();
        set.add(56, 73, 'B').unwrap();
        set
    }

    #[test]
    fn keeps_intervals_sorted() {
        let set = sample();
        let froms: Vec<i64> = set.iter().map(|i| i.from).collect();
        assert_eq!(froms, vec![5, 56, 100, 110]);
        assert_eq!(set.boundaries, vec![5, 20, 56, 73, 100, 109, 110, 150]);
    }

    #[test]
    fn find_inside_and_on_boundaries() {
        let set = sample();
        for (value, expected) in [
            (10, 'A'),
            (101, 'C'),
            (120, 'D'),
            (5, 'A'),
            (20, 'A'),
            (100, 'C'),
            (109, 'C'),
            (110, 'D'),
            (150, 'D'),
        ] {
            let found = set.find(value).unwrap_or_else(|| panic!("{value} should match"));
            assert_eq!(found.data, expected, "value {value}");
        }
    }

    #[test]
    fn find_outside_all_intervals() {
        let set = sample();
        for value in [0, 35, 74, 200] {
            assert!(set.find(value).is_none(), "value {value}");
        }
        assert!(IntervalSet::<()>::new().find(3).is_none());
    }

    #[test]
    fn intersection_clips_fragments() {
        let set = sample();
        let cases: Vec<(i64, i64, Vec<(i64, i64, char)>)> = vec![
            (7, 15, vec![(7, 15, 'A')]),
            (101, 105, vec![(101, 105, 'C')]),
            (120, 135, vec![(120, 135, 'D')]),
            (5, 20, vec![(5, 20, 'A')]),
            (56, 73, vec![(56, 73, 'B')]),
            (110, 150, vec![(110, 150, 'D')]),
            (100, 150, vec![(100, 109, 'C'), (110, 150, 'D')]),
            (103, 124, vec![(103, 109, 'C'), (110, 124, 'D')]),
        ];
        for (from, to, expected) in cases {
            let got: Vec<(i64, i64, char)> = set
                .intersection(from, to)
                .into_iter()
                .map(|i| (i.from, i.to, *i.data))
                .collect();
            assert_eq!(got, expected, "intersection({from}, {to})");
        }
    }

    #[test]
    fn intersection_keeps_middle_records_whole() {
        let mut set = IntervalSet::new();
        set.add(0, 9, 1).unwrap();
        set.add(10, 19, 2).unwrap();
        set.add(20, 29, 3).unwrap();
        let got: Vec<(i64, i64, i32)> = set
            .intersection(4, 25)
            .into_iter()
            .map(|i| (i.from, i.to, *i.data))
            .collect();
        assert_eq!(got, vec![(4, 9, 1), (10, 19, 2), (20, 25, 3)]);
    }

    #[test]
    fn intersection_is_all_or_nothing() {
        let set = sample();
        for (from, to) in [(0, 1), (0, 4), (151, 120), (200, 300), (15, 60), (70, 105)] {
            assert!(set.intersection(from, to).is_empty(), "({from}, {to})");
        }
    }

    #[test]
    fn rejects_inverted_and_overlapping() {
        let mut set = sample();
        assert_eq!(set.add(9, 3, 'X'), Err(IntervalError::Inverted { from: 9, to: 3 }));
        assert_eq!(set.add(15, 30, 'X'), Err(IntervalError::Overlap { from: 15, to: 30 }));
        assert_eq!(set.add(0, 5, 'X'), Err(IntervalError::Overlap { from: 0, to: 5 }));
        assert_eq!(set.add(21, 80, 'X'), Err(IntervalError::Overlap { from: 21, to: 80 }));
        assert_eq!(set.len(), 4);

        set.add(21, 55, 'X').unwrap();
        assert_eq!(set.find(30).map(|i| i.data), Some('X'));
    }

    #[test]
    fn single_point_intervals() {
        let mut set = IntervalSet::new();
        set.add(4, 4, "four").unwrap();
        set.add(6, 6, "six").unwrap();
        assert_eq!(set.find(4).map(|i| i.data), Some("four"));
        assert!(set.find(5).is_none());
        assert_eq!(set.find(6).map(|i| i.data), Some("six"));
        assert!(set.add(4, 4, "again").is_err());
    }
}
