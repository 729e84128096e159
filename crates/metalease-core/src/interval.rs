//! Half-open time intervals and the set operations the availability
//! engine is built on.
//!
//! An [`Interval`] is `[start, end)`: a point `t` lies inside iff
//! `start <= t < end`. Two leases back to back (`[a, b)` and `[b, c)`)
//! therefore do not overlap, and [`merge`] coalesces them into `[a, c)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MetaleaseError, MetaleaseResult};

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Construct an interval, rejecting empty or inverted windows.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> MetaleaseResult<Self> {
        if start >= end {
            return Err(MetaleaseError::Validation {
                message: format!("interval start {start} must precede end {end}"),
            });
        }
        Ok(Self { start, end })
    }

    /// True iff the two intervals share at least one point.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True iff `other` lies entirely within `self`.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Intersect with `bounds`; `None` when the intersection is empty.
    pub fn clip(&self, bounds: &Interval) -> Option<Interval> {
        let start = self.start.max(bounds.start);
        let end = self.end.min(bounds.end);
        if start < end {
            Some(Interval { start, end })
        } else {
            None
        }
    }
}

/// Coalesce intervals into a minimal sorted, non-overlapping sequence.
///
/// Input need not be sorted; it is ordered by start time (ties broken by
/// end time ascending) first. Overlapping and adjacent intervals are
/// merged.
pub fn merge(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for iv in intervals {
        match merged.last_mut() {
            Some(last) if iv.start <= last.end => {
                last.end = last.end.max(iv.end);
            }
            _ => merged.push(iv),
        }
    }
    merged
}

/// The gaps inside `bounds` left by a merged, sorted interval sequence.
///
/// Each input interval is clipped to `bounds`; zero-width gaps are
/// omitted. With no input intervals the result is `bounds` itself.
pub fn complement(bounds: &Interval, merged: &[Interval]) -> Vec<Interval> {
    let mut gaps = Vec::new();
    let mut cursor = bounds.start;

    for iv in merged {
        let Some(clipped) = iv.clip(bounds) else {
            continue;
        };
        if clipped.start > cursor {
            gaps.push(Interval {
                start: cursor,
                end: clipped.start,
            });
        }
        cursor = cursor.max(clipped.end);
    }

    if cursor < bounds.end {
        gaps.push(Interval {
            start: cursor,
            end: bounds.end,
        });
    }
    gaps
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 7, 16, 19, 20, 30).unwrap()
    }

    fn days(n: i64) -> Duration {
        Duration::days(n)
    }

    fn iv(from_day: i64, to_day: i64) -> Interval {
        Interval {
            start: t0() + days(from_day),
            end: t0() + days(to_day),
        }
    }

    #[test]
    fn new_rejects_inverted_window() {
        assert!(Interval::new(t0(), t0()).is_err());
        assert!(Interval::new(t0() + days(1), t0()).is_err());
        assert!(Interval::new(t0(), t0() + days(1)).is_ok());
    }

    #[test]
    fn overlaps_is_half_open() {
        // [0, 10) and [10, 20) share no point.
        assert!(!iv(0, 10).overlaps(&iv(10, 20)));
        assert!(iv(0, 10).overlaps(&iv(9, 20)));
        assert!(iv(5, 6).overlaps(&iv(0, 100)));
    }

    #[test]
    fn merge_sorts_and_coalesces() {
        let merged = merge(vec![iv(50, 60), iv(10, 20), iv(20, 30)]);
        assert_eq!(merged, vec![iv(10, 30), iv(50, 60)]);
    }

    #[test]
    fn merge_prefers_shorter_interval_on_tied_start() {
        let merged = merge(vec![iv(0, 30), iv(0, 10)]);
        assert_eq!(merged, vec![iv(0, 30)]);
    }

    #[test]
    fn merge_keeps_disjoint_intervals() {
        let merged = merge(vec![iv(40, 50), iv(0, 10)]);
        assert_eq!(merged, vec![iv(0, 10), iv(40, 50)]);
    }

    #[test]
    fn complement_of_empty_set_is_bounds() {
        assert_eq!(complement(&iv(0, 100), &[]), vec![iv(0, 100)]);
    }

    #[test]
    fn complement_of_full_cover_is_empty() {
        assert_eq!(complement(&iv(0, 100), &[iv(0, 100)]), Vec::new());
    }

    #[test]
    fn complement_reference_scenario() {
        // Offer window [T, T+100d); conflicts [10,20), [20,30), [50,60).
        let merged = merge(vec![iv(10, 20), iv(20, 30), iv(50, 60)]);
        let gaps = complement(&iv(0, 100), &merged);
        assert_eq!(gaps, vec![iv(0, 10), iv(30, 50), iv(60, 100)]);
    }

    #[test]
    fn complement_clips_overhanging_intervals() {
        // Conflict exceeding the bounds on both sides is clipped, not
        // rejected; one starting before the bounds eats the leading gap.
        let gaps = complement(&iv(0, 100), &[iv(-10, 20), iv(90, 120)]);
        assert_eq!(gaps, vec![iv(20, 90)]);
    }

    #[test]
    fn complement_skips_intervals_outside_bounds() {
        let gaps = complement(&iv(0, 100), &[iv(-30, -10), iv(110, 130)]);
        assert_eq!(gaps, vec![iv(0, 100)]);
    }

    #[test]
    fn complement_omits_zero_width_gaps() {
        let gaps = complement(&iv(0, 100), &[iv(0, 40), iv(40, 100)]);
        assert_eq!(gaps, Vec::new());
    }

    #[test]
    fn free_windows_and_conflicts_reconstruct_bounds() {
        let bounds = iv(0, 100);
        let merged = merge(vec![iv(10, 20), iv(20, 30), iv(50, 60)]);
        let gaps = complement(&bounds, &merged);

        let mut pieces: Vec<Interval> = merged
            .iter()
            .filter_map(|c| c.clip(&bounds))
            .chain(gaps.iter().copied())
            .collect();
        pieces.sort_by_key(|p| p.start);

        assert_eq!(pieces.first().unwrap().start, bounds.start);
        assert_eq!(pieces.last().unwrap().end, bounds.end);
        for pair in pieces.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "gap or double-coverage");
        }
    }
}
