use chrono::NaiveDate;

use crate::error::BookingError;
use crate::limits::MAX_BLOCKED_RANGES;
use crate::model::*;

// ── Availability Index ────────────────────────────────────────────

/// Read-only snapshot of the reserved ranges of one bookable unit.
///
/// Ranges are merged into a sorted, disjoint list on construction. Merging
/// adjacent ranges does not change which nights are blocked, and keeps both
/// `start` and `end` monotonic so lookups can binary search.
/// There are no mutation methods: seeing new blocks needs a fresh fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityIndex {
    unit_id: CatalogId,
    blocked: Vec<DateRange>,
}

impl AvailabilityIndex {
    pub fn new(unit_id: CatalogId, mut ranges: Vec<DateRange>) -> Result<Self, BookingError> {
        if ranges.len() > MAX_BLOCKED_RANGES {
            return Err(BookingError::LimitExceeded("too many blocked ranges"));
        }
        ranges.sort();
        Ok(Self {
            unit_id,
            blocked: merge_overlapping(&ranges),
        })
    }

    /// An index with nothing blocked.
    pub fn empty(unit_id: CatalogId) -> Self {
        Self {
            unit_id,
            blocked: Vec::new(),
        }
    }

    pub fn unit_id(&self) -> &CatalogId {
        &self.unit_id
    }

    /// Merged blocked ranges, sorted by start.
    pub fn blocked_ranges(&self) -> &[DateRange] {
        &self.blocked
    }

    /// Whether the night of `day` is taken. A booking's check-out day is free.
    pub fn is_blocked(&self, day: NaiveDate) -> bool {
        let idx = self.blocked.partition_point(|r| r.start() <= day);
        idx > 0 && self.blocked[idx - 1].contains_day(day)
    }

    pub fn overlaps(&self, candidate: &DateRange) -> bool {
        self.first_conflict(candidate).is_some()
    }

    /// The earliest blocked range overlapping `candidate`.
    pub fn first_conflict(&self, candidate: &DateRange) -> Option<DateRange> {
        self.overlapping(candidate).next().copied()
    }

    /// Blocked ranges overlapping the query window.
    /// Binary search skips ranges starting at or after `query.end`; ends are
    /// sorted as well, so the left edge is found the same way.
    pub fn overlapping(&self, query: &DateRange) -> impl Iterator<Item = &DateRange> {
        let right_bound = self.blocked.partition_point(|r| r.start() < query.end());
        let left_bound = self.blocked[..right_bound].partition_point(|r| r.end() <= query.start());
        self.blocked[left_bound..right_bound].iter()
    }

    /// First day on or after `from` whose night is free.
    pub fn next_free_day(&self, from: NaiveDate) -> NaiveDate {
        let idx = self.blocked.partition_point(|r| r.start() <= from);
        match idx.checked_sub(1).map(|i| self.blocked[i]) {
            Some(r) if r.contains_day(from) => r.end(),
            _ => from,
        }
    }

    /// Free sub-ranges of `window`, for calendar display.
    pub fn free_ranges(&self, window: &DateRange) -> Vec<DateRange> {
        let blocked: Vec<DateRange> = self.overlapping(window).copied().collect();
        subtract_ranges(&[*window], &blocked)
    }
}

/// Merge sorted overlapping/adjacent ranges into disjoint ranges.
pub fn merge_overlapping(sorted: &[DateRange]) -> Vec<DateRange> {
    let mut merged: Vec<DateRange> = Vec::new();
    for &range in sorted {
        if let Some(last) = merged.last_mut()
            && range.start() <= last.end()
        {
            if range.end() > last.end()
                && let Some(joined) = DateRange::try_span(last.start(), range.end())
            {
                *last = joined;
            }
            continue;
        }
        merged.push(range);
    }
    merged
}

/// Remove every range in `to_remove` (sorted, disjoint) from `base` (sorted).
pub fn subtract_ranges(base: &[DateRange], to_remove: &[DateRange]) -> Vec<DateRange> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start();
        let current_end = b.end();

        while ri < to_remove.len() && to_remove[ri].end() <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start() < current_end {
            let r = &to_remove[j];
            if let Some(gap) = DateRange::try_span(current_start, r.start()) {
                result.push(gap);
            }
            current_start = current_start.max(r.end());
            j += 1;
        }

        if let Some(tail) = DateRange::try_span(current_start, current_end) {
            result.push(tail);
        }
    }

    result
}
