use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::BookingError;
use crate::limits::MAX_STAY_NIGHTS;
use crate::model::DateRange;

use super::availability::AvailabilityIndex;
use super::error::Refusal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeState {
    Empty,
    StartPicked(NaiveDate),
    Complete(DateRange),
}

/// Check-in/check-out picker for one room type or combo offer.
///
/// Transitions on a day click:
/// - past days are refused in every state;
/// - from `Empty` or `Complete`, a free day becomes the new start;
/// - from `StartPicked`, a day on or before the start restarts the pick,
///   a later day closes `[start, day)` unless that overlaps a blocked range.
///
/// A later day is judged by the candidate range, not by its own night: a
/// check-out may land on another booking's check-in day.
#[derive(Debug, Clone)]
pub struct RangeSelector {
    index: Arc<AvailabilityIndex>,
    today: NaiveDate,
    state: RangeState,
}

impl RangeSelector {
    pub fn new(index: Arc<AvailabilityIndex>, today: NaiveDate) -> Self {
        Self {
            index,
            today,
            state: RangeState::Empty,
        }
    }

    pub fn state(&self) -> RangeState {
        self.state
    }

    pub fn index(&self) -> &AvailabilityIndex {
        &self.index
    }

    /// Whether a calendar cell should render as unavailable for check-in.
    pub fn is_disabled_for_check_in(&self, day: NaiveDate) -> bool {
        day < self.today || self.index.is_blocked(day)
    }

    /// Whether a click on `day` would be refused in the current state.
    ///
    /// Once a start is picked, a later day is a check-out candidate and is
    /// disabled only when `[start, day)` cannot be booked. A blocked
    /// check-in day stays clickable as a check-out.
    pub fn is_disabled_for_check_out(&self, day: NaiveDate) -> bool {
        if day < self.today {
            return true;
        }
        match self.state {
            RangeState::StartPicked(start) => match DateRange::try_span(start, day) {
                Some(candidate) => self.index.overlaps(&candidate) || candidate.nights() > MAX_STAY_NIGHTS,
                None => self.is_disabled_for_check_in(day),
            },
            _ => self.is_disabled_for_check_in(day),
        }
    }

    pub fn pick(&mut self, day: NaiveDate) -> Result<RangeState, Refusal> {
        let result = self.transition(day);
        if let Err(refusal) = &result {
            metrics::counter!(crate::observability::SELECTION_REFUSALS_TOTAL, "reason" => refusal.label())
                .increment(1);
        }
        result
    }

    fn transition(&mut self, day: NaiveDate) -> Result<RangeState, Refusal> {
        if day < self.today {
            return Err(Refusal::Past(day));
        }
        if let RangeState::StartPicked(start) = self.state
            && let Some(candidate) = DateRange::try_span(start, day)
        {
            if let Some(blocked) = self.index.first_conflict(&candidate) {
                return Err(Refusal::Overlap { candidate, blocked });
            }
            if candidate.nights() > MAX_STAY_NIGHTS {
                return Err(Refusal::TooLong(candidate.nights()));
            }
            self.state = RangeState::Complete(candidate);
            return Ok(self.state);
        }
        if self.index.is_blocked(day) {
            return Err(Refusal::Blocked(day));
        }
        self.state = RangeState::StartPicked(day);
        Ok(self.state)
    }

    /// The completed range; anything less is a validation error.
    pub fn confirm(&self) -> Result<DateRange, BookingError> {
        match self.state {
            RangeState::Complete(range) => Ok(range),
            _ => Err(BookingError::Validation(
                "select both check-in and check-out dates".into(),
            )),
        }
    }

    pub fn clear(&mut self) {
        self.state = RangeState::Empty;
    }
}
