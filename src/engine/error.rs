use chrono::NaiveDate;

use crate::model::DateRange;

/// Why a selector refused a click. Refusals stay inside the selector's
/// caller; they are shown to the user, never raised as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    Past(NaiveDate),
    Blocked(NaiveDate),
    Overlap {
        candidate: DateRange,
        blocked: DateRange,
    },
    TooLong(u32),
    OutsideWindow(NaiveDate),
    /// The selection already holds the most dates one service line may carry.
    TooManyDates(usize),
    /// No booking code has been resolved yet.
    NoWindow,
}

impl Refusal {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Refusal::Past(_) => "past",
            Refusal::Blocked(_) => "blocked",
            Refusal::Overlap { .. } => "overlap",
            Refusal::TooLong(_) => "too_long",
            Refusal::OutsideWindow(_) => "outside_window",
            Refusal::TooManyDates(_) => "too_many_dates",
            Refusal::NoWindow => "no_window",
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for Refusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Refusal::Past(day) => write!(f, "{day} is in the past"),
            Refusal::Blocked(day) => write!(f, "{day} is already booked"),
            Refusal::Overlap { candidate, blocked } => write!(
                f,
                "stay {candidate} overlaps an existing booking {blocked}; pick other dates"
            ),
            Refusal::TooLong(nights) => write!(f, "a stay of {nights} nights is too long"),
            Refusal::OutsideWindow(day) => {
                write!(f, "{day} is outside the dates of your booking")
            }
            Refusal::TooManyDates(max) => write!(f, "at most {max} dates can be selected"),
            Refusal::NoWindow => write!(f, "enter a valid booking code first"),
        }
    }
}
