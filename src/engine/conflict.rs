use chrono::NaiveDate;

use crate::error::BookingError;
use crate::limits::MAX_STAY_NIGHTS;
use crate::model::*;

use super::availability::AvailabilityIndex;

/// Range-level limits that hold regardless of the unit's bookings.
pub fn validate_range(range: &DateRange, today: NaiveDate) -> Result<(), BookingError> {
    if range.start() < today {
        return Err(BookingError::Validation(format!(
            "check-in {} is in the past",
            range.start()
        )));
    }
    if range.nights() > MAX_STAY_NIGHTS {
        return Err(BookingError::LimitExceeded("stay too long"));
    }
    Ok(())
}

pub fn check_no_conflict(index: &AvailabilityIndex, range: &DateRange) -> Result<(), BookingError> {
    match index.first_conflict(range) {
        Some(blocked) => Err(BookingError::Conflict {
            range: *range,
            blocked,
        }),
        None => Ok(()),
    }
}
