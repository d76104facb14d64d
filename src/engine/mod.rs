//! Pure, synchronous booking rules: availability lookups, conflict checks,
//! and the two calendar selectors. Only `store` touches the backend.

mod availability;
mod conflict;
mod error;
mod multi_date;
mod range_selector;
mod store;

pub use availability::{merge_overlapping, subtract_ranges, AvailabilityIndex};
pub use conflict::{check_no_conflict, validate_range};
pub use error::Refusal;
pub use multi_date::{MultiDateSelector, ServiceSelection};
pub use range_selector::{RangeSelector, RangeState};
pub use store::SnapshotStore;
