use thiserror::Error;

use crate::model::DateRange;

/// Typed failure reasons surfaced by the async components (validator, cart,
/// checkout) and by confirm-time checks on the selectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// User input incomplete or invalid.
    #[error("validation error: {0}")]
    Validation(String),
    /// The chosen range overlaps an existing booking.
    #[error("range {range} conflicts with existing booking {blocked}")]
    Conflict { range: DateRange, blocked: DateRange },
    #[error("not found: {0}")]
    NotFound(String),
    /// Booking exists but cannot take this operation (cancelled, not eligible).
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Transport or backend failure, including timeouts.
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
}

impl BookingError {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation",
            BookingError::Conflict { .. } => "conflict",
            BookingError::NotFound(_) => "not_found",
            BookingError::InvalidState(_) => "invalid_state",
            BookingError::Network(_) => "network",
            BookingError::Decode(_) => "decode",
            BookingError::LimitExceeded(_) => "limit_exceeded",
        }
    }
}
