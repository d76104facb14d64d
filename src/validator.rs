use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::BookingApi;
use crate::config::Config;
use crate::error::BookingError;
use crate::model::{BookingCode, ValidityWindow};
use crate::observability::VALIDATIONS_SUPERSEDED_TOTAL;

/// A booking code the backend accepted, with its service window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBooking {
    pub code: BookingCode,
    pub window: ValidityWindow,
}

/// Result of one debounced submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Resolved(ResolvedBooking),
    /// A later submission started before this one finished; drop it.
    Superseded,
}

/// Turns typed booking codes into validity windows.
///
/// Each `submit` waits out the quiet period, then asks the backend. Starting
/// a new submission cancels the one in flight, and only the newest
/// submission may report a result, so a slow reply to an old code can never
/// overwrite the window of the code the guest typed last.
pub struct BookingCodeValidator {
    api: Arc<dyn BookingApi>,
    prefix: String,
    quiet: Duration,
    generation: AtomicU64,
    current: Mutex<CancellationToken>,
}

impl BookingCodeValidator {
    pub fn new(api: Arc<dyn BookingApi>, prefix: impl Into<String>, quiet: Duration) -> Self {
        Self {
            api,
            prefix: prefix.into(),
            quiet,
            generation: AtomicU64::new(0),
            current: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn from_config(api: Arc<dyn BookingApi>, config: &Config) -> Self {
        Self::new(api, config.booking_prefix.clone(), config.debounce)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn canonicalize(&self, input: &str) -> Result<BookingCode, BookingError> {
        BookingCode::canonicalize(input, &self.prefix)
    }

    /// Debounced lookup. Malformed input fails immediately without a request.
    pub async fn submit(&self, input: &str) -> Result<Lookup, BookingError> {
        let (generation, token) = self.begin();
        let code = self.canonicalize(input)?;

        tokio::select! {
            _ = token.cancelled() => return Ok(self.superseded(&code)),
            _ = tokio::time::sleep(self.quiet) => {}
        }

        let result = tokio::select! {
            _ = token.cancelled() => return Ok(self.superseded(&code)),
            result = self.api.validate_booking(&code) => result,
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(self.superseded(&code));
        }
        let window = result?;
        info!(booking_code = %code, start = %window.start(), end = %window.end(), "booking code resolved");
        Ok(Lookup::Resolved(ResolvedBooking { code, window }))
    }

    /// Immediate lookup, used by non-interactive callers. Supersedes anything
    /// pending and is itself superseded by any later submission.
    pub async fn validate(&self, input: &str) -> Result<Lookup, BookingError> {
        let (generation, token) = self.begin();
        let code = self.canonicalize(input)?;

        let result = tokio::select! {
            _ = token.cancelled() => return Ok(self.superseded(&code)),
            result = self.api.validate_booking(&code) => result,
        };
        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(self.superseded(&code));
        }
        let window = result?;
        Ok(Lookup::Resolved(ResolvedBooking { code, window }))
    }

    /// Abandon whatever submission is pending.
    pub fn cancel(&self) {
        self.begin();
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let fresh = CancellationToken::new();
        let previous = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, fresh.clone())
        };
        previous.cancel();
        (generation, fresh)
    }

    fn superseded(&self, code: &BookingCode) -> Lookup {
        debug!(booking_code = %code, "lookup superseded");
        metrics::counter!(VALIDATIONS_SUPERSEDED_TOTAL).increment(1);
        Lookup::Superseded
    }
}
