use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Utc};

use crate::config::Config;
use crate::model::SessionId;

/// Source of "today" in the hotel's calendar.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock shifted to a fixed hotel offset.
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// A clock stuck on one day.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Per-tab state handed to the components that talk to the backend.
#[derive(Clone)]
pub struct SessionContext {
    pub session_id: SessionId,
    pub token: Option<String>,
    pub offset: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl SessionContext {
    /// Fresh anonymous session on the wall clock.
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            session_id: SessionId::generate(),
            token: None,
            offset,
            clock: Arc::new(SystemClock::new(offset)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut ctx = Self::new(config.utc_offset());
        ctx.token = config.token.clone();
        ctx
    }

    /// Resume an existing session key.
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("session_id", &self.session_id)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("offset", &self.offset)
            .finish()
    }
}
