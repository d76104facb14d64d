use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use ulid::Ulid;

use crate::error::BookingError;
use crate::limits::*;

/// Whole currency units. Prices carry no minor unit.
pub type Money = u64;

/// Half-open calendar-day interval `[start, end)`.
///
/// Built on `NaiveDate`, so time-of-day never takes part in a comparison.
/// Callers holding timestamps go through [`DateRange::from_datetimes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, BookingError> {
        if start >= end {
            return Err(BookingError::Validation(format!(
                "range start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// `None` for an empty or inverted pair; used where emptiness is a normal outcome.
    pub fn try_span(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Truncate both instants to midnight before building the range.
    pub fn from_datetimes(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, BookingError> {
        Self::new(start.date(), end.date())
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of nights; the range is already day-aligned so no rounding is needed.
    pub fn nights(&self) -> u32 {
        u32::try_from((self.end - self.start).num_days()).unwrap_or(u32::MAX)
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if `day` is one of the nights covered (the end day is not).
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }

    pub fn contains_range(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Inclusive `[start, end]` window in which add-on services may be used,
/// bound to one existing invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl ValidityWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, BookingError> {
        if start > end {
            return Err(BookingError::Validation(format!(
                "validity window start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Inside the window and not in the past.
    pub fn is_selectable(&self, day: NaiveDate, today: NaiveDate) -> bool {
        self.contains(day) && day >= today
    }
}

/// Canonical (prefixed, upper-cased) booking code of an existing invoice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookingCode(String);

impl BookingCode {
    /// Normalize human input: trim, upper-case, add `prefix` when absent.
    pub fn canonicalize(input: &str, prefix: &str) -> Result<Self, BookingError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(BookingError::Validation("booking code is empty".into()));
        }
        let upper = trimmed.to_ascii_uppercase();
        let prefix = prefix.to_ascii_uppercase();
        let canonical = if upper.starts_with(&prefix) {
            upper
        } else {
            format!("{prefix}{upper}")
        };
        if canonical.len() > MAX_BOOKING_CODE_LEN {
            return Err(BookingError::LimitExceeded("booking code too long"));
        }
        if canonical.len() == prefix.len() {
            return Err(BookingError::Validation("booking code has no identifier".into()));
        }
        if !canonical.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(BookingError::Validation(format!(
                "booking code {trimmed:?} contains invalid characters"
            )));
        }
        Ok(Self(canonical))
    }

    /// Wrap a code the server issued. Upper-cased, prefix left as sent.
    pub(crate) fn from_server(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The form shown to the guest, without the fixed prefix.
    pub fn display_form<'a>(&'a self, prefix: &str) -> &'a str {
        self.0
            .strip_prefix(&prefix.to_ascii_uppercase())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for BookingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anonymous per-tab session key, generated client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Ulid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of one cart line, independent of the catalog entry it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(pub Ulid);

impl LineId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference to a room type, combo offer or service in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CatalogId(pub String);

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CatalogId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Display data copied from the catalog when the line was added.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub title: String,
    pub image: Option<String>,
}

impl Snapshot {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            image: None,
        }
    }
}

/// Non-empty, sorted set of discrete usage dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDates(BTreeSet<NaiveDate>);

impl ServiceDates {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Result<Self, BookingError> {
        let set: BTreeSet<NaiveDate> = dates.into_iter().collect();
        if set.is_empty() {
            return Err(BookingError::Validation("select at least one date".into()));
        }
        if set.len() > MAX_SERVICE_DATES {
            return Err(BookingError::LimitExceeded("too many service dates"));
        }
        Ok(Self(set))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.iter().copied()
    }
}

/// Which invoice a service line lands on at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceTarget {
    /// Ancillary service bought together with a new stay.
    NewInvoice,
    /// Appended to an invoice that already exists.
    Existing(BookingCode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayLine {
    pub line_id: LineId,
    pub room_id: CatalogId,
    pub range: DateRange,
    pub nightly_price: Money,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboLine {
    pub line_id: LineId,
    pub offer_id: CatalogId,
    pub range: DateRange,
    /// Fixed package price, already inclusive of every night.
    pub package_price: Money,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLine {
    pub line_id: LineId,
    pub service_id: CatalogId,
    pub target: ServiceTarget,
    pub dates: ServiceDates,
    pub unit_price: Money,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Stay,
    Combo,
    Service,
}

/// One cart line. Totals are always derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartLineItem {
    NewStay(StayLine),
    NewCombo(ComboLine),
    AddOnService(ServiceLine),
}

impl CartLineItem {
    pub fn stay(room_id: CatalogId, range: DateRange, nightly_price: Money, snapshot: Snapshot) -> Result<Self, BookingError> {
        if range.nights() > MAX_STAY_NIGHTS {
            return Err(BookingError::LimitExceeded("stay too long"));
        }
        Ok(CartLineItem::NewStay(StayLine {
            line_id: LineId::generate(),
            room_id,
            range,
            nightly_price,
            snapshot,
        }))
    }

    pub fn combo(offer_id: CatalogId, range: DateRange, package_price: Money, snapshot: Snapshot) -> Result<Self, BookingError> {
        if range.nights() > MAX_STAY_NIGHTS {
            return Err(BookingError::LimitExceeded("stay too long"));
        }
        Ok(CartLineItem::NewCombo(ComboLine {
            line_id: LineId::generate(),
            offer_id,
            range,
            package_price,
            snapshot,
        }))
    }

    pub fn service(
        service_id: CatalogId,
        target: ServiceTarget,
        dates: ServiceDates,
        unit_price: Money,
        snapshot: Snapshot,
    ) -> Self {
        CartLineItem::AddOnService(ServiceLine {
            line_id: LineId::generate(),
            service_id,
            target,
            dates,
            unit_price,
            snapshot,
        })
    }

    pub fn line_id(&self) -> LineId {
        match self {
            CartLineItem::NewStay(l) => l.line_id,
            CartLineItem::NewCombo(l) => l.line_id,
            CartLineItem::AddOnService(l) => l.line_id,
        }
    }

    pub fn kind(&self) -> LineKind {
        match self {
            CartLineItem::NewStay(_) => LineKind::Stay,
            CartLineItem::NewCombo(_) => LineKind::Combo,
            CartLineItem::AddOnService(_) => LineKind::Service,
        }
    }

    pub fn item_id(&self) -> &CatalogId {
        match self {
            CartLineItem::NewStay(l) => &l.room_id,
            CartLineItem::NewCombo(l) => &l.offer_id,
            CartLineItem::AddOnService(l) => &l.service_id,
        }
    }

    /// Nightly price, package price, or per-date price depending on kind.
    pub fn unit_price(&self) -> Money {
        match self {
            CartLineItem::NewStay(l) => l.nightly_price,
            CartLineItem::NewCombo(l) => l.package_price,
            CartLineItem::AddOnService(l) => l.unit_price,
        }
    }

    pub fn total_price(&self) -> Money {
        match self {
            CartLineItem::NewStay(l) => l.nightly_price.saturating_mul(Money::from(l.range.nights())),
            CartLineItem::NewCombo(l) => l.package_price,
            CartLineItem::AddOnService(l) => l.unit_price.saturating_mul(l.dates.len() as Money),
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        match self {
            CartLineItem::NewStay(l) => &l.snapshot,
            CartLineItem::NewCombo(l) => &l.snapshot,
            CartLineItem::AddOnService(l) => &l.snapshot,
        }
    }

    pub fn range(&self) -> Option<DateRange> {
        match self {
            CartLineItem::NewStay(l) => Some(l.range),
            CartLineItem::NewCombo(l) => Some(l.range),
            CartLineItem::AddOnService(_) => None,
        }
    }

    /// The existing invoice this line appends to, if any.
    pub fn booking_code(&self) -> Option<&BookingCode> {
        match self {
            CartLineItem::AddOnService(ServiceLine {
                target: ServiceTarget::Existing(code),
                ..
            }) => Some(code),
            _ => None,
        }
    }
}

/// Local copy of a session's cart. The grand total is recomputed on every read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    pub fn new(items: Vec<CartLineItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, line_id: LineId) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.line_id() == line_id)
    }

    pub fn grand_total(&self) -> Money {
        self.items
            .iter()
            .fold(0, |acc: Money, i| acc.saturating_add(i.total_price()))
    }
}
