//! JSON shapes of the backend endpoints and their conversion to model types.
//!
//! Dates leave as `YYYY-MM-DD`. Dates arriving may be plain days or RFC 3339
//! instants; instants are shifted to the hotel offset before the time of day
//! is dropped, so a `...T17:00:00Z` check-in is not read as the previous day.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;
use ulid::Ulid;

use crate::api::RemoteCart;
use crate::checkout::{AppendServicesRequest, CustomerDetails, InvoiceCreated, NewInvoiceRequest, PaymentMethod};
use crate::error::BookingError;
use crate::model::*;

// ── Envelopes ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CartEnvelope {
    pub success: bool,
    pub cart: Option<WireCart>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceEnvelope {
    pub success: bool,
    pub booking_code: Option<String>,
    pub payment_url: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AckEnvelope {
    pub success: bool,
    pub message: Option<String>,
}

/// Body of a non-2xx response.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
}

/// `success: false` inside a 2xx response.
pub fn require_success(success: bool, message: Option<String>) -> Result<(), BookingError> {
    if success {
        Ok(())
    } else {
        Err(BookingError::InvalidState(
            message.unwrap_or_else(|| "request was not accepted".into()),
        ))
    }
}

impl<T> DataEnvelope<T> {
    pub fn into_data(self) -> Result<T, BookingError> {
        require_success(self.success, self.message)?;
        self.data
            .ok_or_else(|| BookingError::Decode("response has no data".into()))
    }
}

// ── Dates ────────────────────────────────────────────────────────

pub fn parse_day(raw: &str, offset: FixedOffset) -> Result<NaiveDate, BookingError> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&offset).date_naive())
        .map_err(|e| BookingError::Decode(format!("bad date {raw:?}: {e}")))
}

pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRange {
    pub start_date: String,
    pub end_date: String,
}

impl WireRange {
    pub fn into_range(self, offset: FixedOffset) -> Result<DateRange, BookingError> {
        let start = parse_day(&self.start_date, offset)?;
        let end = parse_day(&self.end_date, offset)?;
        DateRange::new(start, end).map_err(|e| BookingError::Decode(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireWindow {
    pub valid_start_date: String,
    pub valid_end_date: String,
}

impl WireWindow {
    pub fn into_window(self, offset: FixedOffset) -> Result<ValidityWindow, BookingError> {
        let start = parse_day(&self.valid_start_date, offset)?;
        let end = parse_day(&self.valid_end_date, offset)?;
        ValidityWindow::new(start, end).map_err(|e| BookingError::Decode(e.to_string()))
    }
}

/// Availability payloads with a single-night or inverted pair are dropped
/// rather than failing the whole snapshot.
pub fn decode_blocked(ranges: Vec<WireRange>, offset: FixedOffset) -> Result<Vec<DateRange>, BookingError> {
    let mut out = Vec::with_capacity(ranges.len());
    for wire in ranges {
        let start = parse_day(&wire.start_date, offset)?;
        let end = parse_day(&wire.end_date, offset)?;
        match DateRange::try_span(start, end) {
            Some(range) => out.push(range),
            None => warn!(%start, %end, "skipping empty blocked range"),
        }
    }
    Ok(out)
}

// ── Cart ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireKind {
    Room,
    Combo,
    Service,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCartItem {
    pub line_id: String,
    pub kind: WireKind,
    pub item_id: String,
    pub unit_price: Money,
    pub total_price: Money,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_code: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<String>,
}

impl From<&CartLineItem> for WireCartItem {
    fn from(item: &CartLineItem) -> Self {
        let snapshot = item.snapshot();
        let (check_in, check_out) = match item.range() {
            Some(r) => (Some(format_day(r.start())), Some(format_day(r.end()))),
            None => (None, None),
        };
        let dates = match item {
            CartLineItem::AddOnService(l) => l.dates.iter().map(format_day).collect(),
            _ => Vec::new(),
        };
        Self {
            line_id: item.line_id().to_string(),
            kind: match item.kind() {
                LineKind::Stay => WireKind::Room,
                LineKind::Combo => WireKind::Combo,
                LineKind::Service => WireKind::Service,
            },
            item_id: item.item_id().0.clone(),
            unit_price: item.unit_price(),
            total_price: item.total_price(),
            title: snapshot.title.clone(),
            image: snapshot.image.clone(),
            check_in,
            check_out,
            booking_code: item.booking_code().map(|c| c.as_str().to_string()),
            dates,
        }
    }
}

impl WireCartItem {
    /// Rebuild the line from its parts. The sent `totalPrice` is only
    /// compared against the derived one; the derived value wins.
    pub fn into_line(self, offset: FixedOffset) -> Result<CartLineItem, BookingError> {
        let line_id = Ulid::from_string(&self.line_id)
            .map(LineId)
            .map_err(|e| BookingError::Decode(format!("bad line id {:?}: {e}", self.line_id)))?;
        let snapshot = Snapshot {
            title: self.title,
            image: self.image,
        };
        let item_id = CatalogId(self.item_id);
        let range = || -> Result<DateRange, BookingError> {
            match (&self.check_in, &self.check_out) {
                (Some(a), Some(b)) => {
                    let range = DateRange::new(parse_day(a, offset)?, parse_day(b, offset)?)
                        .map_err(|e| BookingError::Decode(e.to_string()))?;
                    Ok(range)
                }
                _ => Err(BookingError::Decode(format!("line {line_id} has no stay dates"))),
            }
        };

        let line = match self.kind {
            WireKind::Room => CartLineItem::NewStay(StayLine {
                line_id,
                room_id: item_id,
                range: range()?,
                nightly_price: self.unit_price,
                snapshot,
            }),
            WireKind::Combo => CartLineItem::NewCombo(ComboLine {
                line_id,
                offer_id: item_id,
                range: range()?,
                package_price: self.unit_price,
                snapshot,
            }),
            WireKind::Service => {
                let dates = self
                    .dates
                    .iter()
                    .map(|d| parse_day(d, offset))
                    .collect::<Result<Vec<_>, _>>()?;
                let dates = ServiceDates::new(dates).map_err(|e| BookingError::Decode(e.to_string()))?;
                let target = match &self.booking_code {
                    Some(code) if !code.trim().is_empty() => ServiceTarget::Existing(BookingCode::from_server(code)),
                    _ => ServiceTarget::NewInvoice,
                };
                CartLineItem::AddOnService(ServiceLine {
                    line_id,
                    service_id: item_id,
                    target,
                    dates,
                    unit_price: self.unit_price,
                    snapshot,
                })
            }
        };

        if line.total_price() != self.total_price {
            warn!(
                %line_id,
                sent = self.total_price,
                derived = line.total_price(),
                "line total disagrees with its parts, using derived total"
            );
        }
        Ok(line)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCart {
    #[serde(default)]
    pub items: Vec<WireCartItem>,
    #[serde(default)]
    pub total_amount: Money,
}

impl WireCart {
    pub fn into_remote(self, offset: FixedOffset) -> Result<RemoteCart, BookingError> {
        let items = self
            .items
            .into_iter()
            .map(|i| i.into_line(offset))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RemoteCart {
            cart: Cart::new(items),
            reported_total: self.total_amount,
        })
    }
}

impl CartEnvelope {
    pub fn into_remote(self, offset: FixedOffset) -> Result<RemoteCart, BookingError> {
        require_success(self.success, self.message)?;
        self.cart
            .ok_or_else(|| BookingError::Decode("response has no cart".into()))?
            .into_remote(offset)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartBody {
    pub session_id: String,
    pub item: WireCartItem,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartBody {
    pub session_id: String,
    pub line_id: String,
}

// ── Invoices ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCustomer {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<&CustomerDetails> for WireCustomer {
    fn from(c: &CustomerDetails) -> Self {
        Self {
            full_name: c.full_name.trim().to_string(),
            email: c.email.trim().to_string(),
            phone: c.phone.trim().to_string(),
            note: c.note.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WirePaymentMethod {
    PayAtHotel,
    Online,
}

impl From<PaymentMethod> for WirePaymentMethod {
    fn from(m: PaymentMethod) -> Self {
        match m {
            PaymentMethod::PayAtHotel => WirePaymentMethod::PayAtHotel,
            PaymentMethod::Online => WirePaymentMethod::Online,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceBody {
    pub customer: WireCustomer,
    pub payment_method: WirePaymentMethod,
    pub rooms: Vec<WireCartItem>,
    pub services: Vec<WireCartItem>,
    pub total_amount: Money,
}

impl From<&NewInvoiceRequest> for CreateInvoiceBody {
    fn from(r: &NewInvoiceRequest) -> Self {
        Self {
            customer: WireCustomer::from(&r.customer),
            payment_method: r.customer.payment_method.into(),
            rooms: r.stays.iter().map(WireCartItem::from).collect(),
            services: r.services.iter().map(WireCartItem::from).collect(),
            total_amount: r.total,
        }
    }
}

impl InvoiceEnvelope {
    pub fn into_created(self) -> Result<InvoiceCreated, BookingError> {
        require_success(self.success, self.message)?;
        let code = self
            .booking_code
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| BookingError::Decode("invoice response has no booking code".into()))?;
        Ok(InvoiceCreated {
            booking_code: BookingCode::from_server(&code),
            payment_url: self.payment_url,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddServicesBody {
    pub booking_code: String,
    pub services: Vec<WireCartItem>,
    pub total_amount: Money,
}

impl From<&AppendServicesRequest> for AddServicesBody {
    fn from(r: &AppendServicesRequest) -> Self {
        Self {
            booking_code: r.booking_code.as_str().to_string(),
            services: r.services.iter().map(WireCartItem::from).collect(),
            total_amount: r.subtotal,
        }
    }
}
