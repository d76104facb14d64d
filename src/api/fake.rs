//! In-memory backend for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{BookingApi, RemoteCart};
use crate::checkout::{AppendServicesRequest, InvoiceCreated, NewInvoiceRequest};
use crate::error::BookingError;
use crate::model::*;

#[derive(Default)]
struct State {
    availability: HashMap<CatalogId, Vec<DateRange>>,
    bookings: HashMap<String, Result<ValidityWindow, BookingError>>,
    carts: HashMap<SessionId, Vec<CartLineItem>>,
    created: Vec<NewInvoiceRequest>,
    appended: Vec<AppendServicesRequest>,
    validate_calls: Vec<String>,
    failing_appends: HashSet<String>,
    fail_create: Option<BookingError>,
    fail_clear: bool,
    fail_cart: bool,
    /// Added to every reported cart total to simulate a drifting server.
    total_skew: Money,
    next_invoice: u32,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    state: Mutex<State>,
    /// Delay applied to booking lookups, to exercise supersession.
    lookup_delay: Option<Duration>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookup_delay(delay: Duration) -> Self {
        Self {
            state: Mutex::default(),
            lookup_delay: Some(delay),
        }
    }

    pub fn block(&self, unit: &str, range: DateRange) {
        let mut s = self.state.lock().unwrap();
        s.availability.entry(unit.into()).or_default().push(range);
    }

    pub fn add_booking(&self, code: &str, window: ValidityWindow) {
        self.state.lock().unwrap().bookings.insert(code.to_string(), Ok(window));
    }

    pub fn add_ineligible_booking(&self, code: &str) {
        self.state.lock().unwrap().bookings.insert(
            code.to_string(),
            Err(BookingError::InvalidState(format!("booking {code} is cancelled"))),
        );
    }

    pub fn fail_appends_for(&self, code: &str) {
        self.state.lock().unwrap().failing_appends.insert(code.to_string());
    }

    pub fn fail_create(&self, error: BookingError) {
        self.state.lock().unwrap().fail_create = Some(error);
    }

    pub fn fail_clear(&self) {
        self.state.lock().unwrap().fail_clear = true;
    }

    pub fn fail_cart(&self, fail: bool) {
        self.state.lock().unwrap().fail_cart = fail;
    }

    pub fn skew_totals(&self, skew: Money) {
        self.state.lock().unwrap().total_skew = skew;
    }

    pub fn seed_cart(&self, session: SessionId, items: Vec<CartLineItem>) {
        self.state.lock().unwrap().carts.insert(session, items);
    }

    pub fn created(&self) -> Vec<NewInvoiceRequest> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn appended(&self) -> Vec<AppendServicesRequest> {
        self.state.lock().unwrap().appended.clone()
    }

    pub fn validate_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().validate_calls.clone()
    }

    pub fn remote_items(&self, session: SessionId) -> Vec<CartLineItem> {
        self.state
            .lock()
            .unwrap()
            .carts
            .get(&session)
            .cloned()
            .unwrap_or_default()
    }

    fn snapshot(s: &State, session: SessionId) -> RemoteCart {
        let items = s.carts.get(&session).cloned().unwrap_or_default();
        let cart = Cart::new(items);
        let reported_total = cart.grand_total() + s.total_skew;
        RemoteCart { cart, reported_total }
    }

    fn check_cart(s: &State) -> Result<(), BookingError> {
        if s.fail_cart {
            return Err(BookingError::Network("cart store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingApi for FakeApi {
    async fn fetch_availability(&self, unit_id: &CatalogId) -> Result<Vec<DateRange>, BookingError> {
        let s = self.state.lock().unwrap();
        Ok(s.availability.get(unit_id).cloned().unwrap_or_default())
    }

    async fn validate_booking(&self, code: &BookingCode) -> Result<ValidityWindow, BookingError> {
        self.state
            .lock()
            .unwrap()
            .validate_calls
            .push(code.as_str().to_string());
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        let s = self.state.lock().unwrap();
        match s.bookings.get(code.as_str()) {
            Some(result) => result.clone(),
            None => Err(BookingError::NotFound(format!("booking {code}"))),
        }
    }

    async fn get_cart(&self, session: SessionId) -> Result<RemoteCart, BookingError> {
        let s = self.state.lock().unwrap();
        Self::check_cart(&s)?;
        Ok(Self::snapshot(&s, session))
    }

    async fn add_to_cart(&self, session: SessionId, item: &CartLineItem) -> Result<RemoteCart, BookingError> {
        let mut s = self.state.lock().unwrap();
        Self::check_cart(&s)?;
        s.carts.entry(session).or_default().push(item.clone());
        Ok(Self::snapshot(&s, session))
    }

    async fn remove_from_cart(&self, session: SessionId, line_id: LineId) -> Result<RemoteCart, BookingError> {
        let mut s = self.state.lock().unwrap();
        Self::check_cart(&s)?;
        if let Some(items) = s.carts.get_mut(&session) {
            items.retain(|i| i.line_id() != line_id);
        }
        Ok(Self::snapshot(&s, session))
    }

    async fn clear_cart(&self, session: SessionId) -> Result<RemoteCart, BookingError> {
        let mut s = self.state.lock().unwrap();
        if s.fail_clear {
            return Err(BookingError::Network("clear timed out".into()));
        }
        s.carts.remove(&session);
        Ok(Self::snapshot(&s, session))
    }

    async fn create_invoice(&self, request: &NewInvoiceRequest) -> Result<InvoiceCreated, BookingError> {
        let mut s = self.state.lock().unwrap();
        if let Some(e) = s.fail_create.clone() {
            return Err(e);
        }
        s.next_invoice += 1;
        let code = BookingCode::from_server(&format!("FS-NEW{}", s.next_invoice));
        s.created.push(request.clone());
        Ok(InvoiceCreated {
            booking_code: code,
            payment_url: None,
        })
    }

    async fn add_services(&self, request: &AppendServicesRequest) -> Result<(), BookingError> {
        let mut s = self.state.lock().unwrap();
        if s.failing_appends.contains(request.booking_code.as_str()) {
            return Err(BookingError::InvalidState(format!(
                "booking {} no longer accepts services",
                request.booking_code
            )));
        }
        s.appended.push(request.clone());
        Ok(())
    }
}
