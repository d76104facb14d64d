use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::api::BookingApi;
use crate::cart::CartAggregator;
use crate::engine::{check_no_conflict, AvailabilityIndex};
use crate::error::BookingError;
use crate::model::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    PayAtHotel,
    /// External gateway; the invoice response may carry a payment URL.
    Online,
}

/// Guest details required to open a new invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub note: Option<String>,
    pub payment_method: PaymentMethod,
}

impl CustomerDetails {
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.full_name.trim().is_empty() {
            return Err(BookingError::Validation("full name is required".into()));
        }
        let email = self.email.trim();
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(BookingError::Validation("a valid email is required".into()));
        }
        if self.phone.chars().filter(char::is_ascii_digit).count() < 8 {
            return Err(BookingError::Validation("a valid phone number is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    NewInvoice,
    Append(BookingCode),
}

/// Items bound for one invoice. Computed at submit time, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutGroup {
    pub kind: GroupKind,
    pub items: Vec<CartLineItem>,
    pub subtotal: Money,
}

impl CheckoutGroup {
    fn new(kind: GroupKind, items: Vec<CartLineItem>) -> Self {
        let subtotal = items
            .iter()
            .fold(0, |acc: Money, i| acc.saturating_add(i.total_price()));
        Self { kind, items, subtotal }
    }

    pub fn booking_code(&self) -> Option<&BookingCode> {
        match &self.kind {
            GroupKind::Append(code) => Some(code),
            GroupKind::NewInvoice => None,
        }
    }

    /// Rooms and combos; each becomes a stay record on the invoice.
    pub fn stays(&self) -> impl Iterator<Item = &CartLineItem> {
        self.items.iter().filter(|i| i.kind() != LineKind::Service)
    }

    pub fn services(&self) -> impl Iterator<Item = &CartLineItem> {
        self.items.iter().filter(|i| i.kind() == LineKind::Service)
    }
}

/// How a checkout's items split across invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub new_invoice: Option<CheckoutGroup>,
    /// One group per distinct booking code, in order of first appearance.
    pub appends: Vec<CheckoutGroup>,
}

impl CheckoutPlan {
    pub fn split(items: &[CartLineItem]) -> Self {
        let mut fresh: Vec<CartLineItem> = Vec::new();
        let mut by_code: Vec<(BookingCode, Vec<CartLineItem>)> = Vec::new();

        for item in items {
            match item.booking_code() {
                None => fresh.push(item.clone()),
                Some(code) => match by_code.iter_mut().find(|(c, _)| c == code) {
                    Some((_, group)) => group.push(item.clone()),
                    None => by_code.push((code.clone(), vec![item.clone()])),
                },
            }
        }

        Self {
            new_invoice: (!fresh.is_empty()).then(|| CheckoutGroup::new(GroupKind::NewInvoice, fresh)),
            appends: by_code
                .into_iter()
                .map(|(code, items)| CheckoutGroup::new(GroupKind::Append(code), items))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new_invoice.is_none() && self.appends.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = &CheckoutGroup> {
        self.new_invoice.iter().chain(self.appends.iter())
    }

    pub fn grand_total(&self) -> Money {
        self.groups()
            .fold(0, |acc: Money, g| acc.saturating_add(g.subtotal))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoiceRequest {
    pub customer: CustomerDetails,
    pub stays: Vec<CartLineItem>,
    pub services: Vec<CartLineItem>,
    pub total: Money,
}

impl NewInvoiceRequest {
    fn from_group(customer: CustomerDetails, group: &CheckoutGroup) -> Self {
        Self {
            customer,
            stays: group.stays().cloned().collect(),
            services: group.services().cloned().collect(),
            total: group.subtotal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendServicesRequest {
    pub booking_code: BookingCode,
    pub services: Vec<CartLineItem>,
    pub subtotal: Money,
}

impl AppendServicesRequest {
    fn from_group(group: &CheckoutGroup) -> Option<Self> {
        Some(Self {
            booking_code: group.booking_code()?.clone(),
            services: group.items.clone(),
            subtotal: group.subtotal,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceCreated {
    pub booking_code: BookingCode,
    /// Where to send the guest for online payment, passed through untouched.
    pub payment_url: Option<String>,
}

/// One append group the backend refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendFailure {
    pub booking_code: BookingCode,
    pub error: BookingError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOutcome {
    /// Booking to show on the confirmation page.
    pub redirect_code: BookingCode,
    pub created: Option<InvoiceCreated>,
    pub appended: Vec<BookingCode>,
    /// Per-group failures to surface alongside the confirmation.
    pub warnings: Vec<AppendFailure>,
    pub grand_total: Money,
}

impl CheckoutOutcome {
    pub fn payment_url(&self) -> Option<&str> {
        self.created.as_ref().and_then(|c| c.payment_url.as_deref())
    }
}

/// Turns a checkout's items into one "create invoice" call and one
/// "append services" call per existing booking.
///
/// The new invoice is created first and any failure there aborts the whole
/// checkout before an append is sent. Append groups then run concurrently
/// and fail independently of each other.
pub struct CheckoutSplitter {
    api: Arc<dyn BookingApi>,
}

impl CheckoutSplitter {
    pub fn new(api: Arc<dyn BookingApi>) -> Self {
        Self { api }
    }

    /// Re-check every stay/combo against a fresh availability fetch.
    pub async fn revalidate(&self, items: &[CartLineItem]) -> Result<(), BookingError> {
        for item in items {
            let Some(range) = item.range() else { continue };
            let blocked = self.api.fetch_availability(item.item_id()).await?;
            let index = AvailabilityIndex::new(item.item_id().clone(), blocked)?;
            check_no_conflict(&index, &range)?;
        }
        Ok(())
    }

    /// `customer` is required only when the items need a new invoice.
    pub async fn execute(
        &self,
        items: &[CartLineItem],
        customer: Option<&CustomerDetails>,
    ) -> Result<CheckoutOutcome, BookingError> {
        let plan = CheckoutPlan::split(items);
        if plan.is_empty() {
            return Err(BookingError::Validation("nothing to check out".into()));
        }
        let grand_total = plan.grand_total();
        info!(
            new_invoice = plan.new_invoice.is_some(),
            appends = plan.appends.len(),
            grand_total,
            "checkout started"
        );

        let created = match &plan.new_invoice {
            Some(group) => {
                let customer = customer.ok_or_else(|| {
                    BookingError::Validation("customer details are required for a new booking".into())
                })?;
                customer.validate()?;
                let request = NewInvoiceRequest::from_group(customer.clone(), group);
                metrics::counter!(crate::observability::CHECKOUT_GROUPS_TOTAL, "kind" => "new_invoice")
                    .increment(1);
                match self.api.create_invoice(&request).await {
                    Ok(created) => {
                        info!(booking_code = %created.booking_code, total = request.total, "invoice created");
                        Some(created)
                    }
                    Err(e) => {
                        warn!(error = %e, "invoice creation failed, no services appended");
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        let requests: Vec<AppendServicesRequest> = plan
            .appends
            .iter()
            .filter_map(AppendServicesRequest::from_group)
            .collect();
        metrics::counter!(crate::observability::CHECKOUT_GROUPS_TOTAL, "kind" => "append")
            .increment(requests.len() as u64);
        let results = join_all(requests.iter().map(|r| self.api.add_services(r))).await;

        let mut appended = Vec::new();
        let mut warnings = Vec::new();
        for (request, result) in requests.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    info!(booking_code = %request.booking_code, subtotal = request.subtotal, "services appended");
                    appended.push(request.booking_code);
                }
                Err(error) => {
                    warn!(booking_code = %request.booking_code, error = %error, "append failed");
                    metrics::counter!(crate::observability::CHECKOUT_APPEND_FAILURES_TOTAL).increment(1);
                    warnings.push(AppendFailure {
                        booking_code: request.booking_code,
                        error,
                    });
                }
            }
        }

        let redirect_code = match (&created, appended.first()) {
            (Some(c), _) => c.booking_code.clone(),
            (None, Some(code)) => code.clone(),
            (None, None) => {
                // Every append failed and nothing was created.
                return Err(warnings
                    .into_iter()
                    .next()
                    .map(|f| f.error)
                    .unwrap_or_else(|| BookingError::Validation("nothing to check out".into())));
            }
        };

        Ok(CheckoutOutcome {
            redirect_code,
            created,
            appended,
            warnings,
            grand_total,
        })
    }

    /// Check out the whole cart, then empty it.
    pub async fn checkout_cart(
        &self,
        cart: &mut CartAggregator,
        customer: Option<&CustomerDetails>,
    ) -> Result<CheckoutOutcome, BookingError> {
        let items = cart.items().to_vec();
        let outcome = self.execute(&items, customer).await?;
        cart.clear().await;
        Ok(outcome)
    }

    /// Check out one item without touching the cart.
    pub async fn buy_now(
        &self,
        item: CartLineItem,
        customer: Option<&CustomerDetails>,
    ) -> Result<CheckoutOutcome, BookingError> {
        self.execute(std::slice::from_ref(&item), customer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::context::SessionContext;
    use crate::notify::NotifyHub;
    use chrono::{FixedOffset, NaiveDate};

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn code(raw: &str) -> BookingCode {
        BookingCode::canonicalize(raw, "FS-").unwrap()
    }

    fn stay(nights: u32, nightly: Money) -> CartLineItem {
        let range = DateRange::new(day(6, 10), day(6, 10 + nights)).unwrap();
        CartLineItem::stay("deluxe".into(), range, nightly, Snapshot::titled("Deluxe")).unwrap()
    }

    fn service(target: ServiceTarget, dates: &[u32], price: Money) -> CartLineItem {
        let dates = ServiceDates::new(dates.iter().map(|d| day(7, *d))).unwrap();
        CartLineItem::service("spa".into(), target, dates, price, Snapshot::titled("Spa"))
    }

    fn customer() -> CustomerDetails {
        CustomerDetails {
            full_name: "Nguyen Van A".into(),
            email: "guest@example.com".into(),
            phone: "+84 912 345 678".into(),
            note: None,
            payment_method: PaymentMethod::PayAtHotel,
        }
    }

    fn splitter() -> (Arc<FakeApi>, CheckoutSplitter) {
        let api = Arc::new(FakeApi::new());
        (api.clone(), CheckoutSplitter::new(api))
    }

    #[test]
    fn stay_plus_add_on_splits_into_two_operations() {
        let items = vec![
            stay(4, 500_000),
            service(ServiceTarget::Existing(code("777")), &[2, 4], 150_000),
        ];
        let plan = CheckoutPlan::split(&items);

        let fresh = plan.new_invoice.as_ref().unwrap();
        assert_eq!(fresh.subtotal, 2_000_000);
        assert_eq!(fresh.stays().count(), 1);
        assert_eq!(plan.appends.len(), 1);
        assert_eq!(plan.appends[0].kind, GroupKind::Append(code("FS-777")));
        assert_eq!(plan.appends[0].subtotal, 300_000);
        assert_eq!(plan.grand_total(), 2_300_000);
    }

    #[test]
    fn add_ons_group_by_booking_code() {
        let items = vec![
            service(ServiceTarget::Existing(code("999")), &[1], 100),
            service(ServiceTarget::Existing(code("111")), &[1, 2], 200),
            service(ServiceTarget::Existing(code("999")), &[3, 4, 5], 10),
            service(ServiceTarget::Existing(code("111")), &[6], 1_000),
        ];
        let plan = CheckoutPlan::split(&items);

        assert!(plan.new_invoice.is_none());
        let groups: Vec<_> = plan
            .appends
            .iter()
            .map(|g| (g.booking_code().unwrap().as_str().to_string(), g.items.len(), g.subtotal))
            .collect();
        assert_eq!(
            groups,
            vec![("FS-999".to_string(), 2, 130), ("FS-111".to_string(), 2, 1_400)]
        );
    }

    #[test]
    fn new_invoice_services_stay_on_new_invoice() {
        let items = vec![stay(1, 100), service(ServiceTarget::NewInvoice, &[1], 50)];
        let plan = CheckoutPlan::split(&items);
        let fresh = plan.new_invoice.unwrap();
        assert_eq!(fresh.stays().count(), 1);
        assert_eq!(fresh.services().count(), 1);
        assert_eq!(fresh.subtotal, 150);
        assert!(plan.appends.is_empty());
    }

    #[tokio::test]
    async fn execute_creates_invoice_then_appends() {
        let (api, splitter) = splitter();
        let items = vec![
            stay(4, 500_000),
            service(ServiceTarget::Existing(code("777")), &[2, 4], 150_000),
        ];

        let outcome = splitter.execute(&items, Some(&customer())).await.unwrap();
        assert_eq!(outcome.redirect_code.as_str(), "FS-NEW1");
        assert_eq!(outcome.appended, vec![code("777")]);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.grand_total, 2_300_000);

        let created = api.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].total, 2_000_000);
        assert_eq!(created[0].stays.len(), 1);
        let appended = api.appended();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].subtotal, 300_000);
    }

    #[tokio::test]
    async fn append_groups_fail_independently() {
        let (api, splitter) = splitter();
        api.fail_appends_for("FS-111");
        let items = vec![
            service(ServiceTarget::Existing(code("999")), &[1], 100),
            service(ServiceTarget::Existing(code("111")), &[1], 200),
            service(ServiceTarget::Existing(code("999")), &[2], 100),
            service(ServiceTarget::Existing(code("111")), &[2], 200),
        ];

        let outcome = splitter.execute(&items, None).await.unwrap();
        assert_eq!(outcome.redirect_code, code("999"));
        assert_eq!(outcome.appended, vec![code("999")]);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].booking_code, code("111"));
        assert!(matches!(outcome.warnings[0].error, BookingError::InvalidState(_)));
        assert_eq!(api.appended().len(), 1);
        assert_eq!(api.appended()[0].subtotal, 200);
    }

    #[tokio::test]
    async fn failed_invoice_creation_sends_no_appends() {
        let (api, splitter) = splitter();
        api.fail_create(BookingError::Network("gateway timeout".into()));
        let items = vec![stay(2, 100), service(ServiceTarget::Existing(code("777")), &[1], 10)];

        let err = splitter.execute(&items, Some(&customer())).await.unwrap_err();
        assert!(matches!(err, BookingError::Network(_)));
        assert!(api.appended().is_empty());
    }

    #[tokio::test]
    async fn every_append_failing_is_an_error() {
        let (api, splitter) = splitter();
        api.fail_appends_for("FS-777");
        let items = vec![service(ServiceTarget::Existing(code("777")), &[1], 10)];
        let err = splitter.execute(&items, None).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidState(_)));
    }

    #[tokio::test]
    async fn new_invoice_requires_valid_customer() {
        let (api, splitter) = splitter();
        let items = vec![stay(2, 100)];

        let err = splitter.execute(&items, None).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));

        let mut bad = customer();
        bad.email = "not-an-email".into();
        let err = splitter.execute(&items, Some(&bad)).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        assert!(api.created().is_empty());
    }

    #[tokio::test]
    async fn empty_checkout_rejected() {
        let (_, splitter) = splitter();
        assert!(matches!(splitter.execute(&[], None).await, Err(BookingError::Validation(_))));
    }

    #[tokio::test]
    async fn revalidate_catches_new_blocks() {
        let (api, splitter) = splitter();
        let line = stay(3, 100);
        splitter.revalidate(std::slice::from_ref(&line)).await.unwrap();

        api.block("deluxe", DateRange::new(day(6, 11), day(6, 12)).unwrap());
        let err = splitter.revalidate(&[line]).await.unwrap_err();
        assert!(matches!(err, BookingError::Conflict { .. }));
    }

    #[tokio::test]
    async fn buy_now_leaves_cart_alone() {
        let (api, splitter) = splitter();
        let ctx = SessionContext::new(FixedOffset::east_opt(0).unwrap());
        let mut cart = CartAggregator::new(api.clone(), &ctx, Arc::new(NotifyHub::new()));
        cart.add(stay(1, 100)).await.unwrap();

        let outcome = splitter.buy_now(stay(2, 300), Some(&customer())).await.unwrap();
        assert_eq!(outcome.grand_total, 600);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(api.remote_items(ctx.session_id).len(), 1);
    }

    #[tokio::test]
    async fn cart_checkout_clears_cart() {
        let (api, splitter) = splitter();
        let ctx = SessionContext::new(FixedOffset::east_opt(0).unwrap());
        let mut cart = CartAggregator::new(api.clone(), &ctx, Arc::new(NotifyHub::new()));
        cart.add(stay(1, 100)).await.unwrap();
        cart.add(service(ServiceTarget::Existing(code("777")), &[1], 10)).await.unwrap();

        let outcome = splitter.checkout_cart(&mut cart, Some(&customer())).await.unwrap();
        assert_eq!(outcome.grand_total, 110);
        assert!(cart.cart().is_empty());
        assert!(api.remote_items(ctx.session_id).is_empty());
    }

    #[test]
    fn payment_url_passes_through() {
        let outcome = CheckoutOutcome {
            redirect_code: code("NEW1"),
            created: Some(InvoiceCreated {
                booking_code: code("NEW1"),
                payment_url: Some("https://pay.example/abc".into()),
            }),
            appended: Vec::new(),
            warnings: Vec::new(),
            grand_total: 1,
        };
        assert_eq!(outcome.payment_url(), Some("https://pay.example/abc"));
    }
}
