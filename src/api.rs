use async_trait::async_trait;

use crate::checkout::{AppendServicesRequest, InvoiceCreated, NewInvoiceRequest};
use crate::error::BookingError;
use crate::model::*;

#[cfg(test)]
pub(crate) mod fake;

/// Cart as returned by the remote store after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCart {
    pub cart: Cart,
    /// The server's own total; only ever cross-checked, never used.
    pub reported_total: Money,
}

/// The backend endpoints the engine consumes. Every call is a suspension
/// point; timeouts are the implementation's concern and surface as
/// `BookingError::Network`.
#[async_trait]
pub trait BookingApi: Send + Sync {
    /// `GET /availability/{unitId}`
    async fn fetch_availability(&self, unit_id: &CatalogId) -> Result<Vec<DateRange>, BookingError>;

    /// `GET /bookings/validate/{code}`
    async fn validate_booking(&self, code: &BookingCode) -> Result<ValidityWindow, BookingError>;

    /// `GET /cart/{sessionId}`
    async fn get_cart(&self, session: SessionId) -> Result<RemoteCart, BookingError>;

    /// `POST /cart/add`
    async fn add_to_cart(&self, session: SessionId, item: &CartLineItem) -> Result<RemoteCart, BookingError>;

    /// `POST /cart/remove`
    async fn remove_from_cart(&self, session: SessionId, line_id: LineId) -> Result<RemoteCart, BookingError>;

    /// `DELETE /cart/clear/{sessionId}`
    async fn clear_cart(&self, session: SessionId) -> Result<RemoteCart, BookingError>;

    /// `POST /invoices/create`
    async fn create_invoice(&self, request: &NewInvoiceRequest) -> Result<InvoiceCreated, BookingError>;

    /// `POST /invoices/add-services`
    async fn add_services(&self, request: &AppendServicesRequest) -> Result<(), BookingError>;
}
