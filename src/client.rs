use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::FixedOffset;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{BookingApi, RemoteCart};
use crate::checkout::{AppendServicesRequest, InvoiceCreated, NewInvoiceRequest};
use crate::config::Config;
use crate::context::SessionContext;
use crate::error::BookingError;
use crate::model::*;
use crate::observability::{status_label, API_REQUESTS_TOTAL, API_REQUEST_DURATION_SECONDS};
use crate::wire::*;

/// `BookingApi` over HTTP/JSON.
#[derive(Clone)]
pub struct HttpBookingApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
    offset: FixedOffset,
}

impl HttpBookingApi {
    pub fn new(base_url: &str, timeout: Duration, offset: FixedOffset) -> Result<Self, BookingError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BookingError::Validation(format!("bad API URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BookingError::Validation(format!("API URL {base_url} cannot take a path")));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BookingError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            token: None,
            offset,
        })
    }

    pub fn from_config(config: &Config, ctx: &SessionContext) -> Result<Self, BookingError> {
        let mut api = Self::new(&config.api_url, config.timeout, ctx.offset)?;
        api.token = ctx.token.clone();
        Ok(api)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send, record metrics, map failures onto the error taxonomy.
    async fn call<T: DeserializeOwned>(&self, endpoint: &'static str, request: RequestBuilder) -> Result<T, BookingError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let started = Instant::now();
        let result = request.send().await;
        metrics::histogram!(API_REQUEST_DURATION_SECONDS, "endpoint" => endpoint)
            .record(started.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                metrics::counter!(API_REQUESTS_TOTAL, "endpoint" => endpoint, "status" => status_label(None))
                    .increment(1);
                let reason = if e.is_timeout() { "request timed out".to_string() } else { e.to_string() };
                return Err(BookingError::Network(reason));
            }
        };
        let status = response.status();
        metrics::counter!(API_REQUESTS_TOTAL, "endpoint" => endpoint, "status" => status_label(Some(status.as_u16())))
            .increment(1);
        debug!(endpoint, status = status.as_u16(), "backend call");
        decode(status, response).await
    }
}

async fn decode<T: DeserializeOwned>(status: StatusCode, response: Response) -> Result<T, BookingError> {
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| BookingError::Decode(e.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| if body.is_empty() { status.to_string() } else { body });
    Err(match status {
        StatusCode::NOT_FOUND => BookingError::NotFound(message),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => BookingError::InvalidState(message),
        _ => BookingError::Network(format!("{status}: {message}")),
    })
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn fetch_availability(&self, unit_id: &CatalogId) -> Result<Vec<DateRange>, BookingError> {
        let request = self.client.get(self.url(&["availability", &unit_id.0]));
        let envelope: DataEnvelope<Vec<WireRange>> = self.call("availability", request).await?;
        decode_blocked(envelope.into_data()?, self.offset)
    }

    async fn validate_booking(&self, code: &BookingCode) -> Result<ValidityWindow, BookingError> {
        let request = self.client.get(self.url(&["bookings", "validate", code.as_str()]));
        let envelope: DataEnvelope<WireWindow> = self.call("validate_booking", request).await?;
        envelope.into_data()?.into_window(self.offset)
    }

    async fn get_cart(&self, session: SessionId) -> Result<RemoteCart, BookingError> {
        let request = self.client.get(self.url(&["cart", &session.to_string()]));
        let envelope: CartEnvelope = self.call("get_cart", request).await?;
        envelope.into_remote(self.offset)
    }

    async fn add_to_cart(&self, session: SessionId, item: &CartLineItem) -> Result<RemoteCart, BookingError> {
        let body = AddToCartBody {
            session_id: session.to_string(),
            item: WireCartItem::from(item),
        };
        let request = self.client.post(self.url(&["cart", "add"])).json(&body);
        let envelope: CartEnvelope = self.call("add_to_cart", request).await?;
        envelope.into_remote(self.offset)
    }

    async fn remove_from_cart(&self, session: SessionId, line_id: LineId) -> Result<RemoteCart, BookingError> {
        let body = RemoveFromCartBody {
            session_id: session.to_string(),
            line_id: line_id.to_string(),
        };
        let request = self.client.post(self.url(&["cart", "remove"])).json(&body);
        let envelope: CartEnvelope = self.call("remove_from_cart", request).await?;
        envelope.into_remote(self.offset)
    }

    async fn clear_cart(&self, session: SessionId) -> Result<RemoteCart, BookingError> {
        let request = self.client.delete(self.url(&["cart", "clear", &session.to_string()]));
        let envelope: CartEnvelope = self.call("clear_cart", request).await?;
        envelope.into_remote(self.offset)
    }

    async fn create_invoice(&self, request: &NewInvoiceRequest) -> Result<InvoiceCreated, BookingError> {
        let body = CreateInvoiceBody::from(request);
        let request = self.client.post(self.url(&["invoices", "create"])).json(&body);
        let envelope: InvoiceEnvelope = self.call("create_invoice", request).await?;
        envelope.into_created()
    }

    async fn add_services(&self, request: &AppendServicesRequest) -> Result<(), BookingError> {
        let body = AddServicesBody::from(request);
        let request = self.client.post(self.url(&["invoices", "add-services"])).json(&body);
        let envelope: AckEnvelope = self.call("add_services", request).await?;
        require_success(envelope.success, envelope.message)
    }
}
