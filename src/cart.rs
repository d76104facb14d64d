use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{BookingApi, RemoteCart};
use crate::context::SessionContext;
use crate::error::BookingError;
use crate::limits::MAX_CART_ITEMS;
use crate::model::*;
use crate::notify::{CartEvent, NotifyHub};
use crate::observability::CART_TOTAL_MISMATCH_TOTAL;

/// Local view of one session's cart.
///
/// Every mutation goes to the remote store and the local copy is replaced
/// wholesale by what comes back. Mutators take `&mut self`, so a second
/// add/remove cannot start while one is still in flight.
pub struct CartAggregator {
    api: Arc<dyn BookingApi>,
    session: SessionId,
    cart: Cart,
    notify: Arc<NotifyHub>,
    /// Lines this aggregator already removed from the remote store.
    removed: HashSet<LineId>,
}

impl CartAggregator {
    pub fn new(api: Arc<dyn BookingApi>, ctx: &SessionContext, notify: Arc<NotifyHub>) -> Self {
        Self {
            api,
            session: ctx.session_id,
            cart: Cart::default(),
            notify,
            removed: HashSet::new(),
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn items(&self) -> &[CartLineItem] {
        self.cart.items()
    }

    /// Always recomputed from the lines.
    pub fn grand_total(&self) -> Money {
        self.cart.grand_total()
    }

    /// Pull the session's cart from the remote store.
    pub async fn load(&mut self) -> Result<&Cart, BookingError> {
        let remote = self.api.get_cart(self.session).await?;
        self.replace(remote);
        Ok(&self.cart)
    }

    pub async fn add(&mut self, item: CartLineItem) -> Result<&Cart, BookingError> {
        if self.cart.len() >= MAX_CART_ITEMS {
            return Err(BookingError::LimitExceeded("cart is full"));
        }
        let line_id = item.line_id();
        let remote = self.api.add_to_cart(self.session, &item).await?;
        info!(
            session = %self.session,
            line_id = %line_id,
            kind = ?item.kind(),
            total = item.total_price(),
            "cart line added"
        );
        self.replace(remote);
        Ok(&self.cart)
    }

    /// A line missing from the local copy may still exist remotely (added
    /// from another tab), so only lines this aggregator already removed
    /// skip the remote call.
    pub async fn remove(&mut self, line_id: LineId) -> Result<&Cart, BookingError> {
        if self.cart.get(line_id).is_none() && self.removed.contains(&line_id) {
            debug!(session = %self.session, line_id = %line_id, "line already removed");
            return Ok(&self.cart);
        }
        let remote = self.api.remove_from_cart(self.session, line_id).await?;
        info!(session = %self.session, line_id = %line_id, "cart line removed");
        self.removed.insert(line_id);
        self.replace(remote);
        Ok(&self.cart)
    }

    /// Empty the local cart now, then clear the remote one on a best-effort basis.
    pub async fn clear(&mut self) {
        self.cart = Cart::default();
        self.notify.send(self.session, &CartEvent::Cleared);
        if let Err(e) = self.api.clear_cart(self.session).await {
            warn!(session = %self.session, error = %e, "remote cart clear failed");
        }
    }

    fn replace(&mut self, remote: RemoteCart) {
        let RemoteCart { cart, reported_total } = remote;
        let derived = cart.grand_total();
        if derived != reported_total {
            warn!(session = %self.session, derived, reported_total, "server cart total disagrees");
            metrics::counter!(CART_TOTAL_MISMATCH_TOTAL).increment(1);
        }
        self.cart = cart;
        debug!(session = %self.session, items = self.cart.len(), total = derived, "cart replaced");
        self.notify.send(
            self.session,
            &CartEvent::Replaced {
                items: self.cart.len(),
                total: derived,
            },
        );
    }
}
