//! Checkout: order review and creation.
//!
//! Pulls the cart view, derives the price breakdown, and submits the order
//! to the remote order service. The server either created an order or it
//! did not; no partial order state is retained client-side on failure.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::engine::{CartError, CartHandle};
use crate::model::{displayable_coupons, CartProjection, Coupon, DeliveryOptions, OrderRequest};
use crate::notify::{Notice, NoticeSender};
use crate::pricing::{price_order, PriceBreakdown};
use crate::remote::{CouponBackend, OrderBackend};

pub struct Checkout {
    cart: CartHandle,
    orders: Arc<dyn OrderBackend>,
    coupons: Arc<dyn CouponBackend>,
    notices: NoticeSender,
    /// Available coupons are fetched once per session; the filter is
    /// advisory and the server stays authoritative at apply time.
    available: Mutex<Option<Vec<Coupon>>>,
}

impl Checkout {
    pub fn new(
        cart: CartHandle,
        orders: Arc<dyn OrderBackend>,
        coupons: Arc<dyn CouponBackend>,
        notices: NoticeSender,
    ) -> Self {
        Self {
            cart,
            orders,
            coupons,
            notices,
            available: Mutex::new(None),
        }
    }

    /// The price breakdown for the review page, derived from the current
    /// cart plus the delivery/gift selections and any applied coupon.
    pub async fn review(&self, delivery: &DeliveryOptions) -> Result<PriceBreakdown, CartError> {
        let view = self.cart.view().await?;
        Ok(price_order(&view.lines, delivery, view.coupon.as_ref()))
    }

    /// Coupons worth showing in the picker: active, inside their validity
    /// window, under their usage limit. Fetched once, then served from the
    /// session cache.
    pub async fn available_coupons(&self) -> Result<Vec<Coupon>, CartError> {
        let mut cache = self.available.lock().await;
        let coupons = match cache.as_ref() {
            Some(cached) => cached,
            None => {
                let fetched = self.coupons.list().await.map_err(CartError::Remote)?;
                debug!(coupons = fetched.len(), "fetched available coupons");
                cache.insert(fetched)
            }
        };
        Ok(displayable_coupons(coupons, unix_now()))
    }

    /// Creates the order and clears the cart on success.
    #[instrument(skip(self, delivery))]
    pub async fn place_order(
        &self,
        shipping_address_id: &str,
        delivery: &DeliveryOptions,
    ) -> Result<String, CartError> {
        let view = self.cart.view().await?;
        if view.lines.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let delivery = delivery.clone().sanitized();
        let breakdown = price_order(&view.lines, &delivery, view.coupon.as_ref());
        let request = OrderRequest {
            total_amount: breakdown.total,
            shipping_address_id: shipping_address_id.to_string(),
            items: CartProjection::of(&view.lines),
            coupon_code: view.coupon.as_ref().map(|c| c.coupon.code.clone()),
            discount_amount: view.coupon.as_ref().map(|c| c.discount_amount),
            gift_design_id: delivery.gift.as_ref().map(|g| g.gift_id.clone()),
            gift_price: delivery.gift.as_ref().map(|g| g.gift_price),
            gift_card_message: delivery
                .gift
                .as_ref()
                .filter(|_| !delivery.gift_message.is_empty())
                .map(|_| delivery.gift_message.clone()),
            delivery_charges: breakdown.delivery_charges,
            delivery_type: delivery.speed,
            tax_amount: breakdown.tax_amount,
        };
        debug!(?request, "placing order");

        match self.orders.create_order(&request).await {
            Ok(order_id) => {
                info!(order_id = %order_id, total = breakdown.total, "order placed");
                self.notices.emit(Notice::OrderPlaced {
                    order_id: order_id.clone(),
                });
                // Best effort: a failed clear leaves a stale local cart
                // that the next refresh corrects.
                let _ = self.cart.clear().await;
                Ok(order_id)
            }
            Err(error) => {
                warn!(%error, "order creation failed");
                self.notices.emit(Notice::OrderFailed {
                    reason: error.to_string(),
                });
                Err(CartError::Remote(error))
            }
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}
