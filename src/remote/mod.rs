//! Remote service contracts.
//!
//! The backend performs the actual business logic (pricing authority,
//! inventory, coupon eligibility, payment settlement). The engine only
//! depends on these traits; production adapters map HTTP envelopes of the
//! form `{success, data}` onto them, with `success: false` becoming
//! [`RemoteError::Rejected`] and transport failures becoming
//! [`RemoteError::Transport`].
//!
//! The traits are object-safe so they can be injected as `Arc<dyn _>` the
//! same way actor clients are injected as context in the runtime layer.

pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{CartLine, CartProjection, Coupon, OrderRequest};

/// Errors surfaced by the remote services.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteError {
    /// The request never completed: connection failure, timeout, or a
    /// malformed response body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The round-trip completed but the service reported failure
    /// (`success: false`).
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// The remote cart service.
#[async_trait]
pub trait CartBackend: Send + Sync + 'static {
    /// `GET cart` — the authoritative cart contents.
    async fn fetch_cart(&self) -> Result<Vec<CartLine>, RemoteError>;

    /// `POST cart/add` — returns the created or incremented line.
    async fn add_item(&self, product_id: &str, quantity: u32) -> Result<CartLine, RemoteError>;

    /// `PATCH cart/item/{id}` — returns the updated line.
    async fn update_item(&self, item_id: &str, quantity: u32) -> Result<CartLine, RemoteError>;

    /// `DELETE cart/item/{id}`.
    async fn remove_item(&self, item_id: &str) -> Result<(), RemoteError>;
}

/// What the coupon service grants for a code against given cart contents.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponGrant {
    pub coupon: Coupon,
    pub discount_amount: f64,
}

/// The remote coupon service. Sole authority on eligibility and discount
/// math; the client never computes a discount itself.
#[async_trait]
pub trait CouponBackend: Send + Sync + 'static {
    /// `POST coupons/apply` with the uppercased code and the cart projection.
    async fn apply(&self, code: &str, cart: &[CartProjection]) -> Result<CouponGrant, RemoteError>;

    /// `GET coupons` — the list of available coupons, filtered client-side
    /// only for display.
    async fn list(&self) -> Result<Vec<Coupon>, RemoteError>;
}

/// The remote order service.
#[async_trait]
pub trait OrderBackend: Send + Sync + 'static {
    /// `POST orders` — returns the created order id.
    async fn create_order(&self, order: &OrderRequest) -> Result<String, RemoteError>;
}
