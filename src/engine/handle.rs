//! The consumer-facing handle to the cart engine.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use super::error::CartError;
use super::message::{CartRequest, CartView, Responder};
use crate::model::{AppliedCoupon, CartLine};

/// Cloneable, type-safe client for the engine task. Holds only a channel
/// sender, so cloning is cheap; the engine shuts down when the last clone
/// is dropped.
#[derive(Clone)]
pub struct CartHandle {
    sender: mpsc::Sender<CartRequest>,
}

impl CartHandle {
    pub(crate) fn new(sender: mpsc::Sender<CartRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Responder<T>) -> CartRequest,
    ) -> Result<T, CartError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| CartError::EngineClosed)?;
        response.await.map_err(|_| CartError::EngineDropped)?
    }

    /// Fetches the authoritative cart and replaces the local one. A call
    /// while another refresh is in flight is a no-op that still returns
    /// `Ok`. On failure the cart keeps its last-known state.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), CartError> {
        debug!("sending request");
        self.request(|respond_to| CartRequest::Refresh { respond_to })
            .await
    }

    /// Adds `quantity` units of a product, incrementing an existing line
    /// rather than creating a duplicate. Resolves once the remote call has
    /// settled; on failure the optimistic change is already rolled back.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        product_id: impl Into<String> + std::fmt::Debug,
        quantity: u32,
    ) -> Result<(), CartError> {
        debug!("sending request");
        let product_id = product_id.into();
        self.request(|respond_to| CartRequest::Add {
            product_id,
            quantity,
            respond_to,
        })
        .await
    }

    /// Sets a line's quantity. Quantities below 1 are rejected without
    /// touching the cart; remove the line instead.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        item_id: impl Into<String> + std::fmt::Debug,
        quantity: u32,
    ) -> Result<(), CartError> {
        debug!("sending request");
        let item_id = item_id.into();
        self.request(|respond_to| CartRequest::UpdateQuantity {
            item_id,
            quantity,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn remove_from_cart(
        &self,
        item_id: impl Into<String> + std::fmt::Debug,
    ) -> Result<(), CartError> {
        debug!("sending request");
        let item_id = item_id.into();
        self.request(|respond_to| CartRequest::Remove {
            item_id,
            respond_to,
        })
        .await
    }

    /// Empties the cart and any applied coupon locally and persists the
    /// empty snapshot. Used on logout and after successful order creation.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), CartError> {
        debug!("sending request");
        self.request(|respond_to| CartRequest::Clear { respond_to })
            .await
    }

    /// Validates a coupon code against the current cart contents. The code
    /// is uppercased before submission; the server is the sole authority on
    /// eligibility and discount amount.
    #[instrument(skip(self))]
    pub async fn apply_coupon(
        &self,
        code: impl Into<String> + std::fmt::Debug,
    ) -> Result<AppliedCoupon, CartError> {
        debug!("sending request");
        let code = code.into();
        self.request(|respond_to| CartRequest::ApplyCoupon { code, respond_to })
            .await
    }

    /// Clears the applied coupon locally; no server call is made.
    #[instrument(skip(self))]
    pub async fn remove_coupon(&self) -> Result<(), CartError> {
        debug!("sending request");
        self.request(|respond_to| CartRequest::RemoveCoupon { respond_to })
            .await
    }

    /// Snapshot of the cart with derived totals and loading state.
    pub async fn view(&self) -> Result<CartView, CartError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CartRequest::View { respond_to })
            .await
            .map_err(|_| CartError::EngineClosed)?;
        response.await.map_err(|_| CartError::EngineDropped)
    }

    pub async fn lines(&self) -> Result<Vec<CartLine>, CartError> {
        Ok(self.view().await?.lines)
    }

    /// Total units across all lines.
    pub async fn count(&self) -> Result<u32, CartError> {
        Ok(self.view().await?.count)
    }

    /// Sum of `price * quantity` from the denormalized snapshots.
    pub async fn total(&self) -> Result<f64, CartError> {
        Ok(self.view().await?.total)
    }

    /// True while a mutation targeting this item is in flight.
    pub async fn is_item_loading(&self, item_id: &str) -> Result<bool, CartError> {
        Ok(self.view().await?.is_item_loading(item_id))
    }

    /// True while a refresh that started on an empty cart is in flight.
    pub async fn is_loading(&self) -> Result<bool, CartError> {
        Ok(self.view().await?.is_loading())
    }
}
