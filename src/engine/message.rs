//! Request messages processed by the engine task.

use std::collections::HashMap;

use tokio::sync::oneshot;

use super::error::CartError;
use crate::model::{AppliedCoupon, CartLine, LineId, ProductId};
use crate::remote::{CouponGrant, RemoteError};

/// One-shot response channel for a cart operation.
pub(crate) type Responder<T> = oneshot::Sender<Result<T, CartError>>;

/// The mutation class currently affecting the cart, used to disable
/// controls and show per-row spinners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOp {
    Add,
    Update,
    Remove,
    Refresh,
    Clear,
}

/// Read-only view of the engine state handed to consumers.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    /// Total units across all lines.
    pub count: u32,
    /// Sum of `price * quantity` from the denormalized snapshots.
    pub total: f64,
    /// In-flight mutations keyed by the item they target (product id for
    /// adds, line id for updates and removals).
    pub loading: HashMap<String, CartOp>,
    /// True while a refresh that started on an empty cart is in flight.
    /// Refreshes of a populated cart stay silent to avoid flicker.
    pub refreshing: bool,
    pub coupon: Option<AppliedCoupon>,
}

impl CartView {
    pub fn is_item_loading(&self, item_id: &str) -> bool {
        self.loading.contains_key(item_id)
    }

    pub fn is_loading(&self) -> bool {
        self.refreshing
    }
}

/// Messages sent to the engine task. Consumer-facing variants originate in
/// [`super::handle::CartHandle`]; settle variants are sent back by tasks the
/// engine itself spawned for remote calls.
#[derive(Debug)]
pub(crate) enum CartRequest {
    Refresh {
        respond_to: Responder<()>,
    },
    Add {
        product_id: ProductId,
        quantity: u32,
        respond_to: Responder<()>,
    },
    UpdateQuantity {
        item_id: LineId,
        quantity: u32,
        respond_to: Responder<()>,
    },
    Remove {
        item_id: LineId,
        respond_to: Responder<()>,
    },
    Clear {
        respond_to: Responder<()>,
    },
    ApplyCoupon {
        code: String,
        respond_to: Responder<AppliedCoupon>,
    },
    RemoveCoupon {
        respond_to: Responder<()>,
    },
    View {
        respond_to: oneshot::Sender<CartView>,
    },

    // --- Settle messages from spawned remote calls ---
    RefreshSettled {
        result: Result<Vec<CartLine>, RemoteError>,
    },
    MutationSettled {
        key: String,
        outcome: Result<(), RemoteError>,
        respond_to: Responder<()>,
    },
    ReconcileArrived {
        /// Mutation sequence number current when the fetch was issued.
        seq: u64,
        result: Result<Vec<CartLine>, RemoteError>,
    },
    CouponSettled {
        code: String,
        /// Mutation sequence number current when the validation was issued.
        /// Automatic re-validations that lost the race against a newer cart
        /// change are discarded.
        seq: u64,
        /// Manual applies notify the user on failure; automatic
        /// re-validations clear the coupon silently.
        manual: bool,
        result: Result<CouponGrant, RemoteError>,
        respond_to: Option<Responder<AppliedCoupon>>,
    },
}
