//! User-visible notices.
//!
//! The engine and checkout never render anything; they emit [`Notice`]
//! values over an unbounded channel and views subscribe. Deliberately silent
//! paths (coupon auto-clear on cart change, reconcile failures) emit no
//! notice, only a `warn!` log.

use tokio::sync::mpsc;

use crate::engine::CartOp;

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    ItemAdded { product_id: String },
    QuantityUpdated { item_id: String, quantity: u32 },
    ItemRemoved { item_id: String },
    CartCleared,
    RefreshFailed { reason: String },
    MutationFailed { op: CartOp, item_id: String, reason: String },
    CouponApplied { code: String, discount: f64 },
    CouponRejected { code: String, reason: String },
    CouponRemoved,
    OrderPlaced { order_id: String },
    OrderFailed { reason: String },
}

/// Cloneable sending half of the notice channel. Emitting never fails; a
/// dropped receiver just means nobody is watching.
#[derive(Clone)]
pub struct NoticeSender(mpsc::UnboundedSender<Notice>);

impl NoticeSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    pub fn emit(&self, notice: Notice) {
        let _ = self.0.send(notice);
    }
}
