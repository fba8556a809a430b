//! Domain models for the cart and checkout flow.
//!
//! These are plain data structures with no behavior beyond small derivations.
//! All state transitions happen in the [`crate::engine`] module; all pricing
//! math lives in [`crate::pricing`].

mod cart;
mod coupon;
mod delivery;
mod order;

pub use cart::{cart_count, cart_total, CartLine, CartProjection, LineId, ProductId, ProductSnapshot};
pub use coupon::{displayable_coupons, AppliedCoupon, Coupon, CouponType};
pub use delivery::{
    DeliveryOptions, DeliverySpeed, GiftSelection, GIFT_MESSAGE_MAX, SPECIAL_INSTRUCTIONS_MAX,
};
pub use order::OrderRequest;
