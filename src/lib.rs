//! # cart-engine
//!
//! Client-side shopping-cart state management and order-total
//! reconciliation. The crate keeps a locally-cached cart synchronized with
//! a server-authoritative cart under concurrent, interruptible and
//! partially-failing network operations, and derives a consistent monetary
//! total (subtotal, delivery, tax, gift price, coupon discount) matching
//! what the server will eventually charge.
//!
//! ## Core Components
//!
//! - **[store]**: durable last-known cart snapshot, so startup never
//!   flashes an empty cart while the first server round-trip is pending.
//! - **[engine]**: the [`CartEngine`] task owns the in-memory cart and
//!   applies optimistic mutations with rollback-on-failure and background
//!   reconciliation; consumers hold a cloneable [`CartHandle`].
//! - **[scheduler]**: debounced, rate-limited refresh trigger for when the
//!   application regains foreground attention.
//! - **[pricing]**: pure derivation of the order [`PriceBreakdown`].
//! - **[checkout]**: order review and creation on top of the cart view.
//! - **[remote]**: `async-trait` seams for the backend services, plus a
//!   scripted mock for tests.
//! - **[runtime]**: the [`CartSystem`] orchestrator wiring it all together
//!   for one session.
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use cart_engine::{setup_tracing, CartSystem, JsonFileStore};
//!
//! setup_tracing();
//! let system = CartSystem::new(
//!     cart_backend,            // Arc<dyn CartBackend>
//!     coupon_backend,          // Arc<dyn CouponBackend>
//!     order_backend,           // Arc<dyn OrderBackend>
//!     Arc::new(JsonFileStore::new("cart.json")),
//! );
//!
//! system.cart.add_to_cart("product_1", 2).await?;
//! let breakdown = system.checkout.review(&Default::default()).await?;
//! system.shutdown().await?;
//! ```
//!
//! ## Consistency model
//!
//! Mutations apply optimistically and roll back on failure, so the UI
//! stays responsive without ever showing an unconfirmed change as
//! permanent. Every confirmed mutation triggers a background reconcile
//! fetch that replaces the local cart with server data; reconciles are
//! sequence-tagged and discarded when a newer mutation has started. The
//! cart snapshot is persisted locally on every change and re-hydrated at
//! startup.

pub mod checkout;
pub mod engine;
pub mod model;
pub mod notify;
pub mod pricing;
pub mod remote;
pub mod runtime;
pub mod scheduler;
pub mod store;

// Re-export core types for convenience
pub use checkout::Checkout;
pub use engine::{CartEngine, CartError, CartHandle, CartOp, CartView};
pub use model::{
    AppliedCoupon, CartLine, CartProjection, Coupon, CouponType, DeliveryOptions, DeliverySpeed,
    GiftSelection, OrderRequest, ProductSnapshot,
};
pub use notify::{Notice, NoticeSender};
pub use pricing::{price_order, PriceBreakdown};
pub use remote::{CartBackend, CouponBackend, CouponGrant, OrderBackend, RemoteError};
pub use runtime::{setup_tracing, CartSystem};
pub use scheduler::{FocusScheduler, RefreshTarget, SchedulerConfig};
pub use store::{CartStore, JsonFileStore, MemoryStore};
