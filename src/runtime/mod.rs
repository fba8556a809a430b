//! # System Lifecycle & Orchestration
//!
//! Wires the cart engine, focus scheduler and checkout together for one
//! session. Individual pieces are simple; this module is the conductor
//! that creates them in the right order, injects their dependencies, and
//! coordinates graceful shutdown.
//!
//! ## Startup order
//!
//! 1. Create the notice channel.
//! 2. Create the engine, which hydrates synchronously from the local store
//!    so the first render shows the last-known cart instead of flashing
//!    empty.
//! 3. Spawn the engine task and fire the initial background refresh that
//!    reconciles the hydrated snapshot with the server.
//! 4. Spawn the focus scheduler pointed at the engine handle.
//! 5. Build the checkout service around the handle and the order/coupon
//!    backends.
//!
//! ## Shutdown
//!
//! [`CartSystem::shutdown`] stops the scheduler, drops every engine handle
//! the system owns, and awaits the engine task. The engine exits when the
//! channel closes, after any in-flight remote calls have settled.

mod tracing_setup;

pub use tracing_setup::setup_tracing;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::checkout::Checkout;
use crate::engine::{CartEngine, CartHandle};
use crate::notify::{Notice, NoticeSender};
use crate::remote::{CartBackend, CouponBackend, OrderBackend};
use crate::scheduler::{FocusScheduler, SchedulerConfig};
use crate::store::CartStore;

/// Engine request channel capacity.
const CART_CHANNEL_CAPACITY: usize = 32;

/// One session's cart system: the engine task, its handle, the focus
/// scheduler, the checkout service and the notice stream.
pub struct CartSystem {
    pub cart: CartHandle,
    pub checkout: Checkout,
    pub scheduler: FocusScheduler,
    notices: Option<mpsc::UnboundedReceiver<Notice>>,
    engine_task: tokio::task::JoinHandle<()>,
}

impl CartSystem {
    /// Creates the system with all tasks running and the initial
    /// reconcile refresh already dispatched.
    pub fn new(
        cart_backend: Arc<dyn CartBackend>,
        coupon_backend: Arc<dyn CouponBackend>,
        order_backend: Arc<dyn OrderBackend>,
        store: Arc<dyn CartStore>,
    ) -> Self {
        let (notice_sender, notice_receiver) = NoticeSender::channel();

        let (engine, cart) = CartEngine::new(
            cart_backend,
            Arc::clone(&coupon_backend),
            store,
            notice_sender.clone(),
            CART_CHANNEL_CAPACITY,
        );
        let engine_task = tokio::spawn(engine.run());

        // Hydration is synchronous; reconciliation with the server happens
        // in the background so startup never blocks on the network.
        let initial = cart.clone();
        tokio::spawn(async move {
            let _ = initial.refresh().await;
        });

        let scheduler = FocusScheduler::spawn(Arc::new(cart.clone()), SchedulerConfig::default());
        let checkout = Checkout::new(
            cart.clone(),
            order_backend,
            coupon_backend,
            notice_sender,
        );

        info!("cart system started");
        Self {
            cart,
            checkout,
            scheduler,
            notices: Some(notice_receiver),
            engine_task,
        }
    }

    /// The stream of user-visible notices. Yields the receiver once; the
    /// subscribing view owns it from then on.
    pub fn take_notices(&mut self) -> Option<mpsc::UnboundedReceiver<Notice>> {
        self.notices.take()
    }

    /// Gracefully stops the scheduler and the engine. The engine drains
    /// in-flight settles before exiting.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("shutting down cart system");
        self.scheduler.shutdown().await;

        // Dropping every handle the system owns closes the engine channel.
        drop(self.checkout);
        drop(self.cart);
        drop(self.notices);

        if let Err(e) = self.engine_task.await {
            error!(error = ?e, "cart engine task failed");
            return Err(format!("cart engine task failed: {e:?}"));
        }
        info!("cart system shutdown complete");
        Ok(())
    }
}
