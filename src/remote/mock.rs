//! Scripted backend for tests.
//!
//! [`ScriptedBackend`] implements all three remote seams over in-memory
//! expectation queues, so engine and checkout logic can be tested without a
//! server. Responses are scripted per endpoint with a fluent API:
//!
//! ```ignore
//! let backend = ScriptedBackend::new();
//! backend.expect_fetch().return_lines(vec![line]);
//! backend.expect_add().return_err(RemoteError::Rejected("out of stock".into()));
//! // ... run the code under test ...
//! backend.verify();
//! ```
//!
//! An unscripted call returns a transport error rather than panicking:
//! several engine calls run in spawned tasks, where a panic would silently
//! hang the test instead of failing it. Background reconcile fetches that a
//! test does not care about simply fail and are swallowed by the engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{CartBackend, CouponBackend, CouponGrant, OrderBackend, RemoteError};
use crate::model::{CartLine, CartProjection, Coupon, OrderRequest};

type Queue<T> = Mutex<VecDeque<Result<T, RemoteError>>>;

#[derive(Default)]
struct Script {
    fetches: Queue<Vec<CartLine>>,
    adds: Queue<CartLine>,
    updates: Queue<CartLine>,
    removes: Queue<()>,
    applies: Queue<CouponGrant>,
    lists: Queue<Vec<Coupon>>,
    orders: Queue<String>,

    fetch_calls: AtomicUsize,
    apply_calls: AtomicUsize,

    last_applied_code: Mutex<Option<String>>,
    last_order: Mutex<Option<OrderRequest>>,
    last_apply_projection: Mutex<Option<Vec<CartProjection>>>,
}

/// Cheap to clone; all clones share the same script.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Script>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_fetch(&self) -> Expectation<'_, Vec<CartLine>> {
        Expectation { queue: &self.script.fetches }
    }

    pub fn expect_add(&self) -> Expectation<'_, CartLine> {
        Expectation { queue: &self.script.adds }
    }

    pub fn expect_update(&self) -> Expectation<'_, CartLine> {
        Expectation { queue: &self.script.updates }
    }

    pub fn expect_remove(&self) -> Expectation<'_, ()> {
        Expectation { queue: &self.script.removes }
    }

    pub fn expect_apply(&self) -> Expectation<'_, CouponGrant> {
        Expectation { queue: &self.script.applies }
    }

    pub fn expect_list(&self) -> Expectation<'_, Vec<Coupon>> {
        Expectation { queue: &self.script.lists }
    }

    pub fn expect_order(&self) -> Expectation<'_, String> {
        Expectation { queue: &self.script.orders }
    }

    /// Number of `fetch_cart` calls made so far.
    pub fn fetch_calls(&self) -> usize {
        self.script.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of coupon `apply` calls made so far.
    pub fn apply_calls(&self) -> usize {
        self.script.apply_calls.load(Ordering::SeqCst)
    }

    /// The code submitted with the most recent coupon apply.
    pub fn last_applied_code(&self) -> Option<String> {
        self.script.last_applied_code.lock().unwrap().clone()
    }

    /// The cart projection submitted with the most recent coupon apply.
    pub fn last_apply_projection(&self) -> Option<Vec<CartProjection>> {
        self.script.last_apply_projection.lock().unwrap().clone()
    }

    /// The most recent order creation payload.
    pub fn last_order(&self) -> Option<OrderRequest> {
        self.script.last_order.lock().unwrap().clone()
    }

    /// Panics if any scripted response was never consumed.
    pub fn verify(&self) {
        let remaining = self.script.fetches.lock().unwrap().len()
            + self.script.adds.lock().unwrap().len()
            + self.script.updates.lock().unwrap().len()
            + self.script.removes.lock().unwrap().len()
            + self.script.applies.lock().unwrap().len()
            + self.script.lists.lock().unwrap().len()
            + self.script.orders.lock().unwrap().len();
        if remaining > 0 {
            panic!("not all scripted responses were consumed, {remaining} remaining");
        }
    }

    fn next<T>(queue: &Queue<T>, endpoint: &str) -> Result<T, RemoteError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Transport(format!("unscripted {endpoint} call"))))
    }
}

/// Fluent builder for one scripted response.
pub struct Expectation<'a, T> {
    queue: &'a Queue<T>,
}

impl<T> Expectation<'_, T> {
    pub fn return_ok(self, value: T) {
        self.queue.lock().unwrap().push_back(Ok(value));
    }

    pub fn return_err(self, error: RemoteError) {
        self.queue.lock().unwrap().push_back(Err(error));
    }
}

impl Expectation<'_, Vec<CartLine>> {
    pub fn return_lines(self, lines: Vec<CartLine>) {
        self.return_ok(lines);
    }
}

impl Expectation<'_, CartLine> {
    pub fn return_line(self, line: CartLine) {
        self.return_ok(line);
    }
}

impl Expectation<'_, CouponGrant> {
    pub fn return_grant(self, coupon: Coupon, discount_amount: f64) {
        self.return_ok(CouponGrant {
            coupon,
            discount_amount,
        });
    }
}

#[async_trait]
impl CartBackend for ScriptedBackend {
    async fn fetch_cart(&self) -> Result<Vec<CartLine>, RemoteError> {
        self.script.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.script.fetches, "fetch_cart")
    }

    async fn add_item(&self, _product_id: &str, _quantity: u32) -> Result<CartLine, RemoteError> {
        Self::next(&self.script.adds, "add_item")
    }

    async fn update_item(&self, _item_id: &str, _quantity: u32) -> Result<CartLine, RemoteError> {
        Self::next(&self.script.updates, "update_item")
    }

    async fn remove_item(&self, _item_id: &str) -> Result<(), RemoteError> {
        Self::next(&self.script.removes, "remove_item")
    }
}

#[async_trait]
impl CouponBackend for ScriptedBackend {
    async fn apply(&self, code: &str, cart: &[CartProjection]) -> Result<CouponGrant, RemoteError> {
        self.script.apply_calls.fetch_add(1, Ordering::SeqCst);
        *self.script.last_applied_code.lock().unwrap() = Some(code.to_string());
        *self.script.last_apply_projection.lock().unwrap() = Some(cart.to_vec());
        Self::next(&self.script.applies, "apply")
    }

    async fn list(&self) -> Result<Vec<Coupon>, RemoteError> {
        Self::next(&self.script.lists, "list")
    }
}

#[async_trait]
impl OrderBackend for ScriptedBackend {
    async fn create_order(&self, order: &OrderRequest) -> Result<String, RemoteError> {
        *self.script.last_order.lock().unwrap() = Some(order.clone());
        Self::next(&self.script.orders, "create_order")
    }
}
