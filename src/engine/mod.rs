//! # Cart Synchronization Engine
//!
//! The engine owns the authoritative in-memory cart and keeps it
//! synchronized with the server-authoritative cart under concurrent,
//! interruptible and partially-failing network operations.
//!
//! ## Concurrency model
//!
//! The engine runs as a single task that processes [`CartRequest`] messages
//! sequentially, so no locks guard the cart state. Consumers hold a
//! cloneable [`CartHandle`] and await oneshot responses. Remote calls never
//! block the loop: a mutation applies its optimistic step when its request
//! message is processed, runs the network call in a spawned task, and
//! settles through an internal message that commits or rolls back.
//!
//! ## Optimistic mutations
//!
//! `add_to_cart`, `update_quantity` and `remove_from_cart` mutate the local
//! cart immediately and record an undo action keyed by the targeted item.
//! On remote failure (rejected or transport) the undo is applied, so the
//! cart always equals its pre-mutation state after a failed operation. On
//! success a background reconcile fetch replaces the cart wholesale with
//! server data, clearing any placeholder product snapshots.
//!
//! Loading state and rollback data are keyed per item, so mutations on
//! different items proceed independently. A second mutation targeting a
//! product with one already in flight is rejected with
//! [`CartError::MutationPending`] instead of racing; the check is by
//! product rather than line id so an add cannot slip past an optimistic
//! removal of the same product and duplicate its line on rollback.
//!
//! ## Stale-response guards
//!
//! Every reconcile fetch carries the mutation sequence number current when
//! it was issued; a reconcile older than the latest mutation is discarded
//! so it cannot clobber fresher optimistic state. Refresh results that
//! overlap a newer mutation are discarded the same way.
//!
//! ## Coupons
//!
//! An applied coupon is re-validated against the server whenever the cart
//! contents change. A failed re-validation clears the coupon silently: it
//! is an expected consequence of changing the cart, not an error.

mod error;
mod handle;
mod message;

pub use error::CartError;
pub use handle::CartHandle;
pub use message::{CartOp, CartView};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::model::{
    cart_count, cart_total, AppliedCoupon, CartLine, CartProjection, LineId, ProductId,
    ProductSnapshot,
};
use crate::notify::{Notice, NoticeSender};
use crate::remote::{CartBackend, CouponBackend, RemoteError};
use crate::store::CartStore;

use message::{CartRequest, Responder};

/// How to revert one optimistic mutation.
#[derive(Debug)]
enum Undo {
    /// Undo an optimistic add of a new line.
    RemoveLine(LineId),
    /// Undo a quantity change (covers add-to-existing and updates).
    SetQuantity(LineId, u32),
    /// Undo a removal by reinserting the line at its old position.
    Reinsert(usize, CartLine),
}

#[derive(Debug)]
struct PendingMutation {
    op: CartOp,
    /// The product the mutation targets, even when keyed by line id. An
    /// optimistic removal takes its line out of `lines`, so this is the
    /// only record that the product is still settling.
    product_id: ProductId,
    undo: Undo,
}

/// The engine task. Create with [`CartEngine::new`], then spawn
/// [`CartEngine::run`]; the engine shuts down when every [`CartHandle`]
/// clone has been dropped and all in-flight remote calls have settled.
pub struct CartEngine {
    receiver: mpsc::Receiver<CartRequest>,
    /// Weak so the engine's own reference never keeps the channel alive;
    /// spawned settle tasks upgrade it when they report back.
    self_sender: mpsc::WeakSender<CartRequest>,

    backend: Arc<dyn CartBackend>,
    coupons: Arc<dyn CouponBackend>,
    store: Arc<dyn CartStore>,
    notices: NoticeSender,

    lines: Vec<CartLine>,
    pending: HashMap<String, PendingMutation>,
    applied: Option<AppliedCoupon>,

    refresh_in_flight: bool,
    /// Only set when the refresh started on an empty cart; refreshes of a
    /// populated cart stay invisible to avoid flicker.
    refreshing_visible: bool,
    refresh_waiter: Option<Responder<()>>,
    /// Mutation sequence captured when the current refresh was issued.
    refresh_seq: u64,
    last_refresh: Option<Instant>,

    /// Bumped at the start of every mutation; stale reconciles compare
    /// against it.
    mutation_seq: u64,
    temp_id_seq: u64,
}

impl CartEngine {
    /// Creates the engine and its handle. Hydrates the cart from the local
    /// store synchronously, so the first [`CartHandle::view`] already shows
    /// the last-known snapshot instead of an empty cart.
    pub fn new(
        backend: Arc<dyn CartBackend>,
        coupons: Arc<dyn CouponBackend>,
        store: Arc<dyn CartStore>,
        notices: NoticeSender,
        buffer_size: usize,
    ) -> (Self, CartHandle) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let lines = store.load();
        info!(lines = lines.len(), "cart hydrated from local store");

        let engine = Self {
            receiver,
            self_sender: sender.downgrade(),
            backend,
            coupons,
            store,
            notices,
            lines,
            pending: HashMap::new(),
            applied: None,
            refresh_in_flight: false,
            refreshing_visible: false,
            refresh_waiter: None,
            refresh_seq: 0,
            last_refresh: None,
            mutation_seq: 0,
            temp_id_seq: 0,
        };
        (engine, CartHandle::new(sender))
    }

    /// Runs the engine's event loop until every handle is dropped.
    pub async fn run(mut self) {
        info!("cart engine started");
        while let Some(msg) = self.receiver.recv().await {
            self.handle(msg);
        }
        info!(lines = self.lines.len(), "cart engine shutdown");
    }

    fn handle(&mut self, msg: CartRequest) {
        match msg {
            CartRequest::Refresh { respond_to } => self.start_refresh(respond_to),
            CartRequest::Add {
                product_id,
                quantity,
                respond_to,
            } => self.start_add(product_id, quantity, respond_to),
            CartRequest::UpdateQuantity {
                item_id,
                quantity,
                respond_to,
            } => self.start_update(item_id, quantity, respond_to),
            CartRequest::Remove {
                item_id,
                respond_to,
            } => self.start_remove(item_id, respond_to),
            CartRequest::Clear { respond_to } => self.clear(respond_to),
            CartRequest::ApplyCoupon { code, respond_to } => {
                self.start_apply_coupon(code, respond_to)
            }
            CartRequest::RemoveCoupon { respond_to } => self.remove_coupon(respond_to),
            CartRequest::View { respond_to } => {
                let _ = respond_to.send(self.view());
            }
            CartRequest::RefreshSettled { result } => self.finish_refresh(result),
            CartRequest::MutationSettled {
                key,
                outcome,
                respond_to,
            } => self.finish_mutation(key, outcome, respond_to),
            CartRequest::ReconcileArrived { seq, result } => self.apply_reconcile(seq, result),
            CartRequest::CouponSettled {
                code,
                seq,
                manual,
                result,
                respond_to,
            } => self.finish_coupon(code, seq, manual, result, respond_to),
        }
    }

    // --- Refresh ---

    fn start_refresh(&mut self, respond_to: Responder<()>) {
        if self.refresh_in_flight {
            debug!("refresh already in flight, ignoring");
            let _ = respond_to.send(Ok(()));
            return;
        }
        self.refresh_in_flight = true;
        self.refreshing_visible = self.lines.is_empty();
        self.refresh_waiter = Some(respond_to);
        self.refresh_seq = self.mutation_seq;
        match self.last_refresh {
            Some(at) => debug!(elapsed = ?at.elapsed(), "refreshing cart"),
            None => debug!("refreshing cart for the first time"),
        }

        let backend = Arc::clone(&self.backend);
        let weak = self.self_sender.clone();
        tokio::spawn(async move {
            let result = backend.fetch_cart().await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(CartRequest::RefreshSettled { result }).await;
            }
        });
    }

    fn finish_refresh(&mut self, result: Result<Vec<CartLine>, RemoteError>) {
        self.refresh_in_flight = false;
        // Idempotent clear, whether or not it was set.
        self.refreshing_visible = false;
        let waiter = self.refresh_waiter.take();

        match result {
            Ok(lines) => {
                self.last_refresh = Some(Instant::now());
                if self.mutation_seq != self.refresh_seq {
                    debug!("discarding refresh result that overlaps a newer mutation");
                } else if self.lines != lines {
                    self.lines = lines;
                    self.persist();
                    self.revalidate_coupon();
                }
                info!(lines = self.lines.len(), "cart refreshed");
                if let Some(tx) = waiter {
                    let _ = tx.send(Ok(()));
                }
            }
            Err(error) => {
                warn!(%error, "cart refresh failed, keeping last known state");
                self.notices.emit(Notice::RefreshFailed {
                    reason: error.to_string(),
                });
                if let Some(tx) = waiter {
                    let _ = tx.send(Err(CartError::Remote(error)));
                }
            }
        }
    }

    // --- Mutations ---

    fn start_add(&mut self, product_id: ProductId, quantity: u32, respond_to: Responder<()>) {
        if quantity < 1 {
            let _ = respond_to.send(Err(CartError::InvalidQuantity));
            return;
        }
        if self.product_has_pending(&product_id) {
            let _ = respond_to.send(Err(CartError::MutationPending(product_id)));
            return;
        }
        let existing = self.lines.iter().position(|l| l.product_id == product_id);

        // Optimistic step: increment the existing line, never a duplicate.
        let undo = match existing {
            Some(idx) => {
                let line = &mut self.lines[idx];
                let undo = Undo::SetQuantity(line.id.clone(), line.quantity);
                line.quantity += quantity;
                undo
            }
            None => {
                self.temp_id_seq += 1;
                let temp_id = format!("local-{}", self.temp_id_seq);
                self.lines.push(CartLine {
                    id: temp_id.clone(),
                    product_id: product_id.clone(),
                    quantity,
                    product: ProductSnapshot::placeholder(&product_id),
                });
                Undo::RemoveLine(temp_id)
            }
        };
        debug!(product_id = %product_id, quantity, "optimistic add applied");
        self.begin_mutation(product_id.clone(), CartOp::Add, product_id.clone(), undo);

        let backend = Arc::clone(&self.backend);
        let weak = self.self_sender.clone();
        let key = product_id.clone();
        tokio::spawn(async move {
            let outcome = backend.add_item(&product_id, quantity).await.map(|_| ());
            settle(weak, key, outcome, respond_to).await;
        });
    }

    fn start_update(&mut self, item_id: LineId, quantity: u32, respond_to: Responder<()>) {
        if quantity < 1 {
            // Callers must remove the line instead of zeroing it.
            let _ = respond_to.send(Err(CartError::InvalidQuantity));
            return;
        }
        let Some(idx) = self.lines.iter().position(|l| l.id == item_id) else {
            let _ = respond_to.send(Err(CartError::UnknownLine(item_id)));
            return;
        };
        let product_id = self.lines[idx].product_id.clone();
        if self.product_has_pending(&product_id) {
            let _ = respond_to.send(Err(CartError::MutationPending(item_id)));
            return;
        }

        let undo = Undo::SetQuantity(item_id.clone(), self.lines[idx].quantity);
        self.lines[idx].quantity = quantity;
        debug!(item_id = %item_id, quantity, "optimistic quantity update applied");
        self.begin_mutation(item_id.clone(), CartOp::Update, product_id, undo);

        let backend = Arc::clone(&self.backend);
        let weak = self.self_sender.clone();
        let key = item_id.clone();
        tokio::spawn(async move {
            let outcome = backend.update_item(&item_id, quantity).await.map(|_| ());
            settle(weak, key, outcome, respond_to).await;
        });
    }

    fn start_remove(&mut self, item_id: LineId, respond_to: Responder<()>) {
        let Some(idx) = self.lines.iter().position(|l| l.id == item_id) else {
            let _ = respond_to.send(Err(CartError::UnknownLine(item_id)));
            return;
        };
        let product_id = self.lines[idx].product_id.clone();
        if self.product_has_pending(&product_id) {
            let _ = respond_to.send(Err(CartError::MutationPending(item_id)));
            return;
        }

        let line = self.lines.remove(idx);
        debug!(item_id = %item_id, "optimistic removal applied");
        self.begin_mutation(
            item_id.clone(),
            CartOp::Remove,
            product_id,
            Undo::Reinsert(idx, line),
        );

        let backend = Arc::clone(&self.backend);
        let weak = self.self_sender.clone();
        let key = item_id.clone();
        tokio::spawn(async move {
            let outcome = backend.remove_item(&item_id).await;
            settle(weak, key, outcome, respond_to).await;
        });
    }

    fn begin_mutation(&mut self, key: String, op: CartOp, product_id: ProductId, undo: Undo) {
        self.mutation_seq += 1;
        self.pending.insert(
            key,
            PendingMutation {
                op,
                product_id,
                undo,
            },
        );
        self.persist();
    }

    fn finish_mutation(
        &mut self,
        key: String,
        outcome: Result<(), RemoteError>,
        respond_to: Responder<()>,
    ) {
        let Some(pending) = self.pending.remove(&key) else {
            // The cart was cleared while this call was in flight; its undo
            // no longer applies.
            debug!(key = %key, "mutation settled after cart was cleared, ignoring");
            let _ = respond_to.send(Ok(()));
            return;
        };

        match outcome {
            Ok(()) => {
                info!(key = %key, op = ?pending.op, "cart mutation confirmed");
                self.emit_commit_notice(&key, pending.op);
                self.spawn_reconcile();
                self.revalidate_coupon();
                let _ = respond_to.send(Ok(()));
            }
            Err(error) => {
                warn!(key = %key, op = ?pending.op, %error, "cart mutation failed, rolling back");
                self.apply_undo(pending.undo);
                self.persist();
                self.notices.emit(Notice::MutationFailed {
                    op: pending.op,
                    item_id: key,
                    reason: error.to_string(),
                });
                let _ = respond_to.send(Err(CartError::Remote(error)));
            }
        }
    }

    fn apply_undo(&mut self, undo: Undo) {
        match undo {
            Undo::RemoveLine(id) => self.lines.retain(|l| l.id != id),
            Undo::SetQuantity(id, quantity) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.id == id) {
                    line.quantity = quantity;
                }
            }
            Undo::Reinsert(idx, line) => {
                let idx = idx.min(self.lines.len());
                self.lines.insert(idx, line);
            }
        }
    }

    fn emit_commit_notice(&self, key: &str, op: CartOp) {
        let notice = match op {
            CartOp::Add => Notice::ItemAdded {
                product_id: key.to_string(),
            },
            CartOp::Update => Notice::QuantityUpdated {
                item_id: key.to_string(),
                quantity: self
                    .lines
                    .iter()
                    .find(|l| l.id == key)
                    .map_or(0, |l| l.quantity),
            },
            CartOp::Remove => Notice::ItemRemoved {
                item_id: key.to_string(),
            },
            CartOp::Refresh | CartOp::Clear => return,
        };
        self.notices.emit(notice);
    }

    // --- Reconciliation ---

    /// Fire-and-forget fetch issued after every confirmed mutation. Its
    /// failure is swallowed: the cart already shows what the user asked
    /// for, and the next refresh bounds the staleness window.
    fn spawn_reconcile(&self) {
        let seq = self.mutation_seq;
        let backend = Arc::clone(&self.backend);
        let weak = self.self_sender.clone();
        tokio::spawn(async move {
            let result = backend.fetch_cart().await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(CartRequest::ReconcileArrived { seq, result }).await;
            }
        });
    }

    fn apply_reconcile(&mut self, seq: u64, result: Result<Vec<CartLine>, RemoteError>) {
        if seq < self.mutation_seq {
            debug!(seq, current = self.mutation_seq, "discarding stale reconcile");
            return;
        }
        match result {
            Ok(lines) => {
                if self.lines != lines {
                    debug!(lines = lines.len(), "cart reconciled with server");
                    self.lines = lines;
                    self.persist();
                    self.revalidate_coupon();
                }
            }
            Err(error) => {
                warn!(%error, "background reconcile failed, keeping optimistic state");
            }
        }
    }

    // --- Clear ---

    fn clear(&mut self, respond_to: Responder<()>) {
        self.lines.clear();
        self.applied = None;
        self.pending.clear();
        // Outstanding settles and reconciles are stale now.
        self.mutation_seq += 1;
        self.persist();
        info!("cart cleared");
        self.notices.emit(Notice::CartCleared);
        let _ = respond_to.send(Ok(()));
    }

    // --- Coupons ---

    fn start_apply_coupon(&mut self, code: String, respond_to: Responder<AppliedCoupon>) {
        let code = code.trim().to_uppercase();
        let projection = CartProjection::of(&self.lines);
        debug!(code = %code, lines = projection.len(), "applying coupon");

        let seq = self.mutation_seq;
        let coupons = Arc::clone(&self.coupons);
        let weak = self.self_sender.clone();
        tokio::spawn(async move {
            let result = coupons.apply(&code, &projection).await;
            match weak.upgrade() {
                Some(tx) => {
                    let _ = tx
                        .send(CartRequest::CouponSettled {
                            code,
                            seq,
                            manual: true,
                            result,
                            respond_to: Some(respond_to),
                        })
                        .await;
                }
                None => {
                    let _ = respond_to.send(Err(CartError::EngineClosed));
                }
            }
        });
    }

    /// Re-submits the applied coupon against the current cart contents.
    /// Called whenever the cart changes while a coupon is applied.
    fn revalidate_coupon(&mut self) {
        let Some(applied) = &self.applied else { return };
        let code = applied.coupon.code.clone();
        let projection = CartProjection::of(&self.lines);
        debug!(code = %code, "revalidating coupon against changed cart");

        let seq = self.mutation_seq;
        let coupons = Arc::clone(&self.coupons);
        let weak = self.self_sender.clone();
        tokio::spawn(async move {
            let result = coupons.apply(&code, &projection).await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx
                    .send(CartRequest::CouponSettled {
                        code,
                        seq,
                        manual: false,
                        result,
                        respond_to: None,
                    })
                    .await;
            }
        });
    }

    fn finish_coupon(
        &mut self,
        code: String,
        seq: u64,
        manual: bool,
        result: Result<crate::remote::CouponGrant, RemoteError>,
        respond_to: Option<Responder<AppliedCoupon>>,
    ) {
        if !manual && seq != self.mutation_seq {
            // A newer cart change has its own revalidation in flight; its
            // result decides, not this one.
            debug!(code = %code, seq, current = self.mutation_seq, "discarding stale coupon revalidation");
            return;
        }
        match result {
            Ok(grant) => {
                let still_applied = self
                    .applied
                    .as_ref()
                    .is_some_and(|a| a.coupon.code == code);
                if !manual && !still_applied {
                    // Re-validation of a coupon removed in the meantime.
                    debug!(code = %code, "dropping revalidation result for removed coupon");
                    return;
                }
                let applied = AppliedCoupon {
                    coupon: grant.coupon,
                    discount_amount: grant.discount_amount,
                };
                info!(code = %code, discount = applied.discount_amount, manual, "coupon applied");
                if manual {
                    self.notices.emit(Notice::CouponApplied {
                        code: code.clone(),
                        discount: applied.discount_amount,
                    });
                }
                self.applied = Some(applied.clone());
                if let Some(tx) = respond_to {
                    let _ = tx.send(Ok(applied));
                }
            }
            Err(error) => {
                if manual {
                    warn!(code = %code, %error, "coupon rejected");
                    self.notices.emit(Notice::CouponRejected {
                        code,
                        reason: error.to_string(),
                    });
                    if let Some(tx) = respond_to {
                        let _ = tx.send(Err(CartError::Remote(error)));
                    }
                } else if self
                    .applied
                    .as_ref()
                    .is_some_and(|a| a.coupon.code == code)
                {
                    // Expected consequence of a cart change: cleared
                    // without a user-facing notice.
                    warn!(code = %code, %error, "coupon no longer valid for cart, clearing");
                    self.applied = None;
                }
            }
        }
    }

    fn remove_coupon(&mut self, respond_to: Responder<()>) {
        // Local-only: there is no server-side coupon session to tear down.
        if self.applied.take().is_some() {
            info!("coupon removed");
            self.notices.emit(Notice::CouponRemoved);
        }
        let _ = respond_to.send(Ok(()));
    }

    // --- Reads & persistence ---

    fn view(&self) -> CartView {
        CartView {
            lines: self.lines.clone(),
            count: cart_count(&self.lines),
            total: cart_total(&self.lines),
            loading: self
                .pending
                .iter()
                .map(|(key, p)| (key.clone(), p.op))
                .collect(),
            refreshing: self.refreshing_visible,
            coupon: self.applied.clone(),
        }
    }

    /// A mutation targeting any line of this product is still in flight.
    fn product_has_pending(&self, product_id: &str) -> bool {
        self.pending.values().any(|p| p.product_id == product_id)
    }

    fn persist(&self) {
        self.store.save(&self.lines);
    }
}

/// Reports a mutation outcome back to the engine, or answers the caller
/// directly if the engine is already gone.
async fn settle(
    weak: mpsc::WeakSender<CartRequest>,
    key: String,
    outcome: Result<(), RemoteError>,
    respond_to: Responder<()>,
) {
    match weak.upgrade() {
        Some(tx) => {
            let _ = tx
                .send(CartRequest::MutationSettled {
                    key,
                    outcome,
                    respond_to,
                })
                .await;
        }
        None => {
            let _ = respond_to.send(Err(CartError::EngineClosed));
        }
    }
}
