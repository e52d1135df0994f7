//! The fulfillment service: every order-workflow operation, guarded by
//! role capabilities and backed by the store's atomic primitives.

use chrono::Utc;
use common::{BookId, Money, OrderId, ShipperId, UserId};
use domain::{
    Capability, DomainError, NewOrder, Order, OrderLine, OrderStatus, Role, ShipperAssignment,
    TransitionAction, compute_discount,
};
use serde::{Deserialize, Serialize};
use store::{Store, StoreError};

use crate::error::{FulfillmentError, Result};

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    /// Creates an actor from its identity and role.
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    fn require(&self, capability: Capability, action: &'static str) -> Result<()> {
        if self.role.can(capability) {
            Ok(())
        } else {
            Err(FulfillmentError::Forbidden {
                role: self.role,
                action,
            })
        }
    }
}

/// One requested line of an invoice. The unit price is snapshotted from the
/// catalog at creation time, not taken from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub book_id: BookId,
    pub quantity: u32,
}

/// A sales invoice submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub customer_name: String,
    pub customer_phone: String,
    pub shipping_address: Option<String>,
    pub payment_method: Option<String>,
    pub lines: Vec<InvoiceLine>,
    /// Promotion name as printed on the campaign (e.g. "TET10").
    pub promotion_code: Option<String>,
}

/// Merges duplicate book ids, summing quantities, preserving first-seen
/// order.
fn merge_lines(lines: &[InvoiceLine]) -> Vec<InvoiceLine> {
    let mut merged: Vec<InvoiceLine> = Vec::new();
    for line in lines {
        match merged.iter_mut().find(|m| m.book_id == line.book_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(*line),
        }
    }
    merged
}

fn map_transition(err: StoreError, action: TransitionAction) -> FulfillmentError {
    match err {
        StoreError::StatusConflict { current, .. } => {
            DomainError::InvalidTransition {
                from: current,
                action,
            }
            .into()
        }
        other => other.into(),
    }
}

/// Orchestrates the order workflow over the authoritative store.
pub struct FulfillmentService<S> {
    store: S,
}

impl<S: Store> FulfillmentService<S> {
    /// Creates a new service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an invoice: snapshots prices, applies the promotion's
    /// discount, reserves stock all-or-nothing, and records the order in
    /// `pending` status.
    #[tracing::instrument(skip(self, invoice), fields(customer = %invoice.customer_name))]
    pub async fn create_invoice(&self, actor: Actor, invoice: CreateInvoice) -> Result<Order> {
        actor.require(Capability::CreateInvoices, "create invoices")?;
        let started = std::time::Instant::now();

        if invoice.lines.is_empty() {
            return Err(DomainError::EmptyOrder.into());
        }

        let mut lines = Vec::new();
        for requested in merge_lines(&invoice.lines) {
            let book = self
                .store
                .get_book(requested.book_id)
                .await?
                .ok_or(StoreError::BookNotFound(requested.book_id))?;
            lines.push(OrderLine::new(book.id, requested.quantity, book.price)?);
        }
        let subtotal: Money = lines.iter().map(OrderLine::subtotal).sum();

        let promotion = match &invoice.promotion_code {
            None => None,
            Some(code) => {
                let promotion = self
                    .store
                    .list_promotions()
                    .await?
                    .into_iter()
                    .find(|p| &p.name == code)
                    .ok_or_else(|| FulfillmentError::UnknownPromotionCode(code.clone()))?;
                let today = Utc::now().date_naive();
                if !promotion.is_active_on(today) {
                    return Err(DomainError::PromotionNotApplicable {
                        promotion_id: promotion.id,
                        date: today,
                    }
                    .into());
                }
                Some(promotion)
            }
        };

        let outcome = compute_discount(promotion.as_ref(), subtotal);
        let new_order = NewOrder {
            customer_name: invoice.customer_name,
            customer_phone: invoice.customer_phone,
            shipping_address: invoice.shipping_address,
            payment_method: invoice.payment_method,
            lines,
            total_amount: subtotal,
            discount_amount: outcome.discount,
            final_amount: outcome.final_amount,
            promotion_id: promotion.map(|p| p.id),
        };
        new_order.validate()?;

        let order = self.store.create_order(new_order).await?;

        metrics::counter!("invoices_created_total").increment(1);
        metrics::histogram!("invoice_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id, total = %order.final_amount, "invoice created");
        Ok(order)
    }

    /// Confirms every order in `ids` currently in `pending` status.
    ///
    /// Idempotent per id: ids that are missing or already past `pending`
    /// are skipped, never errors. Returns the number actually confirmed.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_orders(&self, actor: Actor, ids: &[OrderId]) -> Result<u64> {
        actor.require(Capability::ConfirmOrders, "confirm orders")?;

        let mut confirmed = 0u64;
        for id in ids {
            match self
                .store
                .transition_status(*id, OrderStatus::Pending, OrderStatus::Confirmed)
                .await
            {
                Ok(true) => confirmed += 1,
                Ok(false) => {}
                Err(StoreError::OrderNotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        metrics::counter!("orders_confirmed_total").increment(confirmed);
        Ok(confirmed)
    }

    /// Assigns a shipper to a confirmed order, moving it to `delivering`.
    #[tracing::instrument(skip(self))]
    pub async fn assign_shipper(
        &self,
        actor: Actor,
        order_id: OrderId,
        shipper_id: ShipperId,
    ) -> Result<ShipperAssignment> {
        actor.require(Capability::AssignShippers, "assign shippers")?;

        let shipper_user = self
            .store
            .get_user(UserId::new(shipper_id.value()))
            .await?;
        if !shipper_user.is_some_and(|u| u.is_shipper()) {
            return Err(FulfillmentError::NotAShipper(shipper_id));
        }

        self.store
            .assign_shipper(order_id, shipper_id)
            .await
            .map_err(|e| map_transition(e, TransitionAction::AssignShipper))
    }

    /// Removes an order's active assignment, returning it to `confirmed`.
    #[tracing::instrument(skip(self))]
    pub async fn unassign_shipper(&self, actor: Actor, order_id: OrderId) -> Result<()> {
        actor.require(Capability::AssignShippers, "assign shippers")?;
        Ok(self.store.unassign_shipper(order_id).await?)
    }

    /// Confirms delivery of an order. The caller must be the assigned
    /// shipper; the assignment's `completed_at` becomes the authoritative
    /// delivery timestamp.
    #[tracing::instrument(skip(self))]
    pub async fn complete_delivery(
        &self,
        actor: Actor,
        order_id: OrderId,
    ) -> Result<ShipperAssignment> {
        actor.require(Capability::CompleteDelivery, "complete deliveries")?;

        let shipper_id = ShipperId::new(actor.user_id.value());
        let assignment = self
            .store
            .complete_delivery(order_id, shipper_id)
            .await
            .map_err(|e| map_transition(e, TransitionAction::Complete))?;
        metrics::counter!("orders_delivered_total").increment(1);
        Ok(assignment)
    }

    /// Cancels an order from `pending` or `confirmed`, restoring its stock.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, actor: Actor, order_id: OrderId) -> Result<Order> {
        actor.require(Capability::CancelOrders, "cancel orders")?;

        // The CAS may lose a race to another transition; re-read and retry
        // once so a pending→confirmed race still cancels.
        for _ in 0..2 {
            let order = self
                .store
                .get_order(order_id)
                .await?
                .ok_or(FulfillmentError::OrderNotFound(order_id))?;
            order.status.apply(TransitionAction::Cancel)?;

            if self.store.cancel_order(order_id, order.status).await? {
                metrics::counter!("orders_cancelled_total").increment(1);
                let cancelled = self
                    .store
                    .get_order(order_id)
                    .await?
                    .ok_or(FulfillmentError::OrderNotFound(order_id))?;
                return Ok(cancelled);
            }
        }

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;
        Err(DomainError::InvalidTransition {
            from: order.status,
            action: TransitionAction::Cancel,
        }
        .into())
    }

    /// Fetches an order by id.
    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.store
            .get_order(id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(id))
    }

    /// Lists all orders, newest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list_orders().await?)
    }

    /// Returns the active assignment for an order, if any.
    pub async fn active_assignment(&self, id: OrderId) -> Result<Option<ShipperAssignment>> {
        Ok(self.store.active_assignment(id).await?)
    }
}
