use std::{collections::BTreeMap, fmt::Debug};

use chrono::Utc;
use log::*;

use crate::{
    cake_api::{
        cart_api::validate_coupon,
        engine_config::{EngineConfig, ShippingRates},
        errors::OrderFlowError,
        loyalty_api::LoyaltyApi,
        order_objects::{CheckoutRequest, CheckoutResult},
        payment_gateway::PaymentGateway,
        payment_objects::{GatewayNotification, GatewayPaymentForm, GatewayStatus, ReconciliationOutcome},
    },
    db_types::{
        CartSummary,
        GatewayDetails,
        NewOrder,
        Order,
        OrderItem,
        OrderNumber,
        OrderStatusType,
        PaymentMethod,
        PaymentStatus,
        StatusChange,
    },
    events::{EventProducers, OrderCreatedEvent, OrderPaidEvent, OrderStatusChangedEvent},
    helpers::{new_order_number, new_transaction_id},
    traits::OrderStoreDatabase,
};

const MAX_ORDER_NUMBER_ATTEMPTS: usize = 10;

/// `OrderFlowApi` is the primary API for the life of an order: checkout, the fulfilment state machine, and payment
/// reconciliation with the card gateway.
pub struct OrderFlowApi<B> {
    db: B,
    order_number_prefix: String,
    shipping: ShippingRates,
    gateway: PaymentGateway,
    loyalty: LoyaltyApi<B>,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone> OrderFlowApi<B> {
    pub fn new(db: B, config: EngineConfig, producers: EventProducers) -> Self {
        let loyalty = LoyaltyApi::new(db.clone(), config.loyalty, producers.clone());
        let gateway = PaymentGateway::new(config.gateway);
        Self {
            db,
            order_number_prefix: config.order_number_prefix,
            shipping: config.shipping,
            gateway,
            loyalty,
            producers,
        }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderStoreDatabase
{
    /// Turns the user's cart into an order.
    ///
    /// Cash-on-delivery orders are confirmed straight away and the cart is emptied. Gateway orders wait in `pending`
    /// for the payment notification, and the cart is kept so that an abandoned or failed payment can be retried. If the
    /// cart carries a coupon, the coupon is consumed together with the order insert.
    pub async fn checkout(&self, user_id: i64, request: CheckoutRequest) -> Result<CheckoutResult, OrderFlowError> {
        let now = Utc::now();
        request.validate(now)?;
        if request.payment_method == PaymentMethod::Gateway && !self.gateway.is_configured() {
            return Err(OrderFlowError::GatewayNotConfigured("online payments are not available".into()));
        }
        let cart = self.db.fetch_cart(user_id).await?;
        if cart.is_empty() {
            return Err(OrderFlowError::EmptyCart);
        }
        let mut items = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = self.db.fetch_product(item.product_id).await?;
            let product = match product {
                Some(p) if p.is_active && p.weight_tier(&item.weight.weight).is_some() => p,
                _ => {
                    info!("📦️ Checkout for user #{user_id} rejected. Product #{} is unavailable", item.product_id);
                    return Err(OrderFlowError::ProductUnavailable(item.product_id));
                },
            };
            items.push(OrderItem::snapshot(item, &product));
        }
        let summary = CartSummary::compute(&cart, self.shipping.fee_for(request.delivery.delivery_type));
        if let Some(promo) = &cart.promo_code {
            let coupon = self
                .db
                .fetch_coupon_by_code(&promo.code)
                .await?
                .ok_or_else(|| OrderFlowError::CouponUnavailable(promo.code.clone()))?;
            validate_coupon(&coupon, user_id, summary.subtotal, now).map_err(|e| {
                info!("📦️ Checkout for user #{user_id} rejected. {e}");
                OrderFlowError::CouponUnavailable(promo.code.clone())
            })?;
        }
        let order_number = self.unused_order_number().await?;
        let (order_status, clear_cart) = match request.payment_method {
            PaymentMethod::CashOnDelivery => (OrderStatusType::Confirmed, true),
            PaymentMethod::Gateway => (OrderStatusType::Pending, false),
        };
        let new_order = NewOrder {
            order_number,
            user_id,
            items,
            summary,
            promo_code: cart.promo_code.clone(),
            payment_method: request.payment_method,
            order_status,
            delivery: request.delivery,
            delivery_schedule: request.schedule,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
        };
        let order = self.db.insert_order(new_order, clear_cart).await?;
        info!(
            "📦️ Order {} placed by user #{user_id}. Total {} by {}",
            order.order_number, order.total, order.payment_method
        );
        self.producers.publish_order_created(OrderCreatedEvent::new(order.clone())).await;
        let (order, payment_form) = match order.payment_method {
            PaymentMethod::Gateway => {
                let (order, form) = self.start_gateway_payment(&order).await?;
                (order, Some(form))
            },
            PaymentMethod::CashOnDelivery => (order, None),
        };
        Ok(CheckoutResult { order, payment_form })
    }

    /// Moves an order through the fulfilment state machine.
    ///
    /// Only the transitions in [`OrderStatusType::legal_transitions`] are allowed, and an order whose payment failed can
    /// only be cancelled. Entering `delivered` awards loyalty points for the order. That award is best-effort: if it
    /// fails, the error is logged and the transition still stands.
    pub async fn transition_order_status(
        &self,
        order_id: i64,
        target: OrderStatusType,
        notes: Option<String>,
    ) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        let from = order.order_status;
        if order.payment_status == PaymentStatus::Failed && target != OrderStatusType::Cancelled {
            return Err(OrderFlowError::PaymentFailed(order_id));
        }
        if !from.can_transition_to(target) {
            debug!("📦️ Order #{order_id} cannot move from {from} to {target}");
            return Err(OrderFlowError::InvalidTransition { from, to: target });
        }
        let notes = notes.filter(|n| !n.trim().is_empty());
        let now = Utc::now();
        let change = match target {
            OrderStatusType::Cancelled => {
                StatusChange { cancelled_at: Some(now), cancel_reason: notes, ..Default::default() }
            },
            OrderStatusType::Delivered => {
                let cash_collected =
                    order.payment_method == PaymentMethod::CashOnDelivery && order.payment_status == PaymentStatus::Pending;
                StatusChange {
                    delivered_at: Some(now),
                    payment_status: cash_collected.then_some(PaymentStatus::Paid),
                    ..Default::default()
                }
            },
            _ => StatusChange { notes, ..Default::default() },
        };
        let updated = self
            .db
            .update_order_status(order_id, from, target, change)
            .await?
            .ok_or(OrderFlowError::ConcurrentModification(order_id))?;
        info!("📦️ Order {} moved from {from} to {target}", updated.order_number);
        if target == OrderStatusType::Delivered {
            self.award_points_for_delivery(&updated).await;
        }
        self.producers.publish_order_status_changed(OrderStatusChangedEvent::new(from, updated.clone())).await;
        Ok(updated)
    }

    /// Customers may cancel their own orders until the bakery starts preparing them.
    pub async fn cancel_order_for_user(
        &self,
        user_id: i64,
        order_id: i64,
        reason: Option<String>,
    ) -> Result<Order, OrderFlowError> {
        let order = self.order_for_user(user_id, order_id).await?;
        if !matches!(order.order_status, OrderStatusType::Pending | OrderStatusType::Confirmed) {
            return Err(OrderFlowError::CancellationNotAllowed(order.order_status));
        }
        self.transition_order_status(order_id, OrderStatusType::Cancelled, reason).await
    }

    /// Records that the payment for a cancelled order has been returned to the customer.
    pub async fn mark_refunded(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        let _ = self.fetch_order(order_id).await?;
        let order =
            self.db.mark_payment_refunded(order_id).await?.ok_or(OrderFlowError::NotRefundable(order_id))?;
        info!("📦️ Order {} marked as refunded", order.order_number);
        Ok(order)
    }

    /// Starts (or restarts, after a failed attempt) the gateway payment for a pending order, returning the signed form
    /// to post to the hosted payment page. While an attempt is still open the same transaction id is handed out again,
    /// so a notification for it always finds the order. Only a failed payment gets a new transaction id.
    pub async fn initiate_gateway_payment(
        &self,
        user_id: i64,
        order_id: i64,
    ) -> Result<GatewayPaymentForm, OrderFlowError> {
        let order = self.order_for_user(user_id, order_id).await?;
        if order.payment_method != PaymentMethod::Gateway {
            return Err(OrderFlowError::PaymentNotAllowed("cash on delivery orders are paid at the door".into()));
        }
        if order.order_status != OrderStatusType::Pending {
            return Err(OrderFlowError::PaymentNotAllowed(format!("the order is {}", order.order_status)));
        }
        if !matches!(order.payment_status, PaymentStatus::Pending | PaymentStatus::Failed) {
            return Err(OrderFlowError::PaymentNotAllowed(format!("the payment is {}", order.payment_status)));
        }
        if let (PaymentStatus::Pending, Some(txid)) = (order.payment_status, order.gateway_transaction_id.as_deref()) {
            debug!("💳️ Payment {txid} for order {} is still open. Reissuing its form", order.order_number);
            return self.gateway.payment_form(&order, txid, Utc::now());
        }
        let (_, form) = self.start_gateway_payment(&order).await?;
        Ok(form)
    }

    /// Applies a payment notification from the gateway to the order it belongs to.
    ///
    /// The steps run in a fixed order, and each one stops the process on failure:
    /// 1. the required fields are parsed,
    /// 2. the signature is verified (nothing is changed for a bad signature),
    /// 3. the order is found from the transaction id,
    /// 4. an order that is already paid is left alone,
    /// 5. the amount must match the order total exactly, otherwise the payment is marked as failed,
    /// 6. the status is applied.
    ///
    /// Replaying a notification is harmless: the second `COMPLETE` for an order reports
    /// [`ReconciliationOutcome::AlreadyPaid`].
    pub async fn process_gateway_notification(
        &self,
        fields: BTreeMap<String, String>,
    ) -> Result<ReconciliationOutcome, OrderFlowError> {
        let notification = GatewayNotification::parse(fields)?;
        let txid = notification.transaction_uuid.clone();
        trace!("💳️ Gateway notification for {txid}: {}", notification.status);
        if let Err(e) = self.gateway.verify_notification(&notification) {
            warn!("💳️ Rejected gateway notification for {txid}. {e}");
            return Err(OrderFlowError::SignatureMismatch);
        }
        let order = self
            .db
            .fetch_order_by_transaction_id(&txid)
            .await?
            .ok_or_else(|| OrderFlowError::TransactionNotFound(txid.clone()))?;
        if order.payment_status == PaymentStatus::Paid {
            debug!("💳️ Order {} is already paid. Ignoring notification for {txid}", order.order_number);
            return Ok(ReconciliationOutcome::AlreadyPaid { order_id: order.id });
        }
        if notification.amount != order.total {
            warn!(
                "💳️ Gateway reported {} for order {}, but the total is {}. Marking the payment as failed",
                notification.amount, order.order_number, order.total
            );
            self.db.mark_payment_failed(order.id).await?;
            return Err(OrderFlowError::AmountMismatch { expected: order.total, received: notification.amount });
        }
        match notification.status {
            GatewayStatus::Complete => {
                let details = GatewayDetails {
                    transaction_id: txid.clone(),
                    gateway_reference_id: notification.gateway_reference.clone().unwrap_or_default(),
                    amount: notification.amount,
                    paid_at: Utc::now(),
                };
                match self.db.mark_order_paid(order.id, details).await? {
                    Some(paid) => {
                        info!("💳️ Order {} has been paid. Transaction {txid}", paid.order_number);
                        self.producers.publish_order_paid(OrderPaidEvent::new(paid.clone())).await;
                        Ok(ReconciliationOutcome::Paid { order: paid })
                    },
                    None => {
                        debug!("💳️ Order {} was paid by a concurrent notification", order.order_number);
                        Ok(ReconciliationOutcome::AlreadyPaid { order_id: order.id })
                    },
                }
            },
            status if status.is_failure() => {
                if self.db.mark_payment_failed(order.id).await? {
                    info!("💳️ Payment for order {} failed ({status}). Transaction {txid}", order.order_number);
                    Ok(ReconciliationOutcome::MarkedFailed { order_id: order.id })
                } else {
                    debug!("💳️ Payment for order {} is {}. Ignoring {status}", order.order_number, order.payment_status);
                    Ok(ReconciliationOutcome::Ignored { order_id: order.id, status: status.to_string() })
                }
            },
            status => {
                debug!("💳️ Ignoring {status} notification for order {}", order.order_number);
                Ok(ReconciliationOutcome::Ignored { order_id: order.id, status: status.to_string() })
            },
        }
    }

    pub async fn fetch_order(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        self.db.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    pub async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderFlowError> {
        let order = self.db.fetch_order_by_number(number).await?;
        Ok(order)
    }

    /// Fetches one of the user's own orders. Other users' orders are reported as not found.
    pub async fn order_for_user(&self, user_id: i64, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        if order.user_id != user_id {
            return Err(OrderFlowError::OrderNotFound(order_id));
        }
        Ok(order)
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        Ok(orders)
    }

    pub fn loyalty(&self) -> &LoyaltyApi<B> {
        &self.loyalty
    }

    async fn start_gateway_payment(&self, order: &Order) -> Result<(Order, GatewayPaymentForm), OrderFlowError> {
        if !self.gateway.is_configured() {
            return Err(OrderFlowError::GatewayNotConfigured("online payments are not available".into()));
        }
        let txid = new_transaction_id();
        let order = self
            .db
            .assign_gateway_transaction(order.id, &txid)
            .await?
            .ok_or(OrderFlowError::ConcurrentModification(order.id))?;
        let form = self.gateway.payment_form(&order, &txid, Utc::now())?;
        debug!("💳️ Payment {txid} started for order {}", order.order_number);
        Ok((order, form))
    }

    async fn award_points_for_delivery(&self, order: &Order) {
        match self.loyalty.award_points_for_order(order.user_id, order.id, order.total).await {
            Ok(award) => debug!("🍬️ Order {} earned {} points", order.order_number, award.total),
            Err(e) => error!("🍬️ Could not award points for delivered order {}. {e}", order.order_number),
        }
    }

    async fn unused_order_number(&self) -> Result<OrderNumber, OrderFlowError> {
        for _ in 0..MAX_ORDER_NUMBER_ATTEMPTS {
            let number = OrderNumber(new_order_number(&self.order_number_prefix));
            if !self.db.order_number_exists(&number).await? {
                return Ok(number);
            }
            trace!("📦️ Order number {number} is taken. Trying another");
        }
        Err(OrderFlowError::OrderNumberExhausted(MAX_ORDER_NUMBER_ATTEMPTS))
    }
}
