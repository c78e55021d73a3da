use std::time::Duration;

use cake_common::Money;
use cake_order_engine::{
    cart_objects::AddCartItem,
    db_types::{
        DeliveryInfo,
        DeliverySchedule,
        DeliveryType,
        OrderStatusType,
        PaymentMethod,
    },
    order_objects::CheckoutRequest,
    payment_objects::ReconciliationOutcome,
    traits::{CartManagement, OrderManagement},
};
use chrono::Utc;
use cucumber::{then, when};
use log::*;

use crate::cucumber::CakeWorld;

fn delivery_type(s: &str) -> DeliveryType {
    match s {
        "standard" => DeliveryType::Standard,
        "express" => DeliveryType::Express,
        "pickup" => DeliveryType::Pickup,
        s => panic!("Unknown delivery type {s}"),
    }
}

fn payment_method(s: &str) -> PaymentMethod {
    match s {
        "cash" => PaymentMethod::CashOnDelivery,
        "card" => PaymentMethod::Gateway,
        s => panic!("Unknown payment method {s}"),
    }
}

fn checkout_request(delivery: DeliveryType, method: PaymentMethod) -> CheckoutRequest {
    let address = match delivery {
        DeliveryType::Pickup => None,
        _ => Some("42 Galle Road, Colombo 03".to_string()),
    };
    CheckoutRequest {
        payment_method: method,
        delivery: DeliveryInfo {
            delivery_type: delivery,
            recipient_name: "Amaya Perera".into(),
            phone: "+94771234567".into(),
            address,
        },
        schedule: DeliverySchedule { date: Utc::now() + chrono::Duration::days(3), time_slot: "10:00-12:00".into() },
        notes: Some("Happy birthday Amaya".into()),
    }
}

//--------------------------------------        Cart           ---------------------------------------------------------

#[when(expr = "'{word}' adds {int} '{word}' cake(s) of {word} to the cart")]
async fn add_to_cart(world: &mut CakeWorld, user: String, quantity: u32, cake: String, weight: String) {
    let user_id = world.user_id(&user);
    let item = AddCartItem { product_id: world.product_id(&cake), quantity, weight, customizations: vec![] };
    match world.carts().add_item(user_id, item).await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "'{word}' applies their coupon to the cart")]
async fn apply_coupon(world: &mut CakeWorld, user: String) {
    let user_id = world.user_id(&user);
    let code = world.last_coupon.as_ref().expect("No coupon has been redeemed").code.clone();
    match world.carts().apply_coupon(user_id, &code).await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[then(expr = "the cart for '{word}' is empty")]
async fn cart_is_empty(world: &mut CakeWorld, user: String) {
    let cart = world.db().fetch_cart(world.user_id(&user)).await.expect("Error fetching cart");
    assert!(cart.is_empty(), "Cart should be empty, but has {} items", cart.items.len());
}

#[then(expr = "the cart for '{word}' has {int} line(s)")]
async fn cart_has_lines(world: &mut CakeWorld, user: String, lines: usize) {
    let cart = world.db().fetch_cart(world.user_id(&user)).await.expect("Error fetching cart");
    assert_eq!(cart.items.len(), lines);
}

#[then(expr = "the cart for '{word}' has a subtotal of {int}")]
async fn cart_subtotal(world: &mut CakeWorld, user: String, subtotal: i64) {
    let view = world.carts().cart(world.user_id(&user)).await.expect("Error fetching cart");
    assert_eq!(view.summary.subtotal, Money::from_major(subtotal));
}

//--------------------------------------      Checkout         ---------------------------------------------------------

#[when(expr = "'{word}' checks out for {word} delivery paying by {word}")]
async fn checkout(world: &mut CakeWorld, user: String, delivery: String, method: String) {
    let user_id = world.user_id(&user);
    let request = checkout_request(delivery_type(&delivery), payment_method(&method));
    match world.orders().checkout(user_id, request).await {
        Ok(result) => {
            if result.order.payment_method == PaymentMethod::Gateway {
                let form = result.payment_form.as_ref().expect("Gateway orders must come with a payment form");
                assert_eq!(form.transaction_uuid(), result.order.gateway_transaction_id.as_deref());
            } else {
                assert!(result.payment_form.is_none());
            }
            world.last_order = Some(result.order);
            world.last_error = None;
        },
        Err(e) => {
            debug!("Checkout failed: {e}");
            world.last_error = Some(e.to_string());
        },
    }
}

#[then(expr = "the order is {word} with payment {word}")]
async fn order_statuses(world: &mut CakeWorld, status: String, payment: String) {
    let id = world.last_order().id;
    let order = world.db().fetch_order_by_id(id).await.expect("Error fetching order").expect("Order not found");
    assert_eq!(order.order_status.to_string(), status, "Order status is incorrect");
    assert_eq!(order.payment_status.to_string(), payment, "Payment status is incorrect");
    world.last_order = Some(order);
}

#[then(expr = "the order has a subtotal of {int}, shipping of {int}, discount of {int} and a total of {int}")]
async fn order_totals(world: &mut CakeWorld, subtotal: i64, shipping: i64, discount: i64, total: i64) {
    let order = world.last_order();
    assert_eq!(order.subtotal, Money::from_major(subtotal), "Subtotal is incorrect");
    assert_eq!(order.shipping, Money::from_major(shipping), "Shipping is incorrect");
    assert_eq!(order.discount, Money::from_major(discount), "Discount is incorrect");
    assert_eq!(order.total, Money::from_major(total), "Total is incorrect");
    assert!(order.totals_are_consistent());
}

#[then(expr = "the order line for '{word}' costs {int} in total")]
async fn order_line_total(world: &mut CakeWorld, cake: String, total: i64) {
    let item = world.last_order().items.iter().find(|i| i.name == cake).expect("No such order line");
    assert_eq!(item.item_total, Money::from_major(total));
}

#[then(expr = "the order number starts with '{word}'")]
async fn order_number_prefix(world: &mut CakeWorld, prefix: String) {
    let number = world.last_order().order_number.to_string();
    assert!(number.starts_with(&prefix), "Order number {number} does not start with {prefix}");
}

#[then(expr = "the order has {int} item(s) with a snapshot of '{word}'")]
async fn order_items(world: &mut CakeWorld, count: usize, cake: String) {
    let product_id = world.product_id(&cake);
    let order = world.last_order();
    assert_eq!(order.items.len(), count);
    assert!(order.items.iter().all(|i| i.name == cake && i.product_id == Some(product_id)));
}

#[then(expr = "the request fails with {string}")]
async fn request_fails(world: &mut CakeWorld, message: String) {
    let err = world.last_error.as_ref().expect("Expected the last request to fail");
    assert!(err.contains(&message), "Expected an error containing '{message}', got '{err}'");
}

#[then("the request succeeds")]
async fn request_succeeds(world: &mut CakeWorld) {
    assert!(world.last_error.is_none(), "Unexpected error: {:?}", world.last_error);
}

#[then(expr = "'{word}' has {int} order(s)")]
async fn order_count(world: &mut CakeWorld, user: String, count: usize) {
    let orders = world.orders().orders_for_user(world.user_id(&user)).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
}

//--------------------------------------     Fulfilment        ---------------------------------------------------------

#[when(expr = "the bakery moves the order to {word}")]
async fn move_order(world: &mut CakeWorld, status: String) {
    let target = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let id = world.last_order().id;
    match world.orders().transition_order_status(id, target, None).await {
        Ok(order) => {
            world.last_order = Some(order);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "the bakery moves the order through {word}")]
async fn move_order_through(world: &mut CakeWorld, path: String) {
    for status in path.split(',') {
        move_order(world, status.to_string()).await;
        assert!(world.last_error.is_none(), "Could not move order to {status}: {:?}", world.last_error);
    }
}

#[when(expr = "'{word}' cancels the order because {string}")]
async fn customer_cancels(world: &mut CakeWorld, user: String, reason: String) {
    let user_id = world.user_id(&user);
    let id = world.last_order().id;
    match world.orders().cancel_order_for_user(user_id, id, Some(reason)).await {
        Ok(order) => {
            world.last_order = Some(order);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[then(expr = "the cancellation reason is {string}")]
async fn cancellation_reason(world: &mut CakeWorld, reason: String) {
    let order = world.last_order();
    assert_eq!(order.cancel_reason.as_deref(), Some(reason.as_str()));
    assert!(order.cancelled_at.is_some());
}

#[then("the order has a delivery timestamp")]
async fn delivered_at(world: &mut CakeWorld) {
    assert!(world.last_order().delivered_at.is_some());
}

#[when("the bakery refunds the order")]
async fn refund(world: &mut CakeWorld) {
    let id = world.last_order().id;
    match world.orders().mark_refunded(id).await {
        Ok(order) => {
            world.last_order = Some(order);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

//--------------------------------------      Payments         ---------------------------------------------------------

#[when(expr = "the gateway reports {word} for the order total")]
async fn gateway_reports_total(world: &mut CakeWorld, status: String) {
    let amount = world.last_order().total.to_decimal_string();
    let fields = world.signed_notification(&status, &amount);
    process_notification(world, fields).await;
}

#[when(expr = "the gateway reports {word} for an amount of {word}")]
async fn gateway_reports_amount(world: &mut CakeWorld, status: String, amount: String) {
    let fields = world.signed_notification(&status, &amount);
    process_notification(world, fields).await;
}

#[when("a notification with a forged signature reports COMPLETE for the order total")]
async fn forged_notification(world: &mut CakeWorld) {
    let amount = world.last_order().total.to_decimal_string();
    let mut fields = world.signed_notification("FAILED", &amount);
    // Keep the signature over FAILED, but claim success
    fields.insert("status".to_string(), "COMPLETE".to_string());
    process_notification(world, fields).await;
}

#[when(expr = "'{word}' retries the card payment")]
async fn retry_payment(world: &mut CakeWorld, user: String) {
    let user_id = world.user_id(&user);
    let id = world.last_order().id;
    world.previous_transaction = world.last_order().gateway_transaction_id.clone();
    match world.orders().initiate_gateway_payment(user_id, id).await {
        Ok(form) => {
            let order = world.orders().fetch_order(id).await.expect("Error fetching order");
            assert_eq!(order.gateway_transaction_id.as_deref(), form.transaction_uuid());
            world.last_order = Some(order);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "'{word}' opens the card payment page again")]
async fn reopen_payment_page(world: &mut CakeWorld, user: String) {
    retry_payment(world, user).await;
}

#[then("the payment keeps its transaction id")]
async fn same_transaction(world: &mut CakeWorld) {
    let previous = world.previous_transaction.as_deref().expect("No earlier payment attempt");
    assert_eq!(world.last_order().gateway_transaction_id.as_deref(), Some(previous));
}

#[then("the payment has a new transaction id")]
async fn new_transaction(world: &mut CakeWorld) {
    let previous = world.previous_transaction.as_deref().expect("No earlier payment attempt");
    let current = world.last_order().gateway_transaction_id.as_deref().expect("The order has no gateway transaction");
    assert_ne!(current, previous);
}

#[when(expr = "the same COMPLETE notification arrives {int} times at once")]
async fn concurrent_notifications(world: &mut CakeWorld, count: usize) {
    let amount = world.last_order().total.to_decimal_string();
    let fields = world.signed_notification("COMPLETE", &amount);
    let api = world.orders();
    let results = futures_util::future::join_all((0..count).map(|_| api.process_gateway_notification(fields.clone())))
        .await;
    let paid = results.iter().filter(|r| matches!(r, Ok(ReconciliationOutcome::Paid { .. }))).count();
    let already = results.iter().filter(|r| matches!(r, Ok(ReconciliationOutcome::AlreadyPaid { .. }))).count();
    assert_eq!(paid, 1, "Exactly one notification should pay the order");
    assert_eq!(already, count - 1);
}

async fn process_notification(world: &mut CakeWorld, fields: std::collections::BTreeMap<String, String>) {
    match world.orders().process_gateway_notification(fields).await {
        Ok(outcome) => {
            world.last_outcome = Some(outcome);
            world.last_error = None;
        },
        Err(e) => {
            world.last_outcome = None;
            world.last_error = Some(e.to_string());
        },
    }
}

#[then(expr = "the notification outcome is {word}")]
async fn notification_outcome(world: &mut CakeWorld, outcome: String) {
    let actual = world.last_outcome.as_ref().unwrap_or_else(|| panic!("No outcome. Error: {:?}", world.last_error));
    let name = match actual {
        ReconciliationOutcome::Paid { .. } => "paid",
        ReconciliationOutcome::AlreadyPaid { .. } => "already_paid",
        ReconciliationOutcome::MarkedFailed { .. } => "marked_failed",
        ReconciliationOutcome::Ignored { .. } => "ignored",
    };
    assert_eq!(name, outcome);
}

#[then("the order records the gateway payment")]
async fn gateway_details(world: &mut CakeWorld) {
    let order = world.last_order();
    let details = order.gateway_details.as_ref().expect("No gateway details");
    assert_eq!(Some(&details.transaction_id), order.gateway_transaction_id.as_ref());
    assert_eq!(details.amount, order.total);
    assert_eq!(details.gateway_reference_id, "GW-REF-0001");
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut CakeWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
