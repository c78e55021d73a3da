//! HTTP handlers for the cake shop.
//!
//! Customer routes identify the caller with the [`Caller`](crate::auth::Caller) extractor. Admin routes are wrapped in
//! the admin key middleware. The gateway's payment notifications arrive as a plain form post and carry no caller at
//! all; their signature is checked by the engine.
//!
//! Handlers only unpack the request and hand it to `CartApi`, `OrderFlowApi` or `LoyaltyApi`. Anything more belongs in
//! the engine.
use std::collections::BTreeMap;

use actix_web::{get, web, HttpResponse, Responder};
use cake_order_engine::{
    cart_objects::AddCartItem,
    db_types::OrderNumber,
    order_objects::CheckoutRequest,
    traits::OrderStoreDatabase,
    CartApi,
    LoyaltyApi,
    OrderFlowApi,
};
use log::*;

use crate::{
    auth::Caller,
    data_objects::{
        ApplyCouponParams,
        CancelOrderParams,
        CartQuery,
        JsonResponse,
        RedeemRewardParams,
        StatusUpdateParams,
        UpdateQuantityParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires admin)  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AdminKeyMiddlewareFactory::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(my_cart => Get "/cart" impl OrderStoreDatabase);
/// Returns the caller's cart with its totals. Shipping is computed for the `delivery_type` query parameter (standard
/// delivery if omitted).
pub async fn my_cart<B: OrderStoreDatabase>(
    caller: Caller,
    query: web::Query<CartQuery>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET cart for user #{}", caller.user_id);
    let delivery_type = query.into_inner().delivery_type.unwrap_or_default();
    let cart = api.cart_for_delivery(caller.user_id, delivery_type).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(add_cart_item => Post "/cart/items" impl OrderStoreDatabase);
pub async fn add_cart_item<B: OrderStoreDatabase>(
    caller: Caller,
    body: web::Json<AddCartItem>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ POST cart item for user #{}", caller.user_id);
    let cart = api.add_item(caller.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(update_cart_item => Patch "/cart/items/{index}" impl OrderStoreDatabase);
pub async fn update_cart_item<B: OrderStoreDatabase>(
    caller: Caller,
    path: web::Path<usize>,
    body: web::Json<UpdateQuantityParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let index = path.into_inner();
    trace!("💻️ PATCH cart item {index} for user #{}", caller.user_id);
    let cart = api.update_quantity(caller.user_id, index, body.quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(remove_cart_item => Delete "/cart/items/{index}" impl OrderStoreDatabase);
pub async fn remove_cart_item<B: OrderStoreDatabase>(
    caller: Caller,
    path: web::Path<usize>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let index = path.into_inner();
    trace!("💻️ DELETE cart item {index} for user #{}", caller.user_id);
    let cart = api.remove_item(caller.user_id, index).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(apply_promo_code => Post "/cart/promo" impl OrderStoreDatabase);
pub async fn apply_promo_code<B: OrderStoreDatabase>(
    caller: Caller,
    body: web::Json<ApplyCouponParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ POST promo code for user #{}", caller.user_id);
    let cart = api.apply_coupon(caller.user_id, &body.code).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(remove_promo_code => Delete "/cart/promo" impl OrderStoreDatabase);
pub async fn remove_promo_code<B: OrderStoreDatabase>(
    caller: Caller,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ DELETE promo code for user #{}", caller.user_id);
    let cart = api.remove_promo_code(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(clear_cart => Delete "/cart" impl OrderStoreDatabase);
pub async fn clear_cart<B: OrderStoreDatabase>(
    caller: Caller,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ DELETE cart for user #{}", caller.user_id);
    api.clear(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Cart cleared.")))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(checkout => Post "/checkout" impl OrderStoreDatabase);
/// Places an order for the contents of the caller's cart. Card orders come back with the signed payment form that the
/// client must post to the gateway.
pub async fn checkout<B: OrderStoreDatabase>(
    caller: Caller,
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ POST checkout for user #{}", caller.user_id);
    let result = api.checkout(caller.user_id, body.into_inner()).await?;
    debug!("💻️ Order {} created for user #{}", result.order.order_number, caller.user_id);
    Ok(HttpResponse::Created().json(result))
}

route!(my_orders => Get "/orders" impl OrderStoreDatabase);
pub async fn my_orders<B: OrderStoreDatabase>(
    caller: Caller,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET orders for user #{}", caller.user_id);
    let orders = api.orders_for_user(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_order_by_id => Get "/orders/{id}" impl OrderStoreDatabase);
pub async fn my_order_by_id<B: OrderStoreDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️ GET order #{order_id} for user #{}", caller.user_id);
    let order = api.order_for_user(caller.user_id, order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_my_order => Post "/orders/{id}/cancel" impl OrderStoreDatabase);
pub async fn cancel_my_order<B: OrderStoreDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    body: Option<web::Json<CancelOrderParams>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️ POST cancel order #{order_id} for user #{}", caller.user_id);
    let reason = body.and_then(|b| b.into_inner().reason);
    let order = api.cancel_order_for_user(caller.user_id, order_id, reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(pay_for_order => Post "/orders/{id}/pay" impl OrderStoreDatabase);
/// Starts a new card payment attempt for one of the caller's pending orders.
pub async fn pay_for_order<B: OrderStoreDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️ POST payment for order #{order_id} for user #{}", caller.user_id);
    let form = api.initiate_gateway_payment(caller.user_id, order_id).await?;
    Ok(HttpResponse::Ok().json(form))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(payment_notification => Post "/notify" impl OrderStoreDatabase);
/// The gateway's server-to-server payment notification. The gateway posts the signed fields as a url-encoded form.
/// Nothing about the caller is trusted; the signature is the only authentication.
pub async fn payment_notification<B: OrderStoreDatabase>(
    form: web::Form<BTreeMap<String, String>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let fields = form.into_inner();
    trace!("💻️ Received payment notification with {} fields", fields.len());
    let outcome = api.process_gateway_notification(fields).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------   Loyalty  ----------------------------------------------------
route!(my_loyalty_account => Get "/loyalty" impl OrderStoreDatabase);
pub async fn my_loyalty_account<B: OrderStoreDatabase>(
    caller: Caller,
    api: web::Data<LoyaltyApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET loyalty account for user #{}", caller.user_id);
    let account = api.account(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(account))
}

route!(reward_tiers => Get "/loyalty/tiers" impl OrderStoreDatabase);
pub async fn reward_tiers<B: OrderStoreDatabase>(api: web::Data<LoyaltyApi<B>>) -> impl Responder {
    trace!("💻️ GET reward tiers");
    HttpResponse::Ok().json(api.reward_tiers())
}

route!(redeem_reward => Post "/loyalty/redeem" impl OrderStoreDatabase);
pub async fn redeem_reward<B: OrderStoreDatabase>(
    caller: Caller,
    body: web::Json<RedeemRewardParams>,
    api: web::Data<LoyaltyApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ POST redeem {} for user #{}", body.tier_id, caller.user_id);
    let coupon = api.redeem_reward(caller.user_id, &body.tier_id).await?;
    Ok(HttpResponse::Created().json(coupon))
}

route!(my_coupons => Get "/loyalty/coupons" impl OrderStoreDatabase);
pub async fn my_coupons<B: OrderStoreDatabase>(
    caller: Caller,
    api: web::Data<LoyaltyApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET coupons for user #{}", caller.user_id);
    let coupons = api.coupons_for_user(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(coupons))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(order_by_id => Get "/orders/{id}" impl OrderStoreDatabase where requires admin);
pub async fn order_by_id<B: OrderStoreDatabase>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️ GET order #{order_id} (admin)");
    let order = api.fetch_order(order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_by_number => Get "/orders/number/{order_number}" impl OrderStoreDatabase where requires admin);
/// Staff usually have the order number from a receipt or phone call rather than the internal id.
pub async fn order_by_number<B: OrderStoreDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber(path.into_inner());
    trace!("💻️ GET order {number} (admin)");
    let order = api
        .fetch_order_by_number(&number)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {number} does not exist")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Patch "/orders/{id}/status" impl OrderStoreDatabase where requires admin);
/// Moves an order to a new fulfilment status. Delivering an order awards its loyalty points.
pub async fn update_order_status<B: OrderStoreDatabase>(
    path: web::Path<i64>,
    body: web::Json<StatusUpdateParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let StatusUpdateParams { status, notes } = body.into_inner();
    info!("💻️ Admin request to move order #{order_id} to {status}");
    let order = api.transition_order_status(order_id, status, notes).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(refund_order => Post "/orders/{id}/refund" impl OrderStoreDatabase where requires admin);
pub async fn refund_order<B: OrderStoreDatabase>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    info!("💻️ Admin request to mark order #{order_id} as refunded");
    let order = api.mark_refunded(order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}
