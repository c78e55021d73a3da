use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use cake_order_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CartApi,
    LoyaltyApi,
    OrderFlowApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    auth::AdminKey,
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        AddCartItemRoute,
        ApplyPromoCodeRoute,
        CancelMyOrderRoute,
        CheckoutRoute,
        ClearCartRoute,
        MyCartRoute,
        MyCouponsRoute,
        MyLoyaltyAccountRoute,
        MyOrderByIdRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrderByNumberRoute,
        PayForOrderRoute,
        PaymentNotificationRoute,
        RedeemRewardRoute,
        RefundOrderRoute,
        RemoveCartItemRoute,
        RemovePromoCodeRoute,
        RewardTiersRoute,
        UpdateCartItemRoute,
        UpdateOrderStatusRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 128;

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, logging_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Hooks that write a line to the log for every business event. Notification integrations (email, SMS) subscribe
/// here too.
pub fn logging_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|ev| {
            Box::pin(async move {
                info!("📬️ Order {} placed by user #{} for {}", ev.order.order_number, ev.order.user_id, ev.order.total);
            }) as HookFuture
        })
        .on_order_paid(|ev| {
            Box::pin(async move {
                info!("📬️ Payment received for order {}", ev.order.order_number);
            }) as HookFuture
        })
        .on_order_status_changed(|ev| {
            Box::pin(async move {
                info!("📬️ Order {} is now {} (was {})", ev.order.order_number, ev.order.order_status, ev.old_status);
            }) as HookFuture
        })
        .on_points_awarded(|ev| {
            Box::pin(async move {
                info!("📬️ User #{} earned {} points for order #{}", ev.user_id, ev.award.total, ev.order_id);
            }) as HookFuture
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let cart_api = CartApi::new(db.clone(), config.engine.shipping);
        let orders_api = OrderFlowApi::new(db.clone(), config.engine.clone(), producers.clone());
        let loyalty_api = LoyaltyApi::new(db.clone(), config.engine.loyalty.clone(), producers.clone());
        let admin_key = AdminKey::new(config.admin_api_key.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("cake::access_log"))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(loyalty_api))
            .app_data(web::Data::new(admin_key))
            .configure(configure_routes::<SqliteDatabase>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route of the server. The API objects must already be registered as app data.
pub fn configure_routes<B>(cfg: &mut web::ServiceConfig)
where B: cake_order_engine::traits::OrderStoreDatabase + 'static {
    let api_scope = web::scope("/api")
        .service(MyCartRoute::<B>::new())
        .service(AddCartItemRoute::<B>::new())
        .service(UpdateCartItemRoute::<B>::new())
        .service(RemoveCartItemRoute::<B>::new())
        .service(ApplyPromoCodeRoute::<B>::new())
        .service(RemovePromoCodeRoute::<B>::new())
        .service(ClearCartRoute::<B>::new())
        .service(CheckoutRoute::<B>::new())
        .service(MyOrdersRoute::<B>::new())
        .service(MyOrderByIdRoute::<B>::new())
        .service(CancelMyOrderRoute::<B>::new())
        .service(PayForOrderRoute::<B>::new())
        .service(MyLoyaltyAccountRoute::<B>::new())
        .service(RewardTiersRoute::<B>::new())
        .service(RedeemRewardRoute::<B>::new())
        .service(MyCouponsRoute::<B>::new());
    let payments_scope = web::scope("/payments").service(PaymentNotificationRoute::<B>::new());
    let admin_scope = web::scope("/admin")
        .service(OrderByIdRoute::<B>::new())
        .service(OrderByNumberRoute::<B>::new())
        .service(UpdateOrderStatusRoute::<B>::new())
        .service(RefundOrderRoute::<B>::new());
    cfg.service(health).service(api_scope).service(payments_scope).service(admin_scope);
}
