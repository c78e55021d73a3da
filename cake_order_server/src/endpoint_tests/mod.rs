mod cart;
mod helpers;
mod loyalty;
mod orders;
mod payments;

use actix_web::{http::StatusCode, test, test::TestRequest, App};

use crate::routes::health;

#[actix_web::test]
async fn health_check() {
    let app = test::init_service(App::new().service(health)).await;
    let res = test::call_service(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}
