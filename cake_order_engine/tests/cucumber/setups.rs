use cake_common::Money;
use cake_order_engine::db_types::{NewProduct, NewUser, WeightTier};
use cucumber::{given, when};

use crate::cucumber::{CakeShopSystem, CakeWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut CakeWorld) {
    let system = CakeShopSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a customer named '{word}'")]
async fn new_customer(world: &mut CakeWorld, name: String) {
    let user = NewUser::new(name.clone(), format!("{name}@example.com"));
    let user = world.db().create_user(user).await.expect("Error creating customer");
    world.users.insert(name, user.id);
}

#[given(expr = "a cake called '{word}' that costs {int} for {word}")]
async fn new_cake(world: &mut CakeWorld, name: String, price: i64, weight: String) {
    let product = NewProduct {
        name: name.clone(),
        images: vec![format!("https://cdn.example.com/{name}.jpg")],
        weights: vec![WeightTier { weight, label: "Serves 8".into(), price: Money::from_major(price) }],
        is_active: true,
    };
    let product = world.db().create_product(product).await.expect("Error creating cake");
    world.products.insert(name, product.id);
}

#[when(expr = "the cake '{word}' is taken off the menu")]
async fn deactivate_cake(world: &mut CakeWorld, name: String) {
    let id = world.product_id(&name);
    world.db().set_product_active(id, false).await.expect("Error deactivating cake");
}

#[when(expr = "the price of '{word}' changes to {int} for {word}")]
async fn change_price(world: &mut CakeWorld, name: String, price: i64, weight: String) {
    let id = world.product_id(&name);
    let weights = vec![WeightTier { weight, label: "Serves 8".into(), price: Money::from_major(price) }];
    world.db().update_product_prices(id, &weights).await.expect("Error changing the price");
}
