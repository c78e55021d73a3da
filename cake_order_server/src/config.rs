use std::{env, path::Path};

use cake_common::{helpers::parse_boolean_flag, Money, Secret, DEFAULT_CURRENCY_CODE};
use cake_order_engine::{
    cake_api::engine_config::{
        default_milestones,
        default_reward_tiers,
        DEFAULT_FIRST_ORDER_BONUS,
        DEFAULT_GATEWAY_ACTION_URL,
        DEFAULT_GATEWAY_LOCALE,
        DEFAULT_ORDER_NUMBER_PREFIX,
        DEFAULT_SPENDING_RATIO,
    },
    EngineConfig,
    GatewayConfig,
    LoyaltyConfig,
    RewardTier,
    ShippingRates,
};
use log::*;

use crate::errors::ServerError;

const DEFAULT_CAKE_HOST: &str = "127.0.0.1";
const DEFAULT_CAKE_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/cake_store.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared key that callers of the admin routes must present. If empty, the admin routes reject every request.
    pub admin_api_key: Secret<String>,
    /// If true, pending database migrations are applied on startup.
    pub run_migrations: bool,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CAKE_HOST.to_string(),
            port: DEFAULT_CAKE_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            admin_api_key: Secret::default(),
            run_migrations: true,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let host = env::var("CAKE_HOST").ok().unwrap_or_else(|| DEFAULT_CAKE_HOST.into());
        let port = env::var("CAKE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CAKE_PORT. {e} Using the default, {DEFAULT_CAKE_PORT}, instead."
                    );
                    DEFAULT_CAKE_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CAKE_PORT);
        let database_url = env::var("CAKE_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ CAKE_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let admin_api_key = env::var("CAKE_ADMIN_API_KEY").ok().unwrap_or_else(|| {
            warn!("🪛️ CAKE_ADMIN_API_KEY is not set. The admin routes will reject every request.");
            String::default()
        });
        let run_migrations = parse_boolean_flag(env::var("CAKE_RUN_MIGRATIONS").ok(), true);
        let order_number_prefix =
            env::var("CAKE_ORDER_NUMBER_PREFIX").ok().unwrap_or_else(|| DEFAULT_ORDER_NUMBER_PREFIX.to_string());
        let engine = EngineConfig::new(shipping_from_env(), loyalty_from_env(), gateway_from_env())
            .with_order_number_prefix(order_number_prefix);
        Self { host, port, database_url, admin_api_key: Secret::new(admin_api_key), run_migrations, engine }
    }
}

fn shipping_from_env() -> ShippingRates {
    let defaults = ShippingRates::default();
    ShippingRates {
        standard: money_from_env("CAKE_SHIPPING_STANDARD", defaults.standard),
        express: money_from_env("CAKE_SHIPPING_EXPRESS", defaults.express),
        pickup: money_from_env("CAKE_SHIPPING_PICKUP", defaults.pickup),
    }
}

fn loyalty_from_env() -> LoyaltyConfig {
    let spending_ratio = match int_from_env("CAKE_LOYALTY_SPENDING_RATIO", DEFAULT_SPENDING_RATIO) {
        r if r > 0 => r,
        r => {
            error!("🪛️ CAKE_LOYALTY_SPENDING_RATIO must be positive, but was {r}. Using {DEFAULT_SPENDING_RATIO}.");
            DEFAULT_SPENDING_RATIO
        },
    };
    let first_order_bonus = int_from_env("CAKE_LOYALTY_FIRST_ORDER_BONUS", DEFAULT_FIRST_ORDER_BONUS).max(0);
    let reward_tiers = match env::var("CAKE_REWARD_TIERS_FILE") {
        Ok(path) => load_reward_tiers(&path).unwrap_or_else(|e| {
            error!("🪛️ Could not load reward tiers from {path}. {e} Using the built-in tiers instead.");
            default_reward_tiers()
        }),
        Err(_) => default_reward_tiers(),
    };
    LoyaltyConfig { spending_ratio, first_order_bonus, milestones: default_milestones(), reward_tiers }
}

fn gateway_from_env() -> GatewayConfig {
    let access_key = env::var("CAKE_GATEWAY_ACCESS_KEY").ok().unwrap_or_default();
    let profile_id = env::var("CAKE_GATEWAY_PROFILE_ID").ok().unwrap_or_default();
    let secret_key = env::var("CAKE_GATEWAY_SECRET_KEY").ok().unwrap_or_default();
    if access_key.is_empty() || profile_id.is_empty() || secret_key.is_empty() {
        warn!(
            "🪛️ The payment gateway credentials (CAKE_GATEWAY_ACCESS_KEY, CAKE_GATEWAY_PROFILE_ID, \
             CAKE_GATEWAY_SECRET_KEY) are not all set. Card payments are disabled."
        );
    }
    let url = |name: &str| env::var(name).ok().unwrap_or_default();
    GatewayConfig {
        access_key,
        profile_id,
        secret_key: Secret::new(secret_key),
        action_url: env::var("CAKE_GATEWAY_ACTION_URL").ok().unwrap_or_else(|| DEFAULT_GATEWAY_ACTION_URL.into()),
        success_url: url("CAKE_GATEWAY_SUCCESS_URL"),
        failure_url: url("CAKE_GATEWAY_FAILURE_URL"),
        notify_url: url("CAKE_GATEWAY_NOTIFY_URL"),
        currency: env::var("CAKE_CURRENCY").ok().unwrap_or_else(|| DEFAULT_CURRENCY_CODE.into()),
        locale: DEFAULT_GATEWAY_LOCALE.to_string(),
    }
}

fn money_from_env(name: &str, default: Money) -> Money {
    match env::var(name) {
        Ok(s) => s.parse::<Money>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid amount for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

fn int_from_env(name: &str, default: i64) -> i64 {
    match env::var(name) {
        Ok(s) => s.trim().parse::<i64>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid number for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

/// Reads reward tiers from a JSON file containing an array of tiers.
pub fn load_reward_tiers<P: AsRef<Path>>(path: P) -> Result<Vec<RewardTier>, ServerError> {
    let data = std::fs::read_to_string(path.as_ref())?;
    let tiers = serde_json::from_str::<Vec<RewardTier>>(&data)
        .map_err(|e| ServerError::ConfigurationError(format!("Invalid reward tiers file. {e}")))?;
    if tiers.is_empty() {
        return Err(ServerError::ConfigurationError("The reward tiers file is empty".into()));
    }
    if let Some(t) = tiers.iter().find(|t| t.points_cost <= 0 || t.validity_days <= 0) {
        return Err(ServerError::ConfigurationError(format!(
            "Reward tier {} must have a positive cost and validity",
            t.id
        )));
    }
    info!("🪛️ Loaded {} reward tiers from {}", tiers.len(), path.as_ref().display());
    Ok(tiers)
}
