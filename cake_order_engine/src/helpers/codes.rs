//! Random identifiers handed out by the engine: order numbers, coupon codes and gateway transaction ids.
use rand::{distributions::Uniform, thread_rng, Rng};

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const HEX: &[u8] = b"0123456789ABCDEF";

pub const ORDER_NUMBER_SUFFIX_LEN: usize = 6;
pub const COUPON_PREFIX: &str = "SWEET";
pub const COUPON_SUFFIX_LEN: usize = 8;
pub const TRANSACTION_PREFIX: &str = "TXN";
pub const TRANSACTION_SUFFIX_LEN: usize = 16;

fn random_string(alphabet: &[u8], len: usize) -> String {
    let dist = Uniform::from(0..alphabet.len());
    thread_rng().sample_iter(dist).take(len).map(|i| alphabet[i] as char).collect()
}

/// A candidate order number, e.g. `CK-7Q2M9X`. Uniqueness is checked by the caller.
pub fn new_order_number(prefix: &str) -> String {
    format!("{prefix}-{}", random_string(ALPHANUMERIC, ORDER_NUMBER_SUFFIX_LEN))
}

/// A candidate coupon code, e.g. `SWEET-4KD8Q2ZP`. Uniqueness is checked by the caller.
pub fn new_coupon_code() -> String {
    format!("{COUPON_PREFIX}-{}", random_string(ALPHANUMERIC, COUPON_SUFFIX_LEN))
}

/// A fresh gateway correlation id, e.g. `TXN9F03A1C2E4B5D6F7`.
pub fn new_transaction_id() -> String {
    format!("{TRANSACTION_PREFIX}{}", random_string(HEX, TRANSACTION_SUFFIX_LEN))
}
