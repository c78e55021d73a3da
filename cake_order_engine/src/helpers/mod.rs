mod codes;
mod gateway_signature;

pub use codes::{new_coupon_code, new_order_number, new_transaction_id};
pub use gateway_signature::{
    sign_fields,
    signed_names,
    signing_message,
    verify_signature,
    SignatureError,
    SIGNED_FIELD_NAMES,
};
