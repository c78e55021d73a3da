use cake_common::Money;
use thiserror::Error;

use crate::{
    db_types::OrderStatusType,
    helpers::SignatureError,
    traits::{CartStoreError, CatalogError, LoyaltyStoreError, OrderStoreError},
};

/// The broad class an API error belongs to. Callers (e.g. the HTTP server) use it to decide how to report the error
/// without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was malformed. Nothing was changed.
    Validation,
    /// The order, coupon, user, product or reward tier does not exist.
    NotFound,
    /// The request was well-formed, but the current state forbids it. Nothing was changed.
    InvariantViolation,
    /// The payment gateway integration failed or is misconfigured.
    Integration,
    /// The storage backend failed.
    Backend,
}

//--------------------------------------     CartApiError      ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum CartApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product #{0} does not exist")]
    ProductNotFound(i64),
    #[error("Product #{0} is not available for ordering")]
    ProductInactive(i64),
    #[error("Product #{product_id} is not sold in a {weight} size")]
    UnknownWeight { product_id: i64, weight: String },
    #[error("Quantity must be between 1 and {max}, but was {quantity}")]
    InvalidQuantity { quantity: u32, max: u32 },
    #[error("There is no item at position {0} in the cart")]
    ItemNotFound(usize),
    #[error("Coupon {0} does not exist")]
    CouponNotFound(String),
    #[error("Coupon {0} has already been used")]
    CouponAlreadyUsed(String),
    #[error("Coupon {0} has expired")]
    CouponExpired(String),
    #[error("Coupon {code} needs a subtotal of at least {required}, but the cart subtotal is {subtotal}")]
    MinimumOrderNotMet { code: String, required: Money, subtotal: Money },
}

impl CartApiError {
    pub fn kind(&self) -> ErrorKind {
        use CartApiError::*;
        match self {
            DatabaseError(_) => ErrorKind::Backend,
            ProductNotFound(_) | ItemNotFound(_) | CouponNotFound(_) => ErrorKind::NotFound,
            UnknownWeight { .. } | InvalidQuantity { .. } => ErrorKind::Validation,
            ProductInactive(_) | CouponAlreadyUsed(_) | CouponExpired(_) | MinimumOrderNotMet { .. } => {
                ErrorKind::InvariantViolation
            },
        }
    }
}

impl From<CartStoreError> for CartApiError {
    fn from(e: CartStoreError) -> Self {
        CartApiError::DatabaseError(e.to_string())
    }
}

impl From<CatalogError> for CartApiError {
    fn from(e: CatalogError) -> Self {
        CartApiError::DatabaseError(e.to_string())
    }
}

impl From<LoyaltyStoreError> for CartApiError {
    fn from(e: LoyaltyStoreError) -> Self {
        CartApiError::DatabaseError(e.to_string())
    }
}

//--------------------------------------    OrderFlowError     ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid checkout request: {0}")]
    InvalidCheckout(String),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Product #{0} is no longer available")]
    ProductUnavailable(i64),
    #[error("The promo code {0} can no longer be used")]
    CouponUnavailable(String),
    #[error("Could not find an unused order number after {0} attempts")]
    OrderNumberExhausted(usize),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("No order is waiting on gateway transaction {0}")]
    TransactionNotFound(String),
    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Order #{0} has a failed payment. It can only be cancelled")]
    PaymentFailed(i64),
    #[error("Order #{0} was changed by another request. Reload it and try again")]
    ConcurrentModification(i64),
    #[error("Orders that are {0} can only be cancelled by the bakery")]
    CancellationNotAllowed(OrderStatusType),
    #[error("Order #{0} is not a cancelled, paid order and cannot be refunded")]
    NotRefundable(i64),
    #[error("Payment cannot be started for this order: {0}")]
    PaymentNotAllowed(String),
    #[error("The payment gateway is not configured: {0}")]
    GatewayNotConfigured(String),
    #[error("Could not sign the payment request: {0}")]
    SigningFailed(SignatureError),
    #[error("Malformed gateway notification: {0}")]
    MalformedNotification(String),
    #[error("The gateway notification signature is invalid")]
    SignatureMismatch,
    #[error("The gateway reported {received}, but the order total is {expected}")]
    AmountMismatch { expected: Money, received: Money },
}

impl OrderFlowError {
    pub fn kind(&self) -> ErrorKind {
        use OrderFlowError::*;
        match self {
            DatabaseError(_) | OrderNumberExhausted(_) => ErrorKind::Backend,
            InvalidCheckout(_) | EmptyCart | MalformedNotification(_) => ErrorKind::Validation,
            OrderNotFound(_) | TransactionNotFound(_) => ErrorKind::NotFound,
            ProductUnavailable(_) |
            CouponUnavailable(_) |
            InvalidTransition { .. } |
            PaymentFailed(_) |
            ConcurrentModification(_) |
            CancellationNotAllowed(_) |
            NotRefundable(_) |
            PaymentNotAllowed(_) |
            SignatureMismatch |
            AmountMismatch { .. } => ErrorKind::InvariantViolation,
            GatewayNotConfigured(_) | SigningFailed(_) => ErrorKind::Integration,
        }
    }
}

impl From<OrderStoreError> for OrderFlowError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::CouponUnavailable(code) => OrderFlowError::CouponUnavailable(code),
            OrderStoreError::OrderNotFound(id) => OrderFlowError::OrderNotFound(id),
            e => OrderFlowError::DatabaseError(e.to_string()),
        }
    }
}

impl From<CartStoreError> for OrderFlowError {
    fn from(e: CartStoreError) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

impl From<CatalogError> for OrderFlowError {
    fn from(e: CatalogError) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

impl From<LoyaltyStoreError> for OrderFlowError {
    fn from(e: LoyaltyStoreError) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

//--------------------------------------    LoyaltyApiError    ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum LoyaltyApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Reward tier {0} does not exist")]
    UnknownTier(String),
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("Not enough points. This reward needs {required} points, you have {available}. Earn {shortfall} more.")]
    InsufficientPoints { required: i64, available: i64, shortfall: i64 },
    #[error("Points for order #{0} have already been awarded")]
    AlreadyAwarded(i64),
    #[error("Could not find an unused coupon code after {0} attempts")]
    CouponCodeExhausted(usize),
}

impl LoyaltyApiError {
    pub fn kind(&self) -> ErrorKind {
        use LoyaltyApiError::*;
        match self {
            DatabaseError(_) | CouponCodeExhausted(_) => ErrorKind::Backend,
            UnknownTier(_) | UserNotFound(_) => ErrorKind::NotFound,
            InsufficientPoints { .. } | AlreadyAwarded(_) => ErrorKind::InvariantViolation,
        }
    }
}

impl From<LoyaltyStoreError> for LoyaltyApiError {
    fn from(e: LoyaltyStoreError) -> Self {
        match e {
            LoyaltyStoreError::UserNotFound(id) => LoyaltyApiError::UserNotFound(id),
            LoyaltyStoreError::AlreadyAwarded(id) => LoyaltyApiError::AlreadyAwarded(id),
            LoyaltyStoreError::InsufficientPoints { required, available } => {
                LoyaltyApiError::InsufficientPoints { required, available, shortfall: required - available }
            },
            e => LoyaltyApiError::DatabaseError(e.to_string()),
        }
    }
}

impl From<OrderStoreError> for LoyaltyApiError {
    fn from(e: OrderStoreError) -> Self {
        LoyaltyApiError::DatabaseError(e.to_string())
    }
}
