use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use cake_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    cake_api::errors::OrderFlowError,
    db_types::Order,
    helpers::{signed_names, SIGNED_FIELD_NAMES},
};

/// A signed form that the customer's browser posts to the gateway's hosted payment page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPaymentForm {
    /// Where the form must be posted.
    pub action_url: String,
    /// Every form field, including `signed_field_names` and `signature`.
    pub fields: BTreeMap<String, String>,
}

impl GatewayPaymentForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn transaction_uuid(&self) -> Option<&str> {
        self.field("transaction_uuid")
    }

    pub fn signature(&self) -> Option<&str> {
        self.field("signature")
    }
}

//--------------------------------------    GatewayStatus      ---------------------------------------------------------
/// The outcome a gateway notification reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    Complete,
    Failed,
    Cancelled,
    Declined,
    Error,
    /// Anything else, e.g. `PENDING`. Such notifications are acknowledged and ignored.
    Other(String),
}

impl GatewayStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, GatewayStatus::Failed | GatewayStatus::Cancelled | GatewayStatus::Declined | GatewayStatus::Error)
    }
}

impl FromStr for GatewayStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_uppercase().as_str() {
            "COMPLETE" => GatewayStatus::Complete,
            "FAILED" => GatewayStatus::Failed,
            "CANCELLED" => GatewayStatus::Cancelled,
            "DECLINED" => GatewayStatus::Declined,
            "ERROR" => GatewayStatus::Error,
            other => GatewayStatus::Other(other.to_string()),
        };
        Ok(status)
    }
}

impl Display for GatewayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayStatus::Complete => write!(f, "COMPLETE"),
            GatewayStatus::Failed => write!(f, "FAILED"),
            GatewayStatus::Cancelled => write!(f, "CANCELLED"),
            GatewayStatus::Declined => write!(f, "DECLINED"),
            GatewayStatus::Error => write!(f, "ERROR"),
            GatewayStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

//--------------------------------------  GatewayNotification  ---------------------------------------------------------
/// A parsed, but not yet verified, notification from the gateway.
#[derive(Debug, Clone)]
pub struct GatewayNotification {
    pub transaction_uuid: String,
    pub status: GatewayStatus,
    pub amount: Money,
    pub gateway_reference: Option<String>,
    pub signature: String,
    /// All the fields, as received. The signature is checked against these.
    pub fields: BTreeMap<String, String>,
}

impl GatewayNotification {
    pub const REQUIRED_FIELDS: [&'static str; 5] =
        ["transaction_uuid", "status", "amount", SIGNED_FIELD_NAMES, "signature"];
    /// Fields that must be covered by the signature for the notification to be trusted.
    pub const MUST_BE_SIGNED: [&'static str; 3] = ["transaction_uuid", "status", "amount"];

    pub fn parse(fields: BTreeMap<String, String>) -> Result<Self, OrderFlowError> {
        let missing = Self::REQUIRED_FIELDS
            .iter()
            .filter(|f| fields.get(**f).map(|v| v.trim().is_empty()).unwrap_or(true))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(OrderFlowError::MalformedNotification(format!("Missing fields: {}", missing.join(", "))));
        }
        let get = |name: &str| fields.get(name).map(|v| v.trim().to_string()).unwrap_or_default();
        let transaction_uuid = get("transaction_uuid");
        let status = get("status").parse::<GatewayStatus>().unwrap_or(GatewayStatus::Error);
        let amount = get("amount")
            .parse::<Money>()
            .map_err(|e| OrderFlowError::MalformedNotification(format!("Invalid amount. {e}")))?;
        // An unsigned reference is dropped so that it can never be persisted
        let reference_signed = signed_names(&get(SIGNED_FIELD_NAMES)).any(|n| n == "gateway_reference");
        let gateway_reference = fields
            .get("gateway_reference")
            .map(|v| v.trim().to_string())
            .filter(|v| reference_signed && !v.is_empty());
        let signature = get("signature");
        Ok(Self { transaction_uuid, status, amount, gateway_reference, signature, fields })
    }
}

//--------------------------------------  ReconciliationOutcome ---------------------------------------------------------
/// What a gateway notification did to its order. Every variant is a successful, acknowledged notification; rejected
/// notifications are reported as [`OrderFlowError`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// The order is now paid.
    Paid { order: Order },
    /// The order had already been paid. Nothing was changed.
    AlreadyPaid { order_id: i64 },
    /// The gateway reported a failed payment, and the order's payment is now marked as failed.
    MarkedFailed { order_id: i64 },
    /// The status does not call for any change.
    Ignored { order_id: i64, status: String },
}
