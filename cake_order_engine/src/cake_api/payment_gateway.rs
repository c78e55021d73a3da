use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
    cake_api::{
        engine_config::GatewayConfig,
        errors::OrderFlowError,
        payment_objects::{GatewayNotification, GatewayPaymentForm},
    },
    db_types::Order,
    helpers::{sign_fields, signed_names, verify_signature, SignatureError, SIGNED_FIELD_NAMES},
};

/// The fields of the payment form that are covered by the signature, in signing order.
const FORM_SIGNED_FIELDS: [&str; 15] = [
    "access_key",
    "profile_id",
    "transaction_uuid",
    "signed_field_names",
    "unsigned_field_names",
    "signed_date_time",
    "locale",
    "transaction_type",
    "reference_number",
    "amount",
    "currency",
    "success_url",
    "failure_url",
    "notify_url",
    "payment_method",
];

/// The card gateway's hosted payment page: builds signed payment forms and checks the signatures on notifications.
#[derive(Debug, Clone, Default)]
pub struct PaymentGateway {
    config: GatewayConfig,
}

impl PaymentGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        !self.config.access_key.is_empty() &&
            !self.config.profile_id.is_empty() &&
            !self.config.secret_key.is_empty()
    }

    /// Builds the signed form for paying `order` under the given gateway transaction id.
    pub fn payment_form(
        &self,
        order: &Order,
        transaction_id: &str,
        now: DateTime<Utc>,
    ) -> Result<GatewayPaymentForm, OrderFlowError> {
        if !self.is_configured() {
            return Err(OrderFlowError::GatewayNotConfigured("merchant credentials are missing".into()));
        }
        let c = &self.config;
        let mut fields = BTreeMap::new();
        let mut put = |k: &str, v: String| {
            fields.insert(k.to_string(), v);
        };
        put("access_key", c.access_key.clone());
        put("profile_id", c.profile_id.clone());
        put("transaction_uuid", transaction_id.to_string());
        put(SIGNED_FIELD_NAMES, FORM_SIGNED_FIELDS.join(","));
        put("unsigned_field_names", String::new());
        put("signed_date_time", now.format("%Y-%m-%dT%H:%M:%SZ").to_string());
        put("locale", c.locale.clone());
        put("transaction_type", "sale".to_string());
        put("reference_number", order.order_number.to_string());
        put("amount", order.total.to_decimal_string());
        put("currency", c.currency.clone());
        put("success_url", c.success_url.clone());
        put("failure_url", c.failure_url.clone());
        put("notify_url", c.notify_url.clone());
        put("payment_method", "card".to_string());
        let signature = sign_fields(&fields, c.secret_key.reveal()).map_err(OrderFlowError::SigningFailed)?;
        fields.insert("signature".to_string(), signature);
        Ok(GatewayPaymentForm { action_url: c.action_url.clone(), fields })
    }

    /// Verifies the notification signature. Fails closed: the transaction id, status and amount must all be among the
    /// signed fields, otherwise the notification is rejected even if the signature over the other fields is valid.
    /// Without a secret key nothing verifies.
    pub fn verify_notification(&self, notification: &GatewayNotification) -> Result<(), SignatureError> {
        if self.config.secret_key.is_empty() {
            return Err(SignatureError::NoSecretKey);
        }
        let names = notification.fields.get(SIGNED_FIELD_NAMES).ok_or(SignatureError::NoSignedFields)?;
        let signed = signed_names(names).collect::<Vec<_>>();
        if let Some(unsigned) = GatewayNotification::MUST_BE_SIGNED.iter().find(|f| !signed.contains(*f)) {
            return Err(SignatureError::MissingField(unsigned.to_string()));
        }
        verify_signature(&notification.fields, &notification.signature, self.config.secret_key.reveal())
    }
}
