use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use cake_order_engine::{CartApiError, ErrorKind, LoyaltyApiError, OrderFlowError};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("Payment gateway error. {0}")]
    GatewayError(String),
    #[error("The gateway notification could not be authenticated.")]
    InvalidSignature,
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingIdentity | AuthError::InvalidIdentity(_) => StatusCode::UNAUTHORIZED,
                AuthError::InvalidAdminKey => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("The caller could not be identified.")]
    MissingIdentity,
    #[error("The caller identity is not valid. {0}")]
    InvalidIdentity(String),
    #[error("A valid admin key is required.")]
    InvalidAdminKey,
}

impl ServerError {
    fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Validation => Self::InvalidRequest(message),
            ErrorKind::NotFound => Self::NoRecordFound(message),
            ErrorKind::InvariantViolation => Self::Conflict(message),
            ErrorKind::Integration => Self::GatewayError(message),
            ErrorKind::Backend => {
                error!("💻️ Backend error. {message}");
                Self::BackendError(message)
            },
        }
    }
}

impl From<CartApiError> for ServerError {
    fn from(e: CartApiError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::SignatureMismatch => Self::InvalidSignature,
            e => Self::from_kind(e.kind(), e.to_string()),
        }
    }
}

impl From<LoyaltyApiError> for ServerError {
    fn from(e: LoyaltyApiError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}
