pub mod admin;
pub mod reservation;

pub use reservation::{
    ClaimRequest, ClaimResponse, InitiatePaymentRequest, InitiatePaymentResponse,
    PaymentMessage, PaymentMessageKind, PaymentStatus, UtmParameters, ValidateTokenResponse,
};

/// Product type reported by the token validation endpoint.
pub const PRE_ONBOARDING_PAYMENT_TYPE: &str = "pre_onboarding";
