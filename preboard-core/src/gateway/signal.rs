//! Normalization of gateway status signals.
//!
//! The webhook and the browser return deliver the same facts under different
//! spellings: camelCase or snake_case, top level or nested under
//! `payment_result`, flattened form keys like `payment_result[response_status]`,
//! strings or numbers. Everything funnels into [`GatewaySignal`].

use serde_json::Value;

use crate::entities::PaymentStatus;

const ORDER_REFERENCE_KEYS: &[&str] = &[
    "cart_id",
    "cartId",
    "cartid",
    "tran_cartid",
    "orderReference",
    "order_reference",
];

const STATUS_KEYS: &[&str] = &[
    "respStatus",
    "resp_status",
    "response_status",
    "responseStatus",
    "tran_status",
    "tranStatus",
];

const CODE_KEYS: &[&str] = &["respCode", "resp_code", "response_code", "responseCode"];

const TRANSACTION_REF_KEYS: &[&str] = &["tranRef", "tran_ref", "transaction_ref", "transactionRef"];

const MESSAGE_KEYS: &[&str] = &[
    "respMessage",
    "resp_message",
    "response_message",
    "responseMessage",
];

const NESTED_CONTAINERS: &[&str] = &["payment_result", "paymentResult"];

/// What a signal says about the payment, before any state guard applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Completed,
    Failed,
    Processing,
    Undetermined,
}

impl SignalOutcome {
    pub fn target_status(self) -> Option<PaymentStatus> {
        match self {
            SignalOutcome::Completed => Some(PaymentStatus::Completed),
            SignalOutcome::Failed => Some(PaymentStatus::Failed),
            SignalOutcome::Processing => Some(PaymentStatus::Processing),
            SignalOutcome::Undetermined => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewaySignal {
    pub order_reference: Option<String>,
    /// Upper-cased status letter (`A`, `D`, `E`, `H`, `P`, ...).
    pub status_letter: Option<String>,
    pub response_code: Option<String>,
    pub transaction_ref: Option<String>,
    pub message: Option<String>,
}

impl GatewaySignal {
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            order_reference: top_level(payload, ORDER_REFERENCE_KEYS),
            status_letter: anywhere(payload, STATUS_KEYS).map(|s| s.to_ascii_uppercase()),
            response_code: anywhere(payload, CODE_KEYS),
            transaction_ref: anywhere(payload, TRANSACTION_REF_KEYS),
            message: anywhere(payload, MESSAGE_KEYS),
        }
    }

    fn letter_approved(&self) -> bool {
        self.status_letter.as_deref() == Some("A")
    }

    fn code_approved(&self) -> bool {
        self.response_code.as_deref() == Some("0")
    }

    fn code_declined(&self) -> bool {
        matches!(self.response_code.as_deref(), Some(code) if code != "0")
    }

    /// Letter `A` or code `0` completes; `D`/`E` fail; `H`/`P` hold.
    /// Without a recognised letter, a non-zero code fails.
    pub fn outcome(&self) -> SignalOutcome {
        if self.letter_approved() || self.code_approved() {
            return SignalOutcome::Completed;
        }
        match self.status_letter.as_deref() {
            Some("D" | "E") => SignalOutcome::Failed,
            Some("H" | "P") => SignalOutcome::Processing,
            _ if self.code_declined() => SignalOutcome::Failed,
            _ => SignalOutcome::Undetermined,
        }
    }

    /// True when a non-zero response code alone decides a failure.
    pub fn declined_by_code_only(&self) -> bool {
        !matches!(
            self.status_letter.as_deref(),
            Some("A" | "D" | "E" | "H" | "P")
        ) && self.code_declined()
    }

    /// True when both signals are present and only one of them says approved.
    pub fn signals_disagree(&self) -> bool {
        self.status_letter.is_some()
            && self.response_code.is_some()
            && self.letter_approved() != self.code_approved()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn top_level(payload: &Value, keys: &[&str]) -> Option<String> {
    let object = payload.as_object()?;
    keys.iter()
        .find_map(|key| object.get(*key).and_then(scalar_to_string))
}

/// Look at the top level, then nested containers, then bracketed form keys.
fn anywhere(payload: &Value, keys: &[&str]) -> Option<String> {
    if let Some(found) = top_level(payload, keys) {
        return Some(found);
    }
    let object = payload.as_object()?;
    for container in NESTED_CONTAINERS {
        if let Some(found) = object
            .get(*container)
            .and_then(|nested| top_level(nested, keys))
        {
            return Some(found);
        }
        let bracketed = keys.iter().find_map(|key| {
            object
                .get(&format!("{container}[{key}]"))
                .and_then(scalar_to_string)
        });
        if bracketed.is_some() {
            return bracketed;
        }
    }
    None
}
