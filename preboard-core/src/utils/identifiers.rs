//! Reservation token and order reference generation.
//!
//! The reservation token is the capability handed to the applicant; the order
//! reference is the only identifier the payment gateway ever sees.

use rand::Rng;
use time::OffsetDateTime;

pub const RESERVATION_TOKEN_PREFIX: &str = "SC-PAY-";
pub const ORDER_REFERENCE_PREFIX: &str = "SC-PRE-";

/// Uppercase letters and digits without `0`, `1` and `O`.
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNPQRSTUVWXYZ23456789";
const TOKEN_LENGTH: usize = 10;

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ORDER_SUFFIX_LENGTH: usize = 8;

/// Generate a fresh `SC-PAY-XXXXXXXXXX` reservation token.
pub fn generate_reservation_token() -> String {
    let mut rng = rand::rng();
    let mut token = String::with_capacity(RESERVATION_TOKEN_PREFIX.len() + TOKEN_LENGTH);
    token.push_str(RESERVATION_TOKEN_PREFIX);
    for _ in 0..TOKEN_LENGTH {
        let idx = rng.random_range(0..TOKEN_ALPHABET.len());
        token.push(char::from(TOKEN_ALPHABET[idx]));
    }
    token
}

/// Generate a `SC-PRE-<unix millis>_<8 base36 chars>` order reference.
pub fn generate_order_reference(now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let mut rng = rand::rng();
    let suffix: String = (0..ORDER_SUFFIX_LENGTH)
        .map(|_| char::from(BASE36_ALPHABET[rng.random_range(0..BASE36_ALPHABET.len())]))
        .collect();
    format!("{ORDER_REFERENCE_PREFIX}{millis}_{suffix}")
}

/// Cheap shape check used before hitting the store with a caller-supplied token.
pub fn is_well_formed_token(token: &str) -> bool {
    token
        .strip_prefix(RESERVATION_TOKEN_PREFIX)
        .is_some_and(|body| body.len() == TOKEN_LENGTH && body.bytes().all(|b| TOKEN_ALPHABET.contains(&b)))
}
