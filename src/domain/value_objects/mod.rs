//! Value Objects for E-commerce

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{EcommerceError, Result};

/// Human-referenceable order number, e.g. `ORD-20261018-3F9A1C07B2`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate(at: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..10].to_uppercase();
        Self(format!("ORD-{}-{}", at.format("%Y%m%d"), suffix))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<String> for OrderNumber {
    fn from(value: String) -> Self { Self(value) }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Delivery address. Every field except `line2` is required.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    #[validate(custom = "not_blank")]
    pub street: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[validate(custom = "not_blank")]
    pub city: String,
    #[validate(custom = "not_blank")]
    pub state: String,
    #[validate(custom = "six_digit_postal_code")]
    pub postal_code: String,
    #[validate(custom = "not_blank")]
    pub country: String,
    #[validate(custom = "ten_digit_phone")]
    pub phone: String,
}

impl DeliveryAddress {
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|e| first_violation("deliveryAddress", &e))
    }
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("is required".into());
        return Err(err);
    }
    Ok(())
}

fn six_digit_postal_code(value: &str) -> std::result::Result<(), ValidationError> {
    exact_digits(value, 6, "must be a 6-digit postal code")
}

fn ten_digit_phone(value: &str) -> std::result::Result<(), ValidationError> {
    exact_digits(value, 10, "must be a 10-digit phone number")
}

fn exact_digits(value: &str, len: usize, message: &'static str) -> std::result::Result<(), ValidationError> {
    if value.len() != len || !value.bytes().all(|b| b.is_ascii_digit()) {
        let mut err = ValidationError::new("format");
        err.message = Some(message.into());
        return Err(err);
    }
    Ok(())
}

/// Turn a `validator` report into a single error naming the offending field.
/// Fields are reported in alphabetical order so the result is stable.
pub(crate) fn first_violation(prefix: &str, errors: &ValidationErrors) -> EcommerceError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(name, _)| *name);
    match fields.first() {
        Some((name, errs)) => {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "is invalid".to_string());
            let field = if prefix.is_empty() { camel_case(name) } else { format!("{}.{}", prefix, camel_case(name)) };
            EcommerceError::validation(field, message)
        }
        None => EcommerceError::validation(prefix, "is invalid"),
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' { upper = true; continue; }
        if upper { out.extend(c.to_uppercase()); upper = false; } else { out.push(c); }
    }
    out
}

/// Convert a major-unit amount to the gateway's integer minor units,
/// rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|v| v.to_i64())
        .ok_or_else(|| EcommerceError::validation("totalAmount", "is out of range"))
}

/// `price * (1 - discount / 100)`
pub fn discounted_price(price: Decimal, discount_percent: Decimal) -> Result<Decimal> {
    if price.is_sign_negative() {
        return Err(EcommerceError::validation("price", "must not be negative"));
    }
    if discount_percent < Decimal::ZERO || discount_percent > Decimal::ONE_HUNDRED {
        return Err(EcommerceError::validation("discountPercent", "must be between 0 and 100"));
    }
    price
        .checked_mul(Decimal::ONE - discount_percent / Decimal::ONE_HUNDRED)
        .ok_or_else(|| EcommerceError::validation("price", "is out of range"))
}
