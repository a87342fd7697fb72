//! Validation of raw transaction submissions.
//!
//! Every problem is collected before failing, so a caller sees all bad
//! fields at once. Scalars arrive as raw JSON so that a wrongly typed value
//! is reported against its own field. Nothing here touches storage.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use stickers_core::error::{DomainError, FieldErrors};
use uuid::Uuid;

use super::calculator::basket_total;
use super::commands::RecordTransaction;
use super::items::LineItem;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const INVALID_STRING: &str = "Not a valid string.";
const INVALID_INTEGER: &str = "A valid integer is required.";
const INVALID_NUMBER: &str = "A valid number is required.";
const INVALID_DATETIME: &str =
    "Datetime has wrong format. Use an ISO-8601 value such as 2024-01-15T10:30:00Z.";

/// Maximum length of identifiers, SKUs and categories.
pub const MAX_ID_LENGTH: usize = 100;
/// Maximum length of an item name.
pub const MAX_NAME_LENGTH: usize = 255;
/// Fractional digits allowed in a unit price.
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// Offset-free layouts accepted after RFC 3339, read as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Minute-precision layouts with an explicit offset.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M%:z"];

/// Exclusive upper bound for prices and basket totals: ten digits in total,
/// two of them fractional.
fn amount_limit() -> Decimal {
    Decimal::from(100_000_000_u32)
}

/// A transaction exactly as submitted. Every field is optional and untyped
/// so that missing or mistyped values surface as field errors rather than
/// decode failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionInput {
    /// Caller-supplied transaction identifier.
    pub transaction_id: Option<Value>,
    /// Shopper to credit.
    pub shopper_id: Option<Value>,
    /// Point of sale.
    pub store_id: Option<Value>,
    /// ISO-8601 purchase instant.
    pub timestamp: Option<Value>,
    /// Purchased items; expected to be a list of objects.
    pub items: Option<Value>,
}

/// A line item exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemInput {
    /// Stock keeping unit.
    pub sku: Option<Value>,
    /// Display name.
    pub name: Option<Value>,
    /// Units purchased; an integer or an integral numeric string.
    pub quantity: Option<Value>,
    /// Price per unit; a JSON number or a numeric string.
    pub unit_price: Option<Value>,
    /// Product category label.
    pub category: Option<Value>,
}

/// Validates a submission and turns it into a `RecordTransaction` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` with one entry per offending field.
pub fn validate_submission(
    input: TransactionInput,
    correlation_id: Uuid,
) -> Result<RecordTransaction, DomainError> {
    let mut errors = FieldErrors::new();

    let transaction_id = required_text(
        &mut errors,
        "transaction_id",
        input.transaction_id,
        MAX_ID_LENGTH,
    );
    let shopper_id = required_text(&mut errors, "shopper_id", input.shopper_id, MAX_ID_LENGTH);
    let store_id = required_text(&mut errors, "store_id", input.store_id, MAX_ID_LENGTH);
    let timestamp = required_timestamp(&mut errors, "timestamp", input.timestamp);
    let items = required_items(&mut errors, input.items);

    errors.into_result(RecordTransaction {
        correlation_id,
        transaction_id,
        shopper_id,
        store_id,
        timestamp,
        items,
    })
}

/// Parses an ISO-8601 instant. Values without an offset are read as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    let with_offset = raw
        .strip_suffix(['Z', 'z'])
        .map_or_else(|| raw.to_owned(), |bare| format!("{bare}+00:00"));
    if let Some(parsed) = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&with_offset, format).ok())
    {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Reads a JSON scalar as text. Numbers are taken in their JSON spelling;
/// booleans, lists and objects are rejected.
fn text_of(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<Value>,
    max_length: usize,
) -> String {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return String::new();
    };
    let Some(value) = text_of(value) else {
        errors.add(field, INVALID_STRING);
        return String::new();
    };
    let value = value.trim().to_owned();
    if value.is_empty() {
        errors.add(field, BLANK);
    } else if value.chars().count() > max_length {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_length} characters."),
        );
    }
    value
}

fn required_timestamp(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<Value>,
) -> DateTime<Utc> {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return DateTime::<Utc>::UNIX_EPOCH;
    };
    let parsed = match value {
        Value::String(raw) => parse_timestamp(&raw),
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        errors.add(field, INVALID_DATETIME);
        DateTime::<Utc>::UNIX_EPOCH
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn required_items(errors: &mut FieldErrors, value: Option<Value>) -> Vec<LineItem> {
    let Some(value) = value else {
        errors.add("items", REQUIRED);
        return Vec::new();
    };
    let Value::Array(inputs) = value else {
        errors.add(
            "items",
            format!(
                "Expected a list of items but got type \"{}\".",
                json_type_name(&value)
            ),
        );
        return Vec::new();
    };
    if inputs.is_empty() {
        errors.add("items", "This list may not be empty.");
        return Vec::new();
    }

    let flagged_before = errors.clone();
    let items: Vec<LineItem> = inputs
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| validate_item(errors, index, raw))
        .collect();

    // Only a basket of well-formed items has a meaningful total.
    if *errors == flagged_before && basket_total(&items) >= amount_limit() {
        errors.add(
            "items",
            "Ensure the basket total has no more than 10 digits in total.",
        );
    }
    items
}

fn validate_item(errors: &mut FieldErrors, index: usize, raw: Value) -> Option<LineItem> {
    let input = match raw {
        Value::Object(mut fields) => {
            // A null field reads as absent, the same as at the top level.
            let mut take = |name: &str| fields.remove(name).filter(|value| !value.is_null());
            ItemInput {
                sku: take("sku"),
                name: take("name"),
                quantity: take("quantity"),
                unit_price: take("unit_price"),
                category: take("category"),
            }
        }
        other => {
            errors.add(
                format!("items[{index}]"),
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type_name(&other)
                ),
            );
            return None;
        }
    };
    let field = |name: &str| format!("items[{index}].{name}");

    Some(LineItem {
        sku: required_text(errors, &field("sku"), input.sku, MAX_ID_LENGTH),
        name: required_text(errors, &field("name"), input.name, MAX_NAME_LENGTH),
        quantity: required_quantity(errors, &field("quantity"), input.quantity),
        unit_price: required_price(errors, &field("unit_price"), input.unit_price),
        category: required_text(errors, &field("category"), input.category, MAX_ID_LENGTH),
    })
}

/// Reads an integer from a JSON number or numeric string. A fractional part
/// made only of zeros (`2.0`, `"2.00"`) is accepted.
fn integer_of(value: &Value) -> Option<i128> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_owned(),
        _ => return None,
    };
    let whole = match text.split_once('.') {
        Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole,
        Some(_) => return None,
        None => text.as_str(),
    };
    whole.parse().ok()
}

fn required_quantity(errors: &mut FieldErrors, field: &str, value: Option<Value>) -> u32 {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return 0;
    };
    let Some(quantity) = integer_of(&value) else {
        errors.add(field, INVALID_INTEGER);
        return 0;
    };
    if quantity < 1 {
        errors.add(field, "Ensure this value is greater than or equal to 1.");
        return 0;
    }
    u32::try_from(quantity).unwrap_or_else(|_| {
        errors.add(
            field,
            format!("Ensure this value is less than or equal to {}.", u32::MAX),
        );
        0
    })
}

/// Reads an exact decimal from a JSON number or numeric string, keeping the
/// scale as written.
fn decimal_of(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_owned(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn required_price(errors: &mut FieldErrors, field: &str, value: Option<Value>) -> Decimal {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return Decimal::ZERO;
    };
    let Some(price) = decimal_of(&value) else {
        errors.add(field, INVALID_NUMBER);
        return Decimal::ZERO;
    };
    if price.is_sign_negative() && !price.is_zero() {
        errors.add(field, "Ensure this value is greater than or equal to 0.");
    }
    // Trailing zeros count: "4.500" has three decimal places.
    if price.scale() > PRICE_DECIMAL_PLACES {
        errors.add(
            field,
            format!("Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."),
        );
    }
    if price.abs() >= amount_limit() {
        errors.add(field, "Ensure that there are no more than 10 digits in total.");
    }
    price
}
