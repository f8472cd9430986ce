//! Parsing of the model's free-form response into line items.
//!
//! The model may wrap the array in prose. The array is located by taking
//! everything from the first `[` to the last `]`, which means unrelated
//! brackets in the surrounding prose end up inside the candidate and make
//! it fail to parse. The whole array is accepted or rejected as one unit.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use tracing::{debug, trace};

use crate::error::ResponseError;
use crate::models::line_item::RawItem;

/// JSON field holding the item code.
pub const CODE_FIELD: &str = "kode_barang";

/// JSON field holding the quantity.
pub const QUANTITY_FIELD: &str = "kuantum";

/// Longest response excerpt quoted in errors.
const EXCERPT_CHARS: usize = 200;

/// Parse the model response into raw items.
pub fn parse_response(raw: &str) -> Result<Vec<RawItem>, ResponseError> {
    let candidate = locate_array(raw).ok_or_else(|| ResponseError::NoJsonArray(excerpt(raw)))?;
    trace!("JSON candidate: {} bytes", candidate.len());

    let value: Value =
        serde_json::from_str(candidate).map_err(|e| ResponseError::InvalidJson(e.to_string()))?;
    let elements = match value {
        Value::Array(elements) => elements,
        _ => return Err(ResponseError::NotAnArray),
    };

    let items = elements
        .iter()
        .enumerate()
        .map(|(index, element)| parse_item(index, element))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Parsed {} items from model response", items.len());
    Ok(items)
}

/// Slice from the first `[` to the last `]`, inclusive.
fn locate_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (start < end).then(|| &raw[start..=end])
}

fn parse_item(index: usize, element: &Value) -> Result<RawItem, ResponseError> {
    let invalid = |reason: String| ResponseError::InvalidItem { index, reason };

    let object: &Map<String, Value> = element
        .as_object()
        .ok_or_else(|| invalid("expected an object".to_string()))?;

    let item_code = match object.get(CODE_FIELD) {
        Some(Value::String(code)) => code.clone(),
        Some(other) => return Err(invalid(format!("{} must be a string, got {}", CODE_FIELD, other))),
        None => return Err(invalid(format!("missing field {}", CODE_FIELD))),
    };

    let quantity = match object.get(QUANTITY_FIELD) {
        Some(Value::Number(n)) => number_to_decimal(n)
            .ok_or_else(|| invalid(format!("{} {} exceeds the decimal range (±{})", QUANTITY_FIELD, n, Decimal::MAX)))?,
        Some(other) => return Err(invalid(format!("{} must be a number, got {}", QUANTITY_FIELD, other))),
        None => return Err(invalid(format!("missing field {}", QUANTITY_FIELD))),
    };

    Ok(RawItem { item_code, quantity })
}

/// Quantities are kept exact, so values beyond `Decimal::MAX` in magnitude
/// (about 7.9e28) cannot be represented and reject the element.
fn number_to_decimal(n: &Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn excerpt(raw: &str) -> String {
    crate::models::batch::truncate_preview(raw.trim(), EXCERPT_CHARS)
}
