//! Value formatting for report display lines.
//!
//! Every formatter reads a JSON value from the report projection. `Ok(None)`
//! means the value counts as absent (null, empty text, empty list); `Err`
//! means the value has an unexpected shape and the caller should fall back to
//! its raw JSON text.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Number, Value};

use crate::models::report::parse_filing_date;

/// How a field value is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// Verbatim text.
    Text,
    /// Currency amount with symbol, thousands separators and two decimals.
    Currency,
    /// Percentage with two decimals.
    Percent,
    /// `YYYY-MM-DD`.
    Date,
    /// Whole number with thousands separators.
    Count,
    /// Comma-joined list of strings.
    List,
}

/// Result of formatting a single value.
pub type FormatResult = std::result::Result<Option<String>, String>;

/// Format `value` according to `format`.
pub fn format_value(value: &Value, format: FieldFormat, currency_symbol: &str) -> FormatResult {
    if value.is_null() {
        return Ok(None);
    }

    match format {
        FieldFormat::Text => format_text(value),
        FieldFormat::Currency => Ok(Some(format_currency(to_decimal(value)?, currency_symbol))),
        FieldFormat::Percent => Ok(Some(format_percent(to_decimal(value)?))),
        FieldFormat::Date => format_date(value).map(Some),
        FieldFormat::Count => format_count(value).map(Some),
        FieldFormat::List => format_list(value),
    }
}

/// Format an amount as `$1,234,567.89` (negative: `-$1,500.00`).
pub fn format_currency(amount: Decimal, symbol: &str) -> String {
    let rounded = round_cents(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let s = format!("{:.2}", rounded.abs());

    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    format!("{}{}{}.{}", sign, symbol, group_thousands(integer_part), decimal_part)
}

/// Format a percentage as `43.30%`.
pub fn format_percent(value: Decimal) -> String {
    let rounded = round_cents(value);
    if rounded.is_zero() {
        return "0.00%".to_string();
    }
    format!("{:.2}%", rounded)
}

/// Format a whole number with thousands separators.
pub fn format_integer(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let sign = if value < 0 { "-" } else { "" };
    format!("{}{}", sign, group_thousands(&digits))
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// Add thousand separators to a run of ASCII digits.
fn group_thousands(digits: &str) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut formatted = String::with_capacity(chars.len() + chars.len() / 3);

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(*c);
    }
    formatted
}

fn to_decimal(value: &Value) -> std::result::Result<Decimal, String> {
    match value {
        Value::Number(n) => number_to_decimal(n),
        other => Err(format!("expected a number, got {}", other)),
    }
}

fn number_to_decimal(n: &Number) -> std::result::Result<Decimal, String> {
    if let Some(i) = n.as_i64() {
        return Ok(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Decimal::from(u));
    }

    // serde_json prints the shortest round-trip form, so 0.1 stays 0.1.
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| format!("number {} out of range: {}", text, e))
}

fn format_text(value: &Value) -> FormatResult {
    match value {
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(format!("expected text, got {}", other)),
    }
}

fn format_date(value: &Value) -> std::result::Result<String, String> {
    let raw = value
        .as_str()
        .ok_or_else(|| format!("expected a date string, got {}", value))?;
    parse_filing_date(raw)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| format!("unrecognised date '{}'", raw))
}

fn format_count(value: &Value) -> std::result::Result<String, String> {
    let Value::Number(n) = value else {
        return Err(format!("expected a whole number, got {}", value));
    };

    if let Some(i) = n.as_i64() {
        return Ok(format_integer(i));
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(format_integer(f as i64)),
        _ => Err(format!("expected a whole number, got {}", n)),
    }
}

fn format_list(value: &Value) -> FormatResult {
    let Value::Array(items) = value else {
        return Err(format!("expected a list, got {}", value));
    };

    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => parts.push(s.as_str()),
            other => return Err(format!("expected list of text, found {}", other)),
        }
    }

    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parts.join(", ")))
    }
}
