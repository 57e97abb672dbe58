//! Price text parsing.
//!
//! Handles currency-prefixed (`$1,299.00`), currency-suffixed (`1.299,00 €`)
//! and bare (`128`) amounts. A number adjacent to a currency marker wins over
//! an unmarked number appearing earlier in the text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static CURRENCY_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:[$€£¥]|\bUSD|\bEUR|\bGBP|\bCAD|\bAUD)\s*(\d[\d.,]*)")
        .expect("valid currency prefix regex")
});
static CURRENCY_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d.,]*)\s*(?:[$€£¥]|USD\b|EUR\b|GBP\b)")
        .expect("valid currency suffix regex")
});
static BARE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d.,]*").expect("valid number regex"));

/// Parses the first currency amount in `text`.
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    let token = CURRENCY_PREFIX_RE
        .captures(text)
        .or_else(|| CURRENCY_SUFFIX_RE.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .or_else(|| BARE_NUMBER_RE.find(text).map(|m| m.as_str()))?;
    parse_number_token(token)
}

/// Reads a price from a model-returned JSON value, which may be a number,
/// a string such as `"$89.99"`, or null.
#[must_use]
pub fn price_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite() && *v >= 0.0),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}

fn parse_number_token(token: &str) -> Option<f64> {
    let token = token.trim_end_matches(['.', ',']);
    if token.is_empty() {
        return None;
    }

    let last_comma = token.rfind(',');
    let last_dot = token.rfind('.');

    let normalized = match (last_comma, last_dot) {
        (Some(c), Some(d)) => {
            // Whichever separator comes last is the decimal point.
            if c > d {
                token.replace('.', "").replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
        (Some(c), None) => {
            let decimals = token.len() - c - 1;
            if token.matches(',').count() == 1 && decimals <= 2 {
                token.replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
        (None, Some(d)) => {
            let decimals = token.len() - d - 1;
            if token.matches('.').count() > 1 || decimals == 3 {
                token.replace('.', "")
            } else {
                token.to_string()
            }
        }
        (None, None) => token.to_string(),
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
