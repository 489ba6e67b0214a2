//! Free-text amount parsing.
//!
//! Operators type amounts the way they read them on invoices: `R$ 1.234,56`,
//! `1,234.56`, `39.90`, `1.500`. Everything locale-ambiguous is resolved here
//! so the rest of the pipeline only ever sees [`Decimal`] values.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest magnitude an amount may carry (one trillion). Anything beyond it
/// reads as absent, which keeps every product in the pipeline inside
/// [`Decimal`]'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Stored form of a free-text numeric field.
///
/// Saved scenarios carry a mix of JSON strings, numbers and `null`, so the
/// raw value is kept verbatim and only normalized on read.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl RawAmount {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    /// `None` is the absent marker: nothing usable was typed.
    pub fn parse(&self) -> Option<Decimal> {
        match self {
            Self::Empty => None,
            Self::Text(raw) => parse_amount(raw),
            Self::Number(value) => Decimal::from_f64(*value).and_then(within_range),
        }
    }

    pub fn or(&self, fallback: Decimal) -> Decimal {
        self.parse().unwrap_or(fallback)
    }

}

impl From<&str> for RawAmount {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Rendered with a decimal comma so any number of decimals reads back intact.
impl From<Decimal> for RawAmount {
    fn from(value: Decimal) -> Self {
        Self::Text(value.normalize().to_string().replace('.', ","))
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(raw) => f.write_str(raw),
            Self::Number(value) => write!(f, "{value}"),
        }
    }
}

pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut cleaned = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        match ch {
            '0'..='9' | ',' | '.' => cleaned.push(ch),
            '-' if cleaned.is_empty() => cleaned.push(ch),
            _ => {}
        }
    }

    if matches!(cleaned.as_str(), "" | "-" | "," | ".") {
        return None;
    }

    let negative = cleaned.starts_with('-');
    let mut digits = cleaned.trim_start_matches('-').to_string();

    if digits.contains(',') {
        digits = digits.replace('.', "").replacen(',', ".", 1);
    } else if let Some(last_dot) = digits.rfind('.') {
        let decimals = digits.len() - last_dot - 1;
        if decimals == 0 || decimals > 2 {
            digits = digits.replace('.', "");
        }
    }

    let magnitude = leading_decimal(&digits).and_then(within_range)?;
    Some(if negative { -magnitude } else { magnitude })
}

fn within_range(value: Decimal) -> Option<Decimal> {
    (value.abs() <= MAX_AMOUNT).then_some(value)
}

pub fn to_number_or(raw: &str, fallback: Decimal) -> Decimal {
    parse_amount(raw).unwrap_or(fallback)
}

/// Longest `digits[.digits]` prefix; trailing separators are ignored.
fn leading_decimal(input: &str) -> Option<Decimal> {
    let mut chars = input.chars().peekable();
    let mut whole = String::new();
    while let Some(ch) = chars.peek().copied().filter(char::is_ascii_digit) {
        whole.push(ch);
        chars.next();
    }

    let mut fraction = String::new();
    if chars.peek() == Some(&'.') {
        chars.next();
        while let Some(ch) = chars.peek().copied().filter(char::is_ascii_digit) {
            fraction.push(ch);
            chars.next();
        }
    }

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    let whole = if whole.is_empty() { "0".to_string() } else { whole };
    let literal = if fraction.is_empty() { whole } else { format!("{whole}.{fraction}") };
    Decimal::from_str(&literal).ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::{parse_amount, to_number_or, RawAmount, MAX_AMOUNT};

    #[test]
    fn comma_is_decimal_and_dots_are_thousands() {
        assert_eq!(parse_amount("R$ 1.234,56"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("2,5"), Some(dec!(2.5)));
        assert_eq!(parse_amount("1.000.000,00"), Some(dec!(1000000.00)));
    }

    #[test]
    fn lone_dot_with_short_tail_is_decimal() {
        assert_eq!(parse_amount("39.90"), Some(dec!(39.90)));
        assert_eq!(parse_amount("1.5"), Some(dec!(1.5)));
    }

    #[test]
    fn dot_with_long_or_empty_tail_is_thousands() {
        assert_eq!(parse_amount("1.500"), Some(dec!(1500)));
        assert_eq!(parse_amount("12.345.678"), Some(dec!(12345678)));
        assert_eq!(parse_amount("300."), Some(dec!(300)));
    }

    #[test]
    fn only_a_leading_minus_survives() {
        assert_eq!(parse_amount("-150,00"), Some(dec!(-150.00)));
        assert_eq!(parse_amount("15-0"), Some(dec!(150)));
        assert_eq!(parse_amount("R$ -5"), Some(dec!(-5)));
    }

    #[test]
    fn garbage_is_absent_not_zero() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("R$"), None);
        assert_eq!(parse_amount("-"), None);
        assert_eq!(parse_amount(","), None);
        assert_eq!(parse_amount("."), None);
        assert_eq!(parse_amount("0"), Some(dec!(0)));
    }

    #[test]
    fn fallback_only_replaces_absent_values() {
        assert_eq!(to_number_or("", dec!(1.50)), dec!(1.50));
        assert_eq!(to_number_or("0", dec!(1.50)), dec!(0));
    }

    #[test]
    fn raw_amount_accepts_json_strings_numbers_and_null() {
        let values: Vec<RawAmount> =
            serde_json::from_str(r#"["1.234,5", 30, null]"#).expect("raw amounts");

        assert_eq!(values[0].parse(), Some(dec!(1234.5)));
        assert_eq!(values[1].parse(), Some(dec!(30)));
        assert_eq!(values[2], RawAmount::Empty);
        assert_eq!(values[2].parse(), None);
    }

    #[test]
    fn amounts_beyond_a_trillion_are_absent() {
        assert_eq!(MAX_AMOUNT, dec!(1000000000000));
        assert_eq!(parse_amount("1.000.000.000.000,00"), Some(dec!(1000000000000.00)));
        assert_eq!(parse_amount("1.000.000.000.000,01"), None);
        assert_eq!(parse_amount("9999999999999999999999999999"), None);
        assert_eq!(parse_amount("-99999999999999999999"), None);
        assert_eq!(parse_amount("99999999999999999999999999999999"), None);
        assert_eq!(RawAmount::number(1e27).parse(), None);
    }

    #[test]
    fn decimals_render_back_without_losing_precision() {
        let raw = RawAmount::from(dec!(1.234));
        assert_eq!(raw, RawAmount::text("1,234"));
        assert_eq!(raw.parse(), Some(dec!(1.234)));
    }
}
