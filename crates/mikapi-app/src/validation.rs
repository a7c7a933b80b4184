// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Largest quantity a single order line may hold.
pub const MAX_QUANTITY: i64 = 9_999;
/// Largest unit price, in whole currency units.
pub const MAX_PRICE: i64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidQuantity,
    NegativeQuantity,
    QuantityTooLarge,
    InvalidPrice,
    NegativePrice,
    PriceTooLarge,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity => f.write_str("invalid quantity value"),
            Self::NegativeQuantity => f.write_str("quantity cannot be negative"),
            Self::QuantityTooLarge => write!(f, "quantity cannot exceed {MAX_QUANTITY}"),
            Self::InvalidPrice => f.write_str("invalid price value"),
            Self::NegativePrice => f.write_str("price cannot be negative"),
            Self::PriceTooLarge => write!(f, "price cannot exceed {MAX_PRICE}"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Empty input reads as zero.
pub fn parse_quantity(input: &str) -> ValidationResult<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    if trimmed.starts_with('-') {
        return Err(ValidationError::NegativeQuantity);
    }
    let quantity = parse_digits(trimmed).ok_or(ValidationError::InvalidQuantity)?;
    if quantity > MAX_QUANTITY {
        return Err(ValidationError::QuantityTooLarge);
    }
    Ok(quantity)
}

/// Accepts an optional leading currency sign and thousands separators.
pub fn parse_price(input: &str) -> ValidationResult<i64> {
    let raw = input.trim().replace(',', "");
    let clean = raw
        .strip_prefix('¥')
        .or_else(|| raw.strip_prefix('$'))
        .unwrap_or(raw.as_str())
        .trim();
    if clean.starts_with('-') {
        return Err(ValidationError::NegativePrice);
    }
    if clean.is_empty() {
        return Ok(0);
    }
    let price = parse_digits(clean).ok_or(ValidationError::InvalidPrice)?;
    if price > MAX_PRICE {
        return Err(ValidationError::PriceTooLarge);
    }
    Ok(price)
}

pub fn format_amount(currency: &str, amount: i64) -> String {
    let (sign, amount) = normalize_sign(amount);
    format!("{sign}{currency}{}", comma_format(amount))
}

fn parse_digits(input: &str) -> Option<i64> {
    if !input.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    input.parse::<i64>().ok()
}

fn comma_format(value: i64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let mut chars = digits.chars().collect::<Vec<_>>();
    let mut count = 0usize;
    while let Some(ch) = chars.pop() {
        if count == 3 {
            out.push(',');
            count = 0;
        }
        out.push(ch);
        count += 1;
    }
    out.chars().rev().collect()
}

fn normalize_sign(amount: i64) -> (&'static str, i64) {
    if amount >= 0 {
        return ("", amount);
    }
    if amount == i64::MIN {
        ("-", i64::MAX)
    } else {
        ("-", -amount)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        MAX_PRICE, MAX_QUANTITY, ValidationError, format_amount, parse_price, parse_quantity,
    };

    #[test]
    fn quantity_parses_plain_digits_and_blank_as_zero() {
        assert_eq!(parse_quantity(" 12 "), Ok(12));
        assert_eq!(parse_quantity(""), Ok(0));
    }

    #[test]
    fn quantity_rejects_negative_and_garbage() {
        assert_eq!(parse_quantity("-1"), Err(ValidationError::NegativeQuantity));
        assert_eq!(parse_quantity("2.5"), Err(ValidationError::InvalidQuantity));
        assert_eq!(parse_quantity("two"), Err(ValidationError::InvalidQuantity));
    }

    #[test]
    fn price_accepts_currency_sign_and_separators() {
        assert_eq!(parse_price("¥1,200"), Ok(1200));
        assert_eq!(parse_price("$800"), Ok(800));
        assert_eq!(parse_price("500"), Ok(500));
    }

    #[test]
    fn price_rejects_negative_and_fractional_values() {
        assert_eq!(parse_price("-100"), Err(ValidationError::NegativePrice));
        assert_eq!(parse_price("12.50"), Err(ValidationError::InvalidPrice));
    }

    #[test]
    fn negative_price_after_currency_sign_is_reported_as_negative() {
        assert_eq!(parse_price("¥-100"), Err(ValidationError::NegativePrice));
        assert_eq!(parse_price("$ -5"), Err(ValidationError::NegativePrice));
    }

    #[test]
    fn oversized_quantity_and_price_are_rejected() {
        assert_eq!(parse_quantity(&MAX_QUANTITY.to_string()), Ok(MAX_QUANTITY));
        assert_eq!(
            parse_quantity("9223372036854775807"),
            Err(ValidationError::QuantityTooLarge)
        );
        assert_eq!(parse_price(&format!("¥{MAX_PRICE}")), Ok(MAX_PRICE));
        assert_eq!(
            parse_price("¥100,000,001"),
            Err(ValidationError::PriceTooLarge)
        );
        assert_eq!(
            ValidationError::QuantityTooLarge.to_string(),
            "quantity cannot exceed 9999"
        );
    }

    #[test]
    fn amount_formatting_groups_thousands() {
        assert_eq!(format_amount("¥", 2100), "¥2,100");
        assert_eq!(format_amount("¥", 0), "¥0");
        assert_eq!(format_amount("$", 1_234_567), "$1,234,567");
        assert_eq!(format_amount("¥", -500), "-¥500");
    }
}
