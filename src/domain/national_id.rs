//! Chilean national identifier (`RUT`) handling.

use crate::error::{AppError, AppResult};

/// Validate `NNNNNNNN-X` and return it with an upper-case check character.
///
/// Only the shape is checked; the check character is not recomputed.
pub fn normalize(raw: &str) -> AppResult<String> {
    let value = raw.trim();
    let (number, check) = value
        .split_once('-')
        .ok_or_else(|| AppError::validation("national_id", "expected NNNNNNNN-X"))?;

    if !(7..=8).contains(&number.len()) || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation(
            "national_id",
            "expected 7 or 8 digits before the dash",
        ));
    }

    let mut chars = check.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => {
            Ok(format!("{}-{}", number, c.to_ascii_uppercase()))
        }
        _ => Err(AppError::validation(
            "national_id",
            "expected a single check character after the dash",
        )),
    }
}

/// Modulo-11 check character for `number`.
pub fn check_digit(number: u32) -> char {
    let mut sum = 0u32;
    let mut factor = 2u32;
    let mut rest = number;
    while rest > 0 {
        sum += (rest % 10) * factor;
        rest /= 10;
        factor = if factor == 7 { 2 } else { factor + 1 };
    }
    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        d => char::from_digit(d, 10).unwrap_or('0'),
    }
}

/// Build a well-formed identifier for `number`.
pub fn format_with_check(number: u32) -> String {
    format!("{}-{}", number, check_digit(number))
}
