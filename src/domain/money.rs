//! FCFA amounts: formatting and parsing.

use super::error::ShopError;

/// Whole CFA francs.
pub type Amount = i64;

const GROUP_SEPARATOR: char = '\u{202F}';

/// Format an amount the way the shop prints prices: `1 250 000 FCFA`.
pub fn format_fcfa(amount: Amount) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 * 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{grouped} FCFA")
}

pub fn format_optional_fcfa(amount: Option<Amount>) -> String {
    match amount {
        Some(a) => format_fcfa(a),
        None => "—".to_string(),
    }
}

/// Parse a user-typed amount. Grouping spaces are accepted, a fractional
/// part is accepted only when it is zero.
pub fn parse_amount(field: &str, text: &str) -> Result<Amount, ShopError> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{202F}' | '\u{A0}'))
        .collect();

    if cleaned.is_empty() {
        return Err(ShopError::required(field));
    }

    let (negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };

    let whole = match unsigned.split_once(['.', ',']) {
        Some((whole, fraction)) => {
            if fraction.is_empty() || !fraction.chars().all(|c| c == '0') {
                return Err(ShopError::validation(
                    field,
                    format!("'{text}' is not a whole FCFA amount"),
                ));
            }
            whole
        }
        None => unsigned,
    };

    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(ShopError::validation(
            field,
            format!("'{text}' is not a number"),
        ));
    }

    let value: Amount = whole
        .parse()
        .map_err(|_| ShopError::validation(field, format!("'{text}' is out of range")))?;

    Ok(if negative { -value } else { value })
}

pub fn out_of_range(field: &str) -> ShopError {
    ShopError::validation(field, "is out of range")
}

/// Sum amounts, failing on overflow instead of wrapping.
pub fn checked_sum(
    field: &str,
    amounts: impl IntoIterator<Item = Amount>,
) -> Result<Amount, ShopError> {
    amounts
        .into_iter()
        .try_fold(0, |total: Amount, amount| total.checked_add(amount))
        .ok_or_else(|| out_of_range(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn checked_sum_reports_overflow() {
        assert_eq!(checked_sum("total", [85_000, 15_000]).unwrap(), 100_000);
        assert_eq!(checked_sum("total", []).unwrap(), 0);
        assert!(matches!(
            checked_sum("total", [Amount::MAX, 1]),
            Err(ShopError::Validation { field, .. }) if field == "total"
        ));
    }

    #[test]
    fn formats_with_narrow_spaces() {
        assert_eq!(format_fcfa(0), "0 FCFA");
        assert_eq!(format_fcfa(950), "950 FCFA");
        assert_eq!(format_fcfa(1_000), "1\u{202F}000 FCFA");
        assert_eq!(format_fcfa(1_250_000), "1\u{202F}250\u{202F}000 FCFA");
    }

    #[test]
    fn formats_negative() {
        assert_eq!(format_fcfa(-15_000), "-15\u{202F}000 FCFA");
    }

    #[test]
    fn formats_missing_as_dash() {
        assert_eq!(format_optional_fcfa(None), "—");
        assert_eq!(format_optional_fcfa(Some(500)), "500 FCFA");
    }

    #[test]
    fn parses_plain_and_grouped() {
        assert_eq!(parse_amount("price", "85000").unwrap(), 85_000);
        assert_eq!(parse_amount("price", " 85 000 ").unwrap(), 85_000);
        assert_eq!(parse_amount("price", "85\u{202F}000").unwrap(), 85_000);
        assert_eq!(parse_amount("price", "-2500").unwrap(), -2_500);
        assert_eq!(parse_amount("price", "+10").unwrap(), 10);
    }

    #[test]
    fn accepts_zero_fraction() {
        assert_eq!(parse_amount("price", "1500.00").unwrap(), 1_500);
        assert_eq!(parse_amount("price", "1500,0").unwrap(), 1_500);
    }

    #[test]
    fn rejects_non_zero_fraction() {
        let err = parse_amount("price", "1500.5").unwrap_err();
        assert!(matches!(err, ShopError::Validation { field, .. } if field == "price"));
    }

    #[test]
    fn rejects_garbage_and_empty() {
        assert!(parse_amount("price", "abc").is_err());
        assert!(parse_amount("price", "12a").is_err());
        assert!(parse_amount("price", "-").is_err());
        assert!(matches!(
            parse_amount("price", "  "),
            Err(ShopError::Validation { reason, .. }) if reason == "is required"
        ));
    }

    proptest! {
        #[test]
        fn groups_are_three_digits_wide(value in 0i64..1_000_000_000_000i64) {
            let text = format_fcfa(value);
            let number = text.trim_end_matches(" FCFA");
            let groups: Vec<&str> = number.split(GROUP_SEPARATOR).collect();
            prop_assert!(!groups[0].is_empty() && groups[0].len() <= 3);
            for group in &groups[1..] {
                prop_assert_eq!(group.len(), 3);
            }
        }
    }
}
