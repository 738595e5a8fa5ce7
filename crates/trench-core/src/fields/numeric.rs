use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse an amount as printed on a demand note.
///
/// Handles formats like:
/// - "1,000" -> 1000
/// - "2,500.50" -> 2500.50
/// - "Rs. 300" / "300/-" -> 300
/// - "12." (trailing sentence dot) -> 12
///
/// Returns None for blanks and anything that is not a plain non-negative number.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let mut cleaned: String = s
        .trim()
        .trim_start_matches("Rs.")
        .trim_start_matches("Rs")
        .trim_end_matches("/-")
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    while cleaned.ends_with('.') {
        cleaned.pop();
    }
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Render an amount without a trailing fractional zero: 300.0 -> "300", 3500.50 -> "3500.5".
pub fn render_amount(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Sum every parseable amount, skipping the rest. None when nothing parsed.
pub fn sum_amounts<'a, I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .filter_map(parse_amount)
        .fold(None, |acc, v| Some(acc.unwrap_or(Decimal::ZERO) + v))
}

/// Sum and render; empty string when no value parsed.
pub fn sum_rendered<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    sum_amounts(values).map(render_amount).unwrap_or_default()
}

/// Sum treating blank or non-numeric inputs as zero. Always renders a number.
pub fn sum_lenient<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    render_amount(sum_amounts(values).unwrap_or(Decimal::ZERO))
}

/// Re-render a single extracted amount with the integer-vs-decimal rule.
pub fn normalize_amount(s: &str) -> String {
    parse_amount(s).map(render_amount).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_thousands_separator_and_decimal() {
        assert_eq!(parse_amount("1,000"), Some(dec!(1000)));
        assert_eq!(parse_amount("2,500.5"), Some(dec!(2500.5)));
    }

    #[test]
    fn test_currency_markers() {
        assert_eq!(parse_amount("Rs. 300"), Some(dec!(300)));
        assert_eq!(parse_amount("450/-"), Some(dec!(450)));
    }

    #[test]
    fn test_trailing_dot() {
        assert_eq!(parse_amount("12."), Some(dec!(12)));
        assert_eq!(parse_amount("."), None);
    }

    #[test]
    fn test_non_numeric_rejected() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("Total"), None);
        assert_eq!(parse_amount("12a"), None);
    }

    #[test]
    fn test_sum_with_fraction() {
        assert_eq!(sum_rendered(["1,000", "2,500.5"]), "3500.5");
    }

    #[test]
    fn test_sum_integer_rendering() {
        assert_eq!(sum_rendered(["100", "200"]), "300");
        assert_eq!(sum_rendered(["100.00", "200.0"]), "300");
    }

    #[test]
    fn test_sum_skips_noise() {
        assert_eq!(sum_rendered(["100", "n/a", ""]), "100");
        assert_eq!(sum_rendered(["n/a"]), "");
    }

    #[test]
    fn test_lenient_sum_defaults_to_zero() {
        assert_eq!(sum_lenient(["", "abc"]), "0");
        assert_eq!(sum_lenient(["12.5", ""]), "12.5");
    }
}
