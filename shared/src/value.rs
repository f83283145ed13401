//! Numeric value parsing
//!
//! Lab values arrive as numbers, numeric strings with units ("12.5 mg/dL"),
//! or semi-qualitative markers ("++"). This module turns any of those into
//! an `f64` or reports that it cannot. It never fails loudly.

use crate::report::RawValue;
use tracing::debug;

/// Semi-qualitative markers and their numeric equivalents.
/// Longer markers come first so "++" is not read as two "+".
const QUALITATIVE_MARKERS: &[(&str, &str)] = &[("++", "2"), ("+", "1")];

/// Parse a raw report value into a number
///
/// Numbers pass through unchanged. Strings get marker substitution, then
/// every character other than a digit, `.` or `-` is dropped.
pub fn parse(raw: &RawValue) -> Option<f64> {
    match raw {
        RawValue::Number(n) => Some(*n),
        RawValue::Text(text) => parse_text(text),
    }
}

/// Parse a free-text value; see [`parse`]
pub fn parse_text(text: &str) -> Option<f64> {
    let substituted = QUALITATIVE_MARKERS
        .iter()
        .fold(text.to_string(), |acc, (marker, digit)| acc.replace(marker, digit));

    let cleaned: String = substituted
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if matches!(cleaned.as_str(), "" | "." | "-") {
        debug!(value = text, "Value has no numeric content");
        return None;
    }

    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => {
            debug!(value = text, cleaned = %cleaned, "Value could not be parsed");
            None
        }
    }
}

/// Render a parsed value so that [`parse_text`] reads it back unchanged
pub fn format_value(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("++", Some(2.0))]
    #[case("+", Some(1.0))]
    #[case("12.5 mg/dL", Some(12.5))]
    #[case("16.2", Some(16.2))]
    #[case("Present (++)", Some(2.0))]
    #[case("  95 ", Some(95.0))]
    #[case("-3.5", Some(-3.5))]
    #[case(".5", Some(0.5))]
    #[case("4,500", Some(4500.0))]
    #[case("abc", None)]
    #[case("NIL", None)]
    #[case("", None)]
    #[case(".", None)]
    #[case("-", None)]
    #[case("1.2.3", None)]
    #[case("13.0 - 17.0", None)]
    fn test_parse_text(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_text(input), expected);
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(parse(&RawValue::Number(271.87)), Some(271.87));
        assert_eq!(parse(&RawValue::Number(-1.0)), Some(-1.0));
        assert_eq!(parse(&RawValue::Number(0.0)), Some(0.0));
    }

    #[test]
    fn test_longer_marker_wins() {
        // "+++" is "++" followed by "+", giving "21"
        assert_eq!(parse_text("+++"), Some(21.0));
    }

    #[test]
    fn test_overflow_is_rejected() {
        let huge = "9".repeat(400);
        assert_eq!(parse_text(&huge), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Property: parsing never panics on arbitrary text
        #[test]
        fn prop_parse_is_total(text in ".*") {
            let _ = parse_text(&text);
        }

        /// Property: a parsed value survives format-then-parse unchanged
        #[test]
        fn prop_parse_is_idempotent(text in ".*") {
            if let Some(first) = parse_text(&text) {
                let second = parse_text(&format_value(first));
                prop_assert_eq!(second, Some(first));
            }
        }

        /// Property: plain decimals with a trailing unit parse to themselves
        #[test]
        fn prop_decimal_with_unit(value in 0.0f64..1_000_000.0) {
            let text = format!("{} mg/dL", format_value(value));
            prop_assert_eq!(parse_text(&text), Some(value));
        }
    }
}
