//! Normalizers for the free-form date and amount values found in QIF fields.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::warn;

/// Two-digit years below this (after adding 1900) belong to the 2000s.
const PIVOT_YEAR: i32 = 1950;

/// Accepted date layouts, tried in order: the exact shape a value must have, the chrono format
/// that reads it, and whether the year has two digits.
///
/// chrono's `%Y` takes one to four digits and an optional sign, so the shape gates each format.
const DATE_LAYOUTS: &[(&str, &str, bool)] = &[
    (r"^\d{1,2}/\d{1,2}/\d{2}$", "%m/%d/%y", true),
    (r"^\d{1,2}/\d{1,2}/\d{4}$", "%m/%d/%Y", false),
    (r"^\d{1,2}-\d{1,2}-\d{2}$", "%m-%d-%y", true),
    (r"^\d{1,2}-\d{1,2}-\d{4}$", "%m-%d-%Y", false),
    (r"^\d{4}-\d{1,2}-\d{1,2}$", "%Y-%m-%d", false),
];

struct DateLayout {
    shape: Regex,
    format: &'static str,
    two_digit_year: bool,
}

fn date_layouts() -> &'static [DateLayout] {
    static LAYOUTS: OnceLock<Vec<DateLayout>> = OnceLock::new();
    LAYOUTS.get_or_init(|| {
        DATE_LAYOUTS
            .iter()
            .map(|(shape, format, two_digit_year)| DateLayout {
                shape: Regex::new(shape).expect("static date shape regex"),
                format: *format,
                two_digit_year: *two_digit_year,
            })
            .collect()
    })
}

/// Parses a QIF date. See `parse_date_iso` for the string form.
///
/// Two-digit years are read as `1900 + YY`, moved into the 2000s when that lands before 1950. So
/// `01/01/23` is 2023 and `01/01/68` is 1968. Four-digit years are taken as written.
///
/// Returns `None`, with a warning, for empty input or input matching none of the layouts.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if raw.is_empty() {
        warn!("Empty date value");
        return None;
    }
    for layout in date_layouts() {
        if !layout.shape.is_match(raw) {
            continue;
        }
        let Ok(date) = NaiveDate::parse_from_str(raw, layout.format) else {
            continue;
        };
        if !layout.two_digit_year {
            return Some(date);
        }
        // chrono applies its own century window to %y; replace it with ours.
        let mut year = 1900 + date.year().rem_euclid(100);
        if year < PIVOT_YEAR {
            year += 100;
        }
        match date.with_year(year) {
            Some(windowed) => return Some(windowed),
            // Feb 29 in a year that is not a leap year after windowing.
            None => continue,
        }
    }
    warn!("Could not parse date: {raw}");
    None
}

/// Parses a QIF date into an ISO `YYYY-MM-DD` string.
pub fn parse_date_iso(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Parses an amount such as `-$1,234.56` after removing commas, dollar signs and whitespace.
///
/// Returns `None`, with a warning, for empty input or anything `Decimal` cannot parse.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && *c != '$' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        warn!("Empty amount value '{raw}'");
        return None;
    }
    match Decimal::from_str(&cleaned) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Could not parse amount '{raw}': {e}");
            None
        }
    }
}

/// Whether `raw` has the shape of one of the accepted date layouts. Only structure is checked,
/// `13/45/99` looks like a date.
pub fn looks_like_date(raw: &str) -> bool {
    let raw = raw.trim();
    date_layouts().iter().any(|layout| layout.shape.is_match(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iso(raw: &str) -> Option<String> {
        parse_date_iso(raw)
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(iso("12/31/23").as_deref(), Some("2023-12-31"));
        assert_eq!(iso("12/31/2023").as_deref(), Some("2023-12-31"));
        assert_eq!(iso("12-31-23").as_deref(), Some("2023-12-31"));
        assert_eq!(iso("12-31-2023").as_deref(), Some("2023-12-31"));
        assert_eq!(iso("2023-12-31").as_deref(), Some("2023-12-31"));
        assert_eq!(iso("1/5/24").as_deref(), Some("2024-01-05"));
    }

    #[test]
    fn test_parse_date_pivot() {
        assert_eq!(iso("01/01/23").as_deref(), Some("2023-01-01"));
        assert_eq!(iso("01/01/68").as_deref(), Some("1968-01-01"));
        assert_eq!(iso("01/01/49").as_deref(), Some("2049-01-01"));
        assert_eq!(iso("01/01/50").as_deref(), Some("1950-01-01"));
        assert_eq!(iso("01/01/99").as_deref(), Some("1999-01-01"));
        assert_eq!(iso("01/01/00").as_deref(), Some("2000-01-01"));
    }

    #[test]
    fn test_parse_date_four_digit_years_not_windowed() {
        assert_eq!(iso("06/15/1925").as_deref(), Some("1925-06-15"));
        assert_eq!(iso("1925-06-15").as_deref(), Some("1925-06-15"));
    }

    #[test]
    fn test_parse_date_idempotent_on_iso() {
        for raw in ["12/01/23", "3/7/1999", "07-04-76", "2024-02-29"] {
            let once = iso(raw).unwrap();
            assert_eq!(iso(&once), Some(once.clone()), "{raw}");
        }
    }

    #[test]
    fn test_parse_date_rejects() {
        assert_eq!(iso(""), None);
        assert_eq!(iso("Some description"), None);
        assert_eq!(iso("13/01/23"), None);
        assert_eq!(iso("02/30/2023"), None);
        assert_eq!(iso("12/31/23 extra"), None);
        assert_eq!(iso("12.31.23"), None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_amount("-50.00"), Some(Decimal::new(-5000, 2)));
        assert_eq!(parse_amount(" 1 000 "), Some(Decimal::from(1000)));
        assert_eq!(parse_amount("-$25"), Some(Decimal::from(-25)));
        assert_eq!(parse_amount("0"), Some(Decimal::ZERO));
    }

    #[test]
    fn test_parse_amount_failures_are_none() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("$"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("1.2.3"), None);
    }

    #[test]
    fn test_parse_date_rejects_malformed_years() {
        for raw in [
            "12/31/023",
            "12-31-023",
            "12/31/20234",
            "+2023-12-31",
            "-2023-12-31",
            "12/31/+2023",
            "023-12-31",
        ] {
            assert_eq!(iso(raw), None, "{raw}");
        }
    }

    #[test]
    fn test_parse_date_agrees_with_looks_like_date() {
        for raw in ["12/31/023", "+2023-12-31", "2023/12/31"] {
            assert!(!looks_like_date(raw));
            assert_eq!(iso(raw), None, "{raw}");
        }
        assert!(looks_like_date("2023-1-5"));
        assert_eq!(iso("2023-1-5").as_deref(), Some("2023-01-05"));
    }

    #[test]
    fn test_looks_like_date() {
        for yes in [
            "12/31/23",
            "12/31/2023",
            "1/31/23",
            "1/3/23",
            "12/3/23",
            "12-31-23",
            "12-31-2023",
            "2023-12-31",
            " 12/31/23 ",
            "99/99/99",
        ] {
            assert!(looks_like_date(yes), "{yes}");
        }
        for no in ["", "Some description", "12/31", "2023/12/31", "12/31/023", "Dec 31 2023"] {
            assert!(!looks_like_date(no), "{no}");
        }
    }
}
