//! Parser for the operator's own right-of-way application letter.
//!
//! The letter is a numbered form ("2. Exact location of starting point :
//! ...") addressed to an MCGM ward commissioner, so the authority is fixed.

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::LazyLock;

use super::dates::normalize_date;
use super::numeric::{parse_amount, render_amount};

static APPLICATION_NO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Application\s*No\.?\s*[:\-]?\s*([A-Za-z0-9\-/]+)").unwrap()
});
static APPLICATION_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Date\s*[:\-]?\s*([0-9]{2}[./-][0-9]{2}[./-][0-9]{4})").unwrap()
});
static FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)2\.\s+Exact location of starting point\s*:\s*([^\n\r]+)").unwrap()
});
static TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)3\.\s+Exact location of end point\s*:\s*([^\n\r]+)").unwrap());
static WARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Commissioner\s+([A-Za-z ]+?)\s+Ward").unwrap());

/// Form items that each state one trench length.
const LENGTH_ITEMS: [u32; 3] = [7, 8, 9];

pub const APPLICATION_AUTHORITY: &str = "MCGM";

/// Values read from a ROW application letter, serialized under the
/// column names the operator's tracker uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationDetails {
    #[serde(rename = "Application Number")]
    pub application_number: String,
    #[serde(rename = "Application Length (Mtr)")]
    pub application_length: String,
    #[serde(rename = "Application Date")]
    pub application_date: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Authority")]
    pub authority: String,
    #[serde(rename = "Ward")]
    pub ward: String,
}

pub fn parse_application(text: &str) -> ApplicationDetails {
    ApplicationDetails {
        application_number: first_capture(&APPLICATION_NO, text),
        application_length: application_length(text),
        application_date: APPLICATION_DATE
            .captures(text)
            .map(|c| normalize_date(&c[1]))
            .unwrap_or_default(),
        from: first_capture(&FROM, text),
        to: first_capture(&TO, text),
        authority: APPLICATION_AUTHORITY.to_string(),
        ward: first_capture(&WARD, text),
    }
}

fn first_capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default()
}

/// Sum of the trench lengths stated in items 7 to 9, in whole metres.
pub fn application_length(text: &str) -> String {
    let mut total = Decimal::ZERO;
    for item in LENGTH_ITEMS {
        let pattern = format!(
            r"(?i){item}\.\s+Length of trench[^\n\r]*?\s*:\s*([0-9]+(?:\.[0-9]+)?)?\s*mtrs?\.?"
        );
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        if let Some(v) = re
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_amount(m.as_str()))
        {
            total += v;
        }
    }
    if total.is_zero() {
        String::new()
    } else {
        render_amount(total.trunc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: &str = "\
To,
The Assistant Commissioner G South Ward
Application No.: ROW/2025/0042
Date: 14.01.2025
2.   Exact location of starting point
:
Worli Naka junction
3.   Exact location of end point
:
Lotus Mills gate
7.   Length of trench on footpath
:
120
mtrs.
8.   Length of trench on road
:
35.5
mtrs.
9.   Length of trench crossing
:

mtrs.
";

    #[test]
    fn test_parse_application_letter() {
        let details = parse_application(LETTER);
        assert_eq!(details.application_number, "ROW/2025/0042");
        assert_eq!(details.application_date, "14/01/2025");
        assert_eq!(details.from, "Worli Naka junction");
        assert_eq!(details.to, "Lotus Mills gate");
        assert_eq!(details.ward, "G South");
        assert_eq!(details.authority, "MCGM");
    }

    #[test]
    fn test_length_truncates_to_whole_metres() {
        assert_eq!(application_length(LETTER), "155");
        assert_eq!(application_length("no lengths"), "");
    }

    #[test]
    fn test_serializes_with_tracker_column_names() {
        let json = serde_json::to_value(parse_application("")).unwrap();
        assert_eq!(json["Authority"], "MCGM");
        assert_eq!(json["Application Number"], "");
    }
}
